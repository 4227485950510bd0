use std::{collections::HashMap, fs, time::Duration};

use serde::Deserialize;
use shared::domain::{StepMode, DEFAULT_PRECISION, DEFAULT_SPEED, MAX_PRECISION};
use visualizer_core::{
    config::{DEFAULT_CLEAR_DELAY, DEFAULT_FLIGHT_DURATION, DEFAULT_SETTLE_DELAY},
    store::DEFAULT_MAX_DIMENSION,
    AnimatorConfig,
};

const SETTINGS_FILE: &str = "visualizer.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub speed: f64,
    pub step_mode: StepMode,
    pub precision: usize,
    pub max_dimension: usize,
    pub settle_delay_ms: u64,
    pub flight_duration_ms: u64,
    pub clear_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/visualizer.db".into(),
            speed: DEFAULT_SPEED,
            step_mode: StepMode::Factor,
            precision: DEFAULT_PRECISION,
            max_dimension: DEFAULT_MAX_DIMENSION,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            flight_duration_ms: DEFAULT_FLIGHT_DURATION.as_millis() as u64,
            clear_delay_ms: DEFAULT_CLEAR_DELAY.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn animator_config(&self) -> AnimatorConfig {
        AnimatorConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            flight_duration: Duration::from_millis(self.flight_duration_ms),
            clear_delay: Duration::from_millis(self.clear_delay_ms),
            ..AnimatorConfig::default()
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Overlays a flat `key = "value"` file. Unknown keys and unparsable values
/// are ignored.
fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    for (key, value) in &file_cfg {
        apply_value(settings, key, value);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    for (var, key) in [
        ("APP__DATABASE_URL", "database_url"),
        ("APP__SPEED", "speed"),
        ("APP__STEP_MODE", "step_mode"),
        ("APP__PRECISION", "precision"),
        ("APP__MAX_DIMENSION", "max_dimension"),
        ("APP__SETTLE_DELAY_MS", "settle_delay_ms"),
        ("APP__FLIGHT_DURATION_MS", "flight_duration_ms"),
        ("APP__CLEAR_DELAY_MS", "clear_delay_ms"),
    ] {
        if let Some(v) = lookup(var) {
            apply_value(settings, key, &v);
        }
    }
}

fn apply_value(settings: &mut Settings, key: &str, value: &str) {
    let value = value.trim();
    match key {
        "database_url" => settings.database_url = value.to_string(),
        "speed" => {
            if let Ok(parsed) = value.parse::<f64>() {
                settings.speed = parsed;
            }
        }
        "step_mode" => {
            if let Ok(parsed) = value.parse::<StepMode>() {
                settings.step_mode = parsed;
            }
        }
        "precision" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed <= MAX_PRECISION {
                    settings.precision = parsed;
                }
            }
        }
        "max_dimension" => {
            if let Ok(parsed) = value.parse::<usize>() {
                settings.max_dimension = parsed;
            }
        }
        "settle_delay_ms" => {
            if let Ok(parsed) = value.parse::<u64>() {
                settings.settle_delay_ms = parsed;
            }
        }
        "flight_duration_ms" => {
            if let Ok(parsed) = value.parse::<u64>() {
                settings.flight_duration_ms = parsed;
            }
        }
        "clear_delay_ms" => {
            if let Ok(parsed) = value.parse::<u64>() {
                settings.clear_delay_ms = parsed;
            }
        }
        _ => {}
    }
}

/// Turns a bare file path into a `sqlite://` url. Storage creates the
/// parent directory when it opens the database.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
