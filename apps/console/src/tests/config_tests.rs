use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_the_animator_defaults() {
    let settings = Settings::default();
    let config = settings.animator_config();

    assert_eq!(settings.speed, 1.0);
    assert_eq!(settings.precision, 2);
    assert_eq!(settings.step_mode, StepMode::Factor);
    assert_eq!(config.settle_delay, Duration::from_millis(50));
    assert_eq!(config.flight_duration, Duration::from_millis(700));
    assert_eq!(config.clear_delay, Duration::from_millis(100));
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();

    apply_file(
        &mut settings,
        r#"
            database_url = "sqlite://./saved/m.db"
            speed = "2.5"
            step_mode = "cell"
            precision = "nope"
            unknown = "ignored"
        "#,
    );

    assert_eq!(settings.database_url, "sqlite://./saved/m.db");
    assert_eq!(settings.speed, 2.5);
    assert_eq!(settings.step_mode, StepMode::Cell);
    assert_eq!(settings.precision, 2);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();

    apply_file(&mut settings, "speed = [");

    assert_eq!(settings, Settings::default());
}

#[test]
fn prefixed_env_wins_over_plain_database_url() {
    let mut settings = Settings::default();

    apply_env(
        &mut settings,
        env_from(&[
            ("DATABASE_URL", "sqlite://plain.db"),
            ("APP__DATABASE_URL", "sqlite://prefixed.db"),
            ("APP__FLIGHT_DURATION_MS", "200"),
            ("APP__MAX_DIMENSION", "6"),
        ]),
    );

    assert_eq!(settings.database_url, "sqlite://prefixed.db");
    assert_eq!(settings.max_dimension, 6);
    assert_eq!(
        settings.animator_config().flight_duration,
        Duration::from_millis(200)
    );
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite:m.db"), "sqlite://m.db");
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[tokio::test]
async fn storage_creates_parent_dir_for_normalized_path() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    let database_url = normalize_database_url(db_path.to_string_lossy().as_ref());
    storage::Storage::new(&database_url)
        .await
        .expect("open storage");

    assert!(temp_root.path().join("data").exists());
}

#[test]
fn precision_beyond_the_cap_is_ignored() {
    let mut settings = Settings::default();

    apply_env(&mut settings, env_from(&[("APP__PRECISION", "70000")]));
    assert_eq!(settings.precision, 2);

    apply_env(&mut settings, env_from(&[("APP__PRECISION", "20")]));
    assert_eq!(settings.precision, MAX_PRECISION);
}
