use std::time::Duration;

use shared::error::MatrixError;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);
pub const DEFAULT_FLIGHT_DURATION: Duration = Duration::from_millis(700);
pub const DEFAULT_CLEAR_DELAY: Duration = Duration::from_millis(100);
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 3.0;

/// Timing and bounds for the animation controller.
#[derive(Debug, Clone)]
pub struct AnimatorConfig {
    /// Pause between a cell completing and its floating number appearing.
    pub settle_delay: Duration,
    /// How long the floating number is in flight before the cell commits.
    pub flight_duration: Duration,
    /// Pause after the commit before highlights are cleared.
    pub clear_delay: Duration,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            flight_duration: DEFAULT_FLIGHT_DURATION,
            clear_delay: DEFAULT_CLEAR_DELAY,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
        }
    }
}

impl AnimatorConfig {
    /// Rejects non-positive or non-finite speeds, clamps the rest into
    /// `[min_speed, max_speed]`.
    pub fn clamp_speed(&self, speed: f64) -> Result<f64, MatrixError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(MatrixError::InvalidSpeed(speed));
        }
        Ok(speed.clamp(self.min_speed, self.max_speed))
    }

    /// Total time from a cell completing to its highlights clearing.
    pub fn flight_total(&self) -> Duration {
        self.settle_delay + self.flight_duration + self.clear_delay
    }
}

pub fn tick_period(speed: f64) -> Duration {
    Duration::from_secs_f64(1.0 / speed)
}
