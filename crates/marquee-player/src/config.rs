//! Player tuning knobs.
//!
//! Defaults equal the fixed constants the player has always shipped with; the
//! struct exists so they can be overridden from the `[player]` config section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long media may sit in a loading state before it is reported as stuck.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Inactivity period after which controls hide while playing.
pub const CONTROLS_HIDE_DELAY: Duration = Duration::from_secs(3);

/// Cadence of progress saves while playback is active.
pub const PROGRESS_SAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Progress below this many seconds is neither saved nor resumed.
pub const RESUME_THRESHOLD_SECS: f64 = 30.0;

/// Fraction of the duration beyond which a title counts as finished.
pub const COMPLETION_RATIO: f64 = 0.95;

/// Maximum number of resume entries kept.
pub const RESUME_CAPACITY: usize = 10;

/// Lifetime requested for signed download URLs.
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(60);

/// Relative skip applied by the arrow keys and skip buttons.
pub const SKIP_SECONDS: f64 = 10.0;

/// Relative volume step applied by the arrow keys.
pub const VOLUME_STEP: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,

    #[serde(default = "default_controls_hide")]
    pub controls_hide_secs: u64,

    #[serde(default = "default_save_interval")]
    pub progress_save_interval_secs: u64,

    #[serde(default = "default_resume_threshold")]
    pub resume_threshold_secs: f64,

    #[serde(default = "default_completion_ratio")]
    pub completion_ratio: f64,

    #[serde(default = "default_resume_capacity")]
    pub resume_capacity: usize,
}

fn default_load_timeout() -> u64 {
    LOAD_TIMEOUT.as_secs()
}
fn default_controls_hide() -> u64 {
    CONTROLS_HIDE_DELAY.as_secs()
}
fn default_save_interval() -> u64 {
    PROGRESS_SAVE_INTERVAL.as_secs()
}
fn default_resume_threshold() -> f64 {
    RESUME_THRESHOLD_SECS
}
fn default_completion_ratio() -> f64 {
    COMPLETION_RATIO
}
fn default_resume_capacity() -> usize {
    RESUME_CAPACITY
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: default_load_timeout(),
            controls_hide_secs: default_controls_hide(),
            progress_save_interval_secs: default_save_interval(),
            resume_threshold_secs: default_resume_threshold(),
            completion_ratio: default_completion_ratio(),
            resume_capacity: default_resume_capacity(),
        }
    }
}

impl PlayerConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn controls_hide_delay(&self) -> Duration {
        Duration::from_secs(self.controls_hide_secs)
    }

    pub fn progress_save_interval(&self) -> Duration {
        Duration::from_secs(self.progress_save_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = PlayerConfig::default();
        assert_eq!(config.load_timeout(), LOAD_TIMEOUT);
        assert_eq!(config.controls_hide_delay(), CONTROLS_HIDE_DELAY);
        assert_eq!(config.progress_save_interval(), PROGRESS_SAVE_INTERVAL);
        assert_eq!(config.resume_capacity, 10);
    }

    #[test]
    fn test_partial_override() {
        let config: PlayerConfig = serde_json::from_str(r#"{"load_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.load_timeout(), Duration::from_secs(5));
        assert_eq!(config.controls_hide_delay(), CONTROLS_HIDE_DELAY);
    }
}
