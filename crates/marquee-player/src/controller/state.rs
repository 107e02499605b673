use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::PlayerConfig;

/// Selectable playback rates.
pub const PLAYBACK_SPEEDS: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

/// Quality labels offered in the settings menu.
///
/// Selection is recorded only; it does not switch sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Auto,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quality::Auto => "Auto",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown quality: {}", s))
    }
}

/// User-facing playback failures. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackError {
    /// Media sat in a loading state past the load timeout.
    #[error("Video is taking too long to load. Please try again.")]
    LoadTimeout,

    /// The media element reported an error event.
    #[error("Failed to load video")]
    MediaFault,

    /// The adaptive engine reported a fatal error.
    #[error("Failed to load stream")]
    StreamFault,

    /// The source could not be resolved.
    #[error("Failed to load video")]
    SourceUnavailable,
}

/// Live state of one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_muted: bool,
    /// 0 to 100.
    pub volume: f64,
    pub current_time: f64,
    pub duration: f64,
    pub buffered_end: f64,
    pub is_fullscreen: bool,
    pub selected_quality: Quality,
    pub playback_speed: f64,
    pub is_loading: bool,
    pub error: Option<PlaybackError>,
    pub show_controls: bool,

    /// Whether the player container holds keyboard focus.
    pub has_focus: bool,

    /// When the pending load times out, if a load is pending.
    pub load_deadline: Option<Instant>,
    /// When the controls auto-hide, if they are due to.
    pub controls_deadline: Option<Instant>,

    pub(super) load_timeout: Duration,
    pub(super) controls_hide_delay: Duration,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}

impl PlaybackState {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            is_playing: false,
            is_muted: false,
            volume: 100.0,
            current_time: 0.0,
            duration: 0.0,
            buffered_end: 0.0,
            is_fullscreen: false,
            selected_quality: Quality::Auto,
            playback_speed: 1.0,
            is_loading: false,
            error: None,
            show_controls: true,
            has_focus: false,
            load_deadline: None,
            controls_deadline: None,
            load_timeout: config.load_timeout(),
            controls_hide_delay: config.controls_hide_delay(),
        }
    }

    /// Back to the initial state for a new source, keeping user preferences
    /// (volume, mute, speed, quality) and focus.
    pub fn reset_for_new_source(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.buffered_end = 0.0;
        self.is_loading = false;
        self.error = None;
        self.show_controls = true;
        self.load_deadline = None;
        self.controls_deadline = None;
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.load_deadline, self.controls_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Played share of the duration in percent; 0 with an unknown duration.
    pub fn progress_percent(&self) -> f64 {
        percent_of(self.current_time, self.duration)
    }

    /// Buffered share of the duration in percent; 0 with an unknown duration.
    pub fn buffered_percent(&self) -> f64 {
        percent_of(self.buffered_end, self.duration)
    }

    /// Clamp a target position to `[0, duration]`; the upper bound applies
    /// only once the duration is known.
    pub fn clamp_time(&self, seconds: f64) -> f64 {
        let lower = seconds.max(0.0);
        if self.duration > 0.0 {
            lower.min(self.duration)
        } else {
            lower
        }
    }

    /// Show the controls and, while playing, schedule them to hide.
    pub(super) fn reveal_controls(&mut self, now: Instant) {
        self.show_controls = true;
        self.schedule_hide(now);
    }

    pub(super) fn schedule_hide(&mut self, now: Instant) {
        self.controls_deadline = if self.is_playing && self.show_controls {
            Some(now + self.controls_hide_delay)
        } else {
            None
        };
    }
}

fn percent_of(value: f64, duration: f64) -> f64 {
    if duration > 0.0 && duration.is_finite() {
        (value / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
