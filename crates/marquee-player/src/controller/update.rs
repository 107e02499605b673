use tokio::time::Instant;
use tracing::debug;

use super::messages::{Command, KeyCode, PlayerMessage};
use super::state::{PlaybackError, PlaybackState, PLAYBACK_SPEEDS};
use crate::config::{SKIP_SECONDS, VOLUME_STEP};

impl PlaybackState {
    /// Apply one message and return the side effects to perform.
    ///
    /// Pure with respect to `now`: no clocks are read and no ports touched.
    pub fn update(&mut self, message: PlayerMessage, now: Instant) -> Vec<Command> {
        match message {
            PlayerMessage::LoadStart => {
                self.is_loading = true;
                self.load_deadline = Some(now + self.load_timeout);
                vec![]
            }

            PlayerMessage::CanPlay | PlayerMessage::LoadedData => {
                self.load_deadline = None;
                self.is_loading = false;
                vec![]
            }

            PlayerMessage::Waiting | PlayerMessage::Stalled => {
                self.is_loading = true;
                vec![]
            }

            PlayerMessage::Suspend => {
                self.is_loading = false;
                vec![]
            }

            PlayerMessage::LoadedMetadata { duration } => {
                self.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                vec![]
            }

            PlayerMessage::TimeUpdate { current_time } => {
                if current_time.is_finite() {
                    self.current_time = current_time.max(0.0);
                }
                vec![]
            }

            PlayerMessage::Progress { buffered } => {
                if let Some(&(_, end)) = buffered.last() {
                    self.buffered_end = end;
                }
                vec![]
            }

            PlayerMessage::Played => {
                self.is_playing = true;
                self.schedule_hide(now);
                vec![]
            }

            PlayerMessage::Paused => {
                self.is_playing = false;
                self.controls_deadline = None;
                vec![]
            }

            PlayerMessage::MediaError => {
                self.fail(PlaybackError::MediaFault);
                vec![]
            }

            PlayerMessage::SourceFailed => {
                self.fail(PlaybackError::SourceUnavailable);
                vec![]
            }

            PlayerMessage::StreamFault => {
                self.fail(PlaybackError::StreamFault);
                vec![]
            }

            PlayerMessage::TogglePlay => {
                let command = if self.is_playing {
                    Command::Pause
                } else {
                    Command::Play
                };
                self.is_playing = !self.is_playing;
                self.reveal_controls(now);
                vec![command]
            }

            PlayerMessage::Seek(target) => self.seek_to(target, now),

            PlayerMessage::Skip(delta) => self.seek_to(self.current_time + delta, now),

            PlayerMessage::SetVolume(volume) => self.set_volume(volume),

            PlayerMessage::StepVolume(delta) => self.set_volume(self.volume + delta),

            PlayerMessage::ToggleMute => {
                self.is_muted = !self.is_muted;
                vec![Command::SetMuted(self.is_muted)]
            }

            // Local state follows FullscreenChanged, not the request.
            PlayerMessage::ToggleFullscreen => {
                if self.is_fullscreen {
                    vec![Command::ExitFullscreen]
                } else {
                    vec![Command::RequestFullscreen]
                }
            }

            PlayerMessage::FullscreenChanged(active) => {
                self.is_fullscreen = active;
                vec![]
            }

            PlayerMessage::SetSpeed(speed) => {
                if PLAYBACK_SPEEDS.iter().any(|s| (s - speed).abs() < f64::EPSILON) {
                    self.playback_speed = speed;
                    vec![Command::SetRate(speed)]
                } else {
                    debug!(speed, "ignoring unsupported playback speed");
                    vec![]
                }
            }

            PlayerMessage::SelectQuality(quality) => {
                debug!(quality = %quality, "quality selected");
                self.selected_quality = quality;
                vec![]
            }

            PlayerMessage::Retry => {
                self.error = None;
                self.is_loading = false;
                self.load_deadline = None;
                vec![Command::Reload]
            }

            PlayerMessage::PointerMoved => {
                self.reveal_controls(now);
                vec![]
            }

            PlayerMessage::PointerLeft => {
                self.show_controls = false;
                self.controls_deadline = None;
                vec![]
            }

            PlayerMessage::FocusChanged(focused) => {
                self.has_focus = focused;
                vec![]
            }

            PlayerMessage::Key(key) => {
                if !self.has_focus {
                    return vec![];
                }
                let mapped = match key {
                    KeyCode::Space => PlayerMessage::TogglePlay,
                    KeyCode::ArrowLeft => PlayerMessage::Skip(-SKIP_SECONDS),
                    KeyCode::ArrowRight => PlayerMessage::Skip(SKIP_SECONDS),
                    KeyCode::ArrowUp => PlayerMessage::StepVolume(VOLUME_STEP),
                    KeyCode::ArrowDown => PlayerMessage::StepVolume(-VOLUME_STEP),
                    KeyCode::KeyM => PlayerMessage::ToggleMute,
                    KeyCode::KeyF => PlayerMessage::ToggleFullscreen,
                    KeyCode::Other => return vec![],
                };
                self.update(mapped, now)
            }

            PlayerMessage::Tick => {
                if self.load_deadline.is_some_and(|deadline| deadline <= now) {
                    debug!("load timed out");
                    self.load_deadline = None;
                    self.is_loading = false;
                    self.error = Some(PlaybackError::LoadTimeout);
                }
                if self.controls_deadline.is_some_and(|deadline| deadline <= now) {
                    self.controls_deadline = None;
                    if self.is_playing {
                        self.show_controls = false;
                    }
                }
                vec![]
            }

            PlayerMessage::SaveTick => {
                if self.is_playing {
                    vec![Command::SaveProgress {
                        current_time: self.current_time,
                        duration: self.duration,
                    }]
                } else {
                    vec![]
                }
            }
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        self.error = Some(error);
        self.is_loading = false;
        self.load_deadline = None;
    }

    fn seek_to(&mut self, target: f64, now: Instant) -> Vec<Command> {
        if !target.is_finite() {
            return vec![];
        }
        let position = self.clamp_time(target);
        self.current_time = position;
        self.reveal_controls(now);
        vec![Command::Seek(position)]
    }

    fn set_volume(&mut self, volume: f64) -> Vec<Command> {
        if !volume.is_finite() {
            return vec![];
        }
        let volume = volume.clamp(0.0, 100.0);
        self.volume = volume;
        self.is_muted = volume == 0.0;
        vec![
            Command::SetVolume(volume / 100.0),
            Command::SetMuted(self.is_muted),
        ]
    }
}
