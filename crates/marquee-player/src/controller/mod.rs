//! Playback controller.
//!
//! [`PlaybackState`] is the whole player state; [`PlaybackState::update`]
//! folds a [`PlayerMessage`] into it and returns the [`Command`]s the caller
//! must execute against the media element and fullscreen ports. Timers are
//! deadlines stored in the state and fired by [`PlayerMessage::Tick`].

mod messages;
mod state;
mod update;
mod view;

pub use messages::{Command, KeyCode, PlayerMessage};
pub use state::{PlaybackError, PlaybackState, Quality, PLAYBACK_SPEEDS};
pub use view::{format_time, RenderPolicy};
