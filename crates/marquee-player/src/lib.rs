//! Marquee-Player: the headless playback core.
//!
//! This crate holds everything a video player front-end needs that is not
//! pixels:
//!
//! - **Source resolution** ([`resolver`]): classify a content record into one of
//!   five playback strategies and produce play/download URLs.
//! - **Streaming protocol adapter** ([`hls`]): attach an adaptive-streaming
//!   engine for `.m3u8` manifests when the media element lacks native support.
//! - **Playback controller** ([`controller`]): an explicit state object driven
//!   by a pure reducer, with load-timeout and control auto-hide deadlines.
//! - **Session driver** ([`session`]): the async loop wiring the reducer to the
//!   media element, fullscreen and storage ports.
//! - **Local stores** ([`progress`], [`watchlist`]): resume positions and the
//!   saved-items list on top of a key-value [`store`].
//!
//! Browser singletons are reached only through the capability traits in
//! [`ports`] and [`store`], so every piece runs under test without a browser.

pub mod config;
pub mod controller;
pub mod hls;
pub mod ports;
pub mod progress;
pub mod resolver;
pub mod session;
pub mod source;
pub mod store;
pub mod watchlist;

pub use config::PlayerConfig;
pub use controller::{Command, KeyCode, PlaybackError, PlaybackState, PlayerMessage, Quality, RenderPolicy};
pub use progress::{ProgressStore, ResumeEntry};
pub use resolver::{ResolveError, SourceResolver};
pub use session::{PlayerSession, SessionClosed, SessionHandle, SessionInput, SessionView};
pub use source::{PlaybackStrategy, ResolvedSource, SourceClassification};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use watchlist::Watchlist;
