//! Marquee - streaming catalog backend
//!
//! This library crate exposes the server pieces for integration testing:
//! the range-passthrough video proxy, metadata search, uploads into object
//! storage and server-side playback source resolution.

pub mod catalog;
pub mod config;
pub mod metadata;
pub mod server;
pub mod storage;
pub mod streaming;
