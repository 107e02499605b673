//! Capability interfaces the playback core drives.
//!
//! Each trait stands in for a browser or service singleton: the media element,
//! the document fullscreen API, and the object storage service holding
//! uploaded media. Test doubles implement them directly.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// The underlying playback element.
///
/// Volumes are passed in the element's native `0.0..=1.0` range.
pub trait MediaElement: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_rate(&mut self, rate: f64);

    /// Assign a URL directly as the playback source.
    fn set_source(&mut self, url: &str);

    /// Re-trigger loading of the current source.
    fn reload(&mut self);

    /// Whether the element reports it can play the given MIME type natively.
    fn can_play_type(&self, mime: &str) -> bool;
}

/// Fullscreen control for the player container.
///
/// Requests are fire-and-forget; the outcome arrives later as a
/// fullscreen-change notification.
pub trait FullscreenPort: Send {
    fn request_fullscreen(&mut self);
    fn exit_fullscreen(&mut self);
}

/// Errors returned by an [`ObjectStorage`] backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(String),

    #[error("storage returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("storage is not configured: {0}")]
    NotConfigured(String),
}

/// The file storage service that holds uploaded media.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Public URL of an object.
    async fn public_url(&self, path: &str) -> Result<String, StorageError>;

    /// Time-limited signed URL of an object, `None` when the service declines.
    async fn signed_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<Option<String>, StorageError>;

    /// Upload bytes to `path`.
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str)
        -> Result<(), StorageError>;

    /// Remove the object at `path`.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}
