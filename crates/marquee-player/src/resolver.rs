//! Source resolver.
//!
//! Classifies a [`PlayableContent`] into one of five strategies and produces
//! the URL to play plus an optional download URL:
//!
//! 1. Uploaded storage object: public URL to play, signed URL to download
//!    (falling back to the public URL when signing fails).
//! 2. Restrictive CDN URL: routed through the range-passthrough proxy, no
//!    download link.
//! 3. Embed host URL: played in the host's own iframe, unchanged.
//! 4. Any other URL: played and downloaded directly.
//! 5. Nothing at all: the public sample video.
//!
//! The resolver only reads the record; it never mutates it.

use std::sync::Arc;
use std::time::Duration;

use marquee_common::hosts::{is_embed_host, is_proxied_host, url_host};
use marquee_common::PlayableContent;
use tracing::{debug, warn};

use crate::config::SIGNED_URL_EXPIRY;
use crate::ports::{ObjectStorage, StorageError};
use crate::source::{ResolvedSource, SourceClassification, FALLBACK_VIDEO_URL};

/// Same-origin path of the range-passthrough proxy.
pub const DEFAULT_PROXY_ENDPOINT: &str = "/api/proxy-video";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to load video: {0}")]
    Storage(#[from] StorageError),
}

pub struct SourceResolver<S: ?Sized> {
    storage: Arc<S>,
    proxy_endpoint: String,
    signed_url_expiry: Duration,
}

impl<S: ?Sized> Clone for SourceResolver<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            proxy_endpoint: self.proxy_endpoint.clone(),
            signed_url_expiry: self.signed_url_expiry,
        }
    }
}

impl<S: ObjectStorage + ?Sized> SourceResolver<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            proxy_endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            signed_url_expiry: SIGNED_URL_EXPIRY,
        }
    }

    /// Use a different proxy endpoint (absolute when the player is not
    /// served from the same origin as the proxy).
    #[must_use]
    pub fn with_proxy_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_signed_url_expiry(mut self, expiry: Duration) -> Self {
        self.signed_url_expiry = expiry;
        self
    }

    /// Resolve a playable source for `content`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Storage`] when the public URL of an uploaded
    /// object cannot be obtained. A failing signed-URL call is not an error.
    pub async fn resolve(&self, content: &PlayableContent) -> Result<ResolvedSource, ResolveError> {
        if let Some(path) = content.storage_file_path.as_deref() {
            return self.resolve_stored(path).await;
        }

        if let Some(url) = content.external_url.as_deref() {
            let classification = classify_external(url);
            debug!(
                content_id = %content.id,
                classification = classification.label(),
                "classified external source"
            );
            return Ok(self.resolve_external(url, classification));
        }

        debug!(content_id = %content.id, "no media locator, using fallback sample");
        Ok(ResolvedSource {
            classification: SourceClassification::Fallback,
            play_url: FALLBACK_VIDEO_URL.to_string(),
            download_url: Some(FALLBACK_VIDEO_URL.to_string()),
        })
    }

    async fn resolve_stored(&self, path: &str) -> Result<ResolvedSource, ResolveError> {
        let (public, signed) = tokio::join!(
            self.storage.public_url(path),
            self.storage.signed_url(path, self.signed_url_expiry),
        );

        let public = public?;
        let download_url = match signed {
            Ok(Some(signed)) => signed,
            Ok(None) => {
                warn!(path, "storage declined to sign URL, offering public URL");
                public.clone()
            }
            Err(e) => {
                warn!(path, error = %e, "signed URL request failed, offering public URL");
                public.clone()
            }
        };

        Ok(ResolvedSource {
            classification: SourceClassification::StoredFile {
                path: path.to_string(),
            },
            play_url: public,
            download_url: Some(download_url),
        })
    }

    fn resolve_external(&self, url: &str, classification: SourceClassification) -> ResolvedSource {
        match classification {
            SourceClassification::ProxiedUrl { .. } => ResolvedSource {
                play_url: self.proxy_url(url),
                download_url: None,
                classification,
            },
            _ => ResolvedSource {
                play_url: url.to_string(),
                download_url: Some(url.to_string()),
                classification,
            },
        }
    }

    /// The proxy endpoint with `url` percent-encoded as its query parameter.
    pub fn proxy_url(&self, url: &str) -> String {
        format!("{}?url={}", self.proxy_endpoint, urlencoding::encode(url))
    }
}

/// Classify an external URL by its hostname.
///
/// Unparseable URLs are treated as direct sources; the media element will
/// surface the failure.
pub fn classify_external(url: &str) -> SourceClassification {
    match url_host(url) {
        Some(host) if is_proxied_host(&host) => SourceClassification::ProxiedUrl {
            original_url: url.to_string(),
        },
        Some(host) if is_embed_host(&host) => SourceClassification::EmbedIframe {
            url: url.to_string(),
        },
        _ => SourceClassification::DirectUrl {
            url: url.to_string(),
        },
    }
}
