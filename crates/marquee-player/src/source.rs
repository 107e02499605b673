//! Source classification and the playback strategy chosen from it.

use serde::{Deserialize, Serialize};

use crate::hls::is_manifest_url;

/// Public sample video played when a record carries no media locator.
pub const FALLBACK_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// How a given piece of content is played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceClassification {
    /// An object uploaded to the storage bucket.
    StoredFile { path: String },
    /// An external URL the browser can fetch directly.
    DirectUrl { url: String },
    /// An external URL on a restrictive CDN, played through the proxy.
    ProxiedUrl { original_url: String },
    /// A third-party host that only allows its own iframe player.
    EmbedIframe { url: String },
    /// No locator on the record; the sample video is used.
    Fallback,
}

impl SourceClassification {
    pub fn is_embed(&self) -> bool {
        matches!(self, Self::EmbedIframe { .. })
    }

    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::ProxiedUrl { .. })
    }

    /// Short lowercase label used in logs and API payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StoredFile { .. } => "stored_file",
            Self::DirectUrl { .. } => "direct_url",
            Self::ProxiedUrl { .. } => "proxied_url",
            Self::EmbedIframe { .. } => "embed_iframe",
            Self::Fallback => "fallback",
        }
    }
}

/// Output of the source resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub classification: SourceClassification,
    /// URL handed to the media element (or the iframe).
    pub play_url: String,
    /// URL offered for download; absent when the host forbids direct linking.
    pub download_url: Option<String>,
}

impl ResolvedSource {
    /// The playback strategy for this source, selected once at resolve time.
    pub fn strategy(&self) -> PlaybackStrategy {
        let url = self.play_url.clone();
        if self.classification.is_embed() {
            PlaybackStrategy::Embed { url }
        } else if is_manifest_url(&self.play_url) {
            PlaybackStrategy::Manifest { url }
        } else {
            PlaybackStrategy::Progressive { url }
        }
    }
}

/// How the resolved URL reaches the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlaybackStrategy {
    /// Render a sandboxed iframe; the remote embed owns its UI.
    Embed { url: String },
    /// Assign the URL to the media element as a plain progressive source.
    Progressive { url: String },
    /// An HLS manifest: native playback or an adaptive engine.
    Manifest { url: String },
}

impl PlaybackStrategy {
    pub fn url(&self) -> &str {
        match self {
            Self::Embed { url } | Self::Progressive { url } | Self::Manifest { url } => url,
        }
    }

    pub fn uses_media_element(&self) -> bool {
        !matches!(self, Self::Embed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(classification: SourceClassification, play_url: &str) -> ResolvedSource {
        ResolvedSource {
            classification,
            play_url: play_url.to_string(),
            download_url: None,
        }
    }

    #[test]
    fn test_manifest_detected_in_any_branch() {
        let direct = resolved(
            SourceClassification::DirectUrl {
                url: "https://cdn.example.com/master.m3u8".into(),
            },
            "https://cdn.example.com/master.m3u8",
        );
        assert!(matches!(direct.strategy(), PlaybackStrategy::Manifest { .. }));

        let stored = resolved(
            SourceClassification::StoredFile {
                path: "videos/a.m3u8".into(),
            },
            "https://storage.example.com/videos/a.M3U8?token=1",
        );
        assert!(matches!(stored.strategy(), PlaybackStrategy::Manifest { .. }));
    }

    #[test]
    fn test_embed_wins_over_manifest() {
        let embed = resolved(
            SourceClassification::EmbedIframe {
                url: "https://streamable.com/e/x.m3u8".into(),
            },
            "https://streamable.com/e/x.m3u8",
        );
        let strategy = embed.strategy();
        assert!(matches!(strategy, PlaybackStrategy::Embed { .. }));
        assert!(!strategy.uses_media_element());
    }

    #[test]
    fn test_progressive_default() {
        let source = resolved(SourceClassification::Fallback, FALLBACK_VIDEO_URL);
        let strategy = source.strategy();
        assert_eq!(
            strategy,
            PlaybackStrategy::Progressive {
                url: FALLBACK_VIDEO_URL.to_string()
            }
        );
        assert_eq!(strategy.url(), FALLBACK_VIDEO_URL);
    }

    #[test]
    fn test_labels() {
        assert_eq!(SourceClassification::Fallback.label(), "fallback");
        assert_eq!(
            SourceClassification::ProxiedUrl {
                original_url: String::new()
            }
            .label(),
            "proxied_url"
        );
    }
}
