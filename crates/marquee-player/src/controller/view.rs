use serde::Serialize;

use super::state::PlaybackState;
use crate::source::SourceClassification;

/// What the player surface renders, derived from the source classification
/// and the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderPolicy {
    /// Sandboxed iframe instead of the media element.
    pub iframe: bool,
    pub controls_overlay: bool,
    pub loading_spinner: bool,
    /// Large play button shown while paused.
    pub paused_overlay: bool,
    /// Error message with a Retry button.
    pub error_overlay: bool,
}

impl RenderPolicy {
    pub fn for_source(classification: &SourceClassification, state: &PlaybackState) -> Self {
        let iframe = classification.is_embed();
        let uninstrumented = iframe || classification.is_proxied();
        let has_error = state.error.is_some();

        Self {
            iframe,
            controls_overlay: !iframe && state.show_controls,
            loading_spinner: !uninstrumented && state.is_loading,
            paused_overlay: !uninstrumented && !state.is_playing && !state.is_loading && !has_error,
            error_overlay: has_error,
        }
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::PlaybackError;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.9), "0:09");
        assert_eq!(format_time(75.0), "1:15");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(5025.0), "1:23:45");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_embed_suppresses_everything() {
        let state = PlaybackState::default();
        let policy = RenderPolicy::for_source(
            &SourceClassification::EmbedIframe {
                url: "https://streamable.com/e/x".into(),
            },
            &state,
        );
        assert!(policy.iframe);
        assert!(!policy.controls_overlay);
        assert!(!policy.loading_spinner);
        assert!(!policy.paused_overlay);
    }

    #[test]
    fn test_proxied_keeps_controls_only() {
        let mut state = PlaybackState::default();
        state.is_loading = true;
        let policy = RenderPolicy::for_source(
            &SourceClassification::ProxiedUrl {
                original_url: "https://terabox.com/s/1".into(),
            },
            &state,
        );
        assert!(!policy.iframe);
        assert!(policy.controls_overlay);
        assert!(!policy.loading_spinner);
        assert!(!policy.paused_overlay);
    }

    #[test]
    fn test_direct_source_overlays() {
        let mut state = PlaybackState::default();
        let direct = SourceClassification::DirectUrl {
            url: "https://cdn.example.com/a.mp4".into(),
        };

        let policy = RenderPolicy::for_source(&direct, &state);
        assert!(policy.paused_overlay);
        assert!(!policy.loading_spinner);

        state.is_loading = true;
        let policy = RenderPolicy::for_source(&direct, &state);
        assert!(policy.loading_spinner);
        assert!(!policy.paused_overlay);

        state.is_loading = false;
        state.error = Some(PlaybackError::MediaFault);
        let policy = RenderPolicy::for_source(&direct, &state);
        assert!(policy.error_overlay);
        assert!(!policy.paused_overlay);
    }
}
