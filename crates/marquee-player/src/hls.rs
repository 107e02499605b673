//! Streaming protocol adapter for HLS manifests.
//!
//! A manifest URL is handed straight to the media element when it reports
//! native support for the Apple HLS MIME type. Otherwise an adaptive engine
//! module is loaded asynchronously and bound to the element; the manifest is
//! loaded once the engine reports that the media is attached. A missing or
//! unsupported engine degrades to assigning the URL directly.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ports::MediaElement;

/// MIME type probed on the media element for native HLS playback.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

static MANIFEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.m3u8(\?|$)").expect("invalid manifest regex"));

/// Whether `url` points at an HLS manifest (`.m3u8`, optional query string).
pub fn is_manifest_url(url: &str) -> bool {
    MANIFEST_RE.is_match(url)
}

/// Construction options for an adaptive engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub enable_worker: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
        }
    }
}

/// Events emitted by an attached engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    MediaAttached,
    Error { fatal: bool, details: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("adaptive engine unavailable: {0}")]
    Unavailable(String),

    #[error("adaptive engine failed: {0}")]
    Engine(String),
}

/// Loads the optional engine module on demand.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EngineModule>, EngineError>;
}

/// A loaded engine module.
pub trait EngineModule: Send + Sync {
    /// Whether the runtime can drive the engine (media source extensions).
    fn is_supported(&self) -> bool;

    fn create(&self, config: EngineConfig) -> Box<dyn AdaptiveEngine>;
}

/// One engine instance bound to one media element.
pub trait AdaptiveEngine: Send {
    /// Bind to the media element. Engine events are delivered on `events`.
    fn attach_media(&mut self, events: mpsc::UnboundedSender<EngineEvent>);

    fn load_source(&mut self, url: &str);

    fn destroy(&mut self) -> Result<(), EngineError>;
}

/// Loader for runtimes that ship no adaptive engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEngine;

#[async_trait]
impl EngineLoader for NoEngine {
    async fn load(&self) -> Result<Arc<dyn EngineModule>, EngineError> {
        Err(EngineError::Unavailable("no engine bundled".into()))
    }
}

/// A fatal engine error surfaced to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFault {
    pub details: String,
}

/// An engine bound to the media element, waiting for or playing a manifest.
pub struct AdaptiveAttachment {
    engine: Box<dyn AdaptiveEngine>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    url: String,
    source_loaded: bool,
    destroyed: bool,
}

impl AdaptiveAttachment {
    fn new(
        engine: Box<dyn AdaptiveEngine>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        url: String,
    ) -> Self {
        Self {
            engine,
            events,
            url,
            source_loaded: false,
            destroyed: false,
        }
    }

    /// Next event from the engine; `None` once the engine dropped its sender.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// React to an engine event. Returns a fault when the engine gave up.
    pub fn handle(&mut self, event: EngineEvent) -> Option<StreamFault> {
        match event {
            EngineEvent::MediaAttached => {
                if !self.source_loaded {
                    debug!(url = %self.url, "media attached, loading manifest");
                    self.engine.load_source(&self.url);
                    self.source_loaded = true;
                }
                None
            }
            EngineEvent::Error { fatal: true, details } => {
                warn!(url = %self.url, %details, "fatal stream error");
                Some(StreamFault { details })
            }
            EngineEvent::Error { fatal: false, details } => {
                debug!(url = %self.url, %details, "recoverable stream error");
                None
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Destroy the engine. Destroy-time failures are logged and dropped.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.events.close();
        if let Err(e) = self.engine.destroy() {
            debug!(error = %e, "ignoring engine destroy failure");
        }
    }
}

impl Drop for AdaptiveAttachment {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Result of [`attach`].
pub enum Attachment {
    /// URL assigned to the element as a plain source.
    Direct,
    /// Manifest assigned to an element with native HLS support.
    Native,
    /// Adaptive engine bound to the element.
    Adaptive(AdaptiveAttachment),
    /// The attach was cancelled before it completed; nothing was assigned.
    Cancelled,
}

impl Attachment {
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Adaptive(_))
    }

    pub fn adaptive_mut(&mut self) -> Option<&mut AdaptiveAttachment> {
        match self {
            Self::Adaptive(attachment) => Some(attachment),
            _ => None,
        }
    }

    pub fn teardown(&mut self) {
        if let Self::Adaptive(attachment) = self {
            attachment.teardown();
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::Native => f.write_str("Native"),
            Self::Adaptive(a) => f.debug_tuple("Adaptive").field(&a.url).finish(),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Attach `url` to `media`.
///
/// Non-manifest URLs are assigned directly. If `cancel` fires while the
/// engine module is loading, nothing is attached and
/// [`Attachment::Cancelled`] is returned.
pub async fn attach<M>(
    media: &mut M,
    url: &str,
    loader: &dyn EngineLoader,
    cancel: &CancellationToken,
) -> Attachment
where
    M: MediaElement + ?Sized,
{
    if !is_manifest_url(url) {
        media.set_source(url);
        return Attachment::Direct;
    }

    if media.can_play_type(HLS_MIME_TYPE) {
        debug!(url, "native HLS support");
        media.set_source(url);
        return Attachment::Native;
    }

    let loaded = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Attachment::Cancelled,
        loaded = loader.load() => loaded,
    };
    if cancel.is_cancelled() {
        return Attachment::Cancelled;
    }

    match loaded {
        Ok(module) if module.is_supported() => {
            let mut engine = module.create(EngineConfig::default());
            let (tx, rx) = mpsc::unbounded_channel();
            engine.attach_media(tx);
            Attachment::Adaptive(AdaptiveAttachment::new(engine, rx, url.to_string()))
        }
        Ok(_) => {
            warn!(url, "adaptive engine unsupported, assigning manifest directly");
            media.set_source(url);
            Attachment::Direct
        }
        Err(e) => {
            warn!(url, error = %e, "adaptive engine unavailable, assigning manifest directly");
            media.set_source(url);
            Attachment::Direct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeMedia {
        native_hls: bool,
        sources: Vec<String>,
    }

    impl MediaElement for FakeMedia {
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn seek(&mut self, _: f64) {}
        fn set_volume(&mut self, _: f64) {}
        fn set_muted(&mut self, _: bool) {}
        fn set_rate(&mut self, _: f64) {}
        fn set_source(&mut self, url: &str) {
            self.sources.push(url.to_string());
        }
        fn reload(&mut self) {}
        fn can_play_type(&self, mime: &str) -> bool {
            self.native_hls && mime == HLS_MIME_TYPE
        }
    }

    #[derive(Default)]
    struct EngineLog {
        created: Vec<EngineConfig>,
        loaded: Vec<String>,
        destroyed: usize,
    }

    struct FakeEngine {
        log: Arc<Mutex<EngineLog>>,
        fail_destroy: bool,
    }

    impl AdaptiveEngine for FakeEngine {
        fn attach_media(&mut self, events: mpsc::UnboundedSender<EngineEvent>) {
            let _ = events.send(EngineEvent::MediaAttached);
        }
        fn load_source(&mut self, url: &str) {
            self.log.lock().loaded.push(url.to_string());
        }
        fn destroy(&mut self) -> Result<(), EngineError> {
            self.log.lock().destroyed += 1;
            if self.fail_destroy {
                return Err(EngineError::Engine("already gone".into()));
            }
            Ok(())
        }
    }

    struct FakeModule {
        supported: bool,
        fail_destroy: bool,
        log: Arc<Mutex<EngineLog>>,
    }

    impl EngineModule for FakeModule {
        fn is_supported(&self) -> bool {
            self.supported
        }
        fn create(&self, config: EngineConfig) -> Box<dyn AdaptiveEngine> {
            self.log.lock().created.push(config);
            Box::new(FakeEngine {
                log: Arc::clone(&self.log),
                fail_destroy: self.fail_destroy,
            })
        }
    }

    struct FakeLoader {
        module: Arc<FakeModule>,
        delay: Duration,
    }

    #[async_trait]
    impl EngineLoader for FakeLoader {
        async fn load(&self) -> Result<Arc<dyn EngineModule>, EngineError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.module.clone() as Arc<dyn EngineModule>)
        }
    }

    fn loader(supported: bool, fail_destroy: bool) -> (FakeLoader, Arc<Mutex<EngineLog>>) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        let module = Arc::new(FakeModule {
            supported,
            fail_destroy,
            log: Arc::clone(&log),
        });
        (
            FakeLoader {
                module,
                delay: Duration::ZERO,
            },
            log,
        )
    }

    const MANIFEST: &str = "https://cdn.example.com/live/master.m3u8";

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest_url(MANIFEST));
        assert!(is_manifest_url("https://cdn.example.com/a.M3U8?token=abc"));
        assert!(!is_manifest_url("https://cdn.example.com/a.mp4"));
        assert!(!is_manifest_url("https://cdn.example.com/a.m3u8x"));
        assert!(!is_manifest_url("https://cdn.example.com/a.m3u8/segment.ts"));
    }

    #[tokio::test]
    async fn progressive_url_is_assigned_directly() {
        let (loader, log) = loader(true, false);
        let mut media = FakeMedia::default();
        let attachment = attach(
            &mut media,
            "https://cdn.example.com/a.mp4",
            &loader,
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(attachment, Attachment::Direct));
        assert_eq!(media.sources, vec!["https://cdn.example.com/a.mp4"]);
        assert!(log.lock().created.is_empty());
    }

    #[tokio::test]
    async fn native_support_skips_engine() {
        let (loader, log) = loader(true, false);
        let mut media = FakeMedia {
            native_hls: true,
            ..Default::default()
        };
        let attachment = attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;
        assert!(matches!(attachment, Attachment::Native));
        assert_eq!(media.sources, vec![MANIFEST]);
        assert!(log.lock().created.is_empty());
    }

    #[tokio::test]
    async fn engine_loads_manifest_after_media_attached() {
        let (loader, log) = loader(true, false);
        let mut media = FakeMedia::default();
        let mut attachment =
            attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;

        assert!(media.sources.is_empty());
        assert_eq!(
            log.lock().created,
            vec![EngineConfig {
                enable_worker: true
            }]
        );

        let adaptive = attachment.adaptive_mut().unwrap();
        let event = adaptive.next_event().await.unwrap();
        assert_eq!(event, EngineEvent::MediaAttached);
        assert!(adaptive.handle(event).is_none());
        assert_eq!(log.lock().loaded, vec![MANIFEST]);

        // A second attach notification does not reload.
        adaptive.handle(EngineEvent::MediaAttached);
        assert_eq!(log.lock().loaded.len(), 1);
    }

    #[tokio::test]
    async fn fatal_engine_error_becomes_fault() {
        let (loader, _) = loader(true, false);
        let mut media = FakeMedia::default();
        let mut attachment =
            attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;
        let adaptive = attachment.adaptive_mut().unwrap();

        assert!(adaptive
            .handle(EngineEvent::Error {
                fatal: false,
                details: "bufferStalled".into()
            })
            .is_none());
        let fault = adaptive
            .handle(EngineEvent::Error {
                fatal: true,
                details: "manifestLoadError".into(),
            })
            .unwrap();
        assert_eq!(fault.details, "manifestLoadError");
    }

    #[tokio::test]
    async fn unsupported_engine_falls_back_to_direct() {
        let (loader, log) = loader(false, false);
        let mut media = FakeMedia::default();
        let attachment = attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;
        assert!(matches!(attachment, Attachment::Direct));
        assert_eq!(media.sources, vec![MANIFEST]);
        assert!(log.lock().created.is_empty());
    }

    #[tokio::test]
    async fn missing_engine_falls_back_to_direct() {
        let mut media = FakeMedia::default();
        let attachment = attach(&mut media, MANIFEST, &NoEngine, &CancellationToken::new()).await;
        assert!(matches!(attachment, Attachment::Direct));
        assert_eq!(media.sources, vec![MANIFEST]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_loading_attaches_nothing() {
        let (mut loader, log) = loader(true, false);
        loader.delay = Duration::from_secs(5);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let mut media = FakeMedia::default();
        let attachment = attach(&mut media, MANIFEST, &loader, &cancel).await;
        assert!(matches!(attachment, Attachment::Cancelled));
        assert!(media.sources.is_empty());
        assert!(log.lock().created.is_empty());
    }

    #[tokio::test]
    async fn teardown_destroys_once_and_swallows_errors() {
        let (loader, log) = loader(true, true);
        let mut media = FakeMedia::default();
        let mut attachment =
            attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;

        attachment.teardown();
        attachment.teardown();
        drop(attachment);
        assert_eq!(log.lock().destroyed, 1);
    }

    #[tokio::test]
    async fn drop_destroys_engine() {
        let (loader, log) = loader(true, false);
        let mut media = FakeMedia::default();
        let attachment = attach(&mut media, MANIFEST, &loader, &CancellationToken::new()).await;
        drop(attachment);
        assert_eq!(log.lock().destroyed, 1);
    }
}
