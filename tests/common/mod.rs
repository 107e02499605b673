//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] around an
//! in-memory catalog and a recording object storage. The [`with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use marquee::catalog::Catalog;
use marquee::config::{Config, DEFAULT_USER_AGENT};
use marquee::metadata::{MetadataProvider, TmdbProvider};
use marquee::server::{create_router, AppContext};
use marquee::streaming::VideoProxy;
use marquee_common::ContentRecord;
use marquee_player::ports::{ObjectStorage, StorageError};

/// Hostname the proxy tests point at; the harness resolves it to the mock
/// upstream.
pub const PROXIED_HOST: &str = "www.terabox.com";

/// Object storage double that records uploads and removals.
#[derive(Default)]
pub struct RecordingStorage {
    pub uploads: Mutex<Vec<(String, usize, String)>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_upload: bool,
    pub fail_signed: bool,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn public_url(&self, path: &str) -> Result<String, StorageError> {
        Ok(format!("https://storage.test/public/movie-videos/{path}"))
    }

    async fn signed_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        if self.fail_signed {
            return Err(StorageError::Status {
                status: 500,
                message: "signing unavailable".into(),
            });
        }
        Ok(Some(format!(
            "https://storage.test/sign/movie-videos/{path}?expires={}",
            expires_in.as_secs()
        )))
    }

    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        if self.fail_upload {
            return Err(StorageError::Status {
                status: 409,
                message: "The resource already exists".into(),
            });
        }
        self.uploads
            .lock()
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.removed.lock().push(path.to_string());
        Ok(())
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub catalog: Arc<Catalog>,
    pub storage: Arc<RecordingStorage>,
}

pub struct HarnessBuilder {
    config: Config,
    records: Vec<ContentRecord>,
    storage: RecordingStorage,
    tmdb_base: Option<String>,
    upstream: Option<SocketAddr>,
}

impl HarnessBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn record(mut self, record: ContentRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn storage(mut self, storage: RecordingStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Serve metadata routes from a TMDB stand-in at `base_url`.
    pub fn tmdb(mut self, base_url: impl Into<String>) -> Self {
        self.tmdb_base = Some(base_url.into());
        self
    }

    /// Resolve [`PROXIED_HOST`] to `addr` in the proxy's HTTP client.
    pub fn upstream(mut self, addr: SocketAddr) -> Self {
        self.upstream = Some(addr);
        self
    }

    pub fn build(self) -> TestHarness {
        let catalog = Catalog::in_memory();
        for record in self.records {
            catalog.insert(record).expect("failed to seed catalog");
        }

        let metadata = self.tmdb_base.map(|base| {
            let provider = TmdbProvider::new("test-key".into(), "en-US".into())
                .expect("failed to build TMDB provider")
                .with_base_url(base);
            Arc::new(provider) as Arc<dyn MetadataProvider>
        });

        let mut client = reqwest::Client::builder();
        if let Some(addr) = self.upstream {
            client = client.resolve(PROXIED_HOST, addr);
        }
        let proxy = VideoProxy::with_client(
            client.build().expect("failed to build proxy client"),
            DEFAULT_USER_AGENT,
        );

        let storage = Arc::new(self.storage);
        let ctx = AppContext::new(
            self.config,
            catalog.clone(),
            metadata,
            storage.clone() as Arc<dyn ObjectStorage>,
            proxy,
        );

        TestHarness {
            ctx,
            catalog,
            storage,
        }
    }

    /// Build and start an Axum server on a random port.
    pub async fn serve(self) -> (TestHarness, SocketAddr) {
        let harness = self.build();
        let app = create_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

impl TestHarness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            config: Config::default(),
            records: Vec::new(),
            storage: RecordingStorage::default(),
            tmdb_base: None,
            upstream: None,
        }
    }

    /// Start a server with default configuration and an empty catalog.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::builder().serve().await
    }
}
