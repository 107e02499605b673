use crate::catalog::Catalog;
use crate::config::Config;
use crate::metadata::{MetadataProvider, TmdbProvider};
use crate::storage::{SupabaseStorage, UnconfiguredStorage};
use crate::streaming::{self, VideoProxy};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use marquee_player::ports::ObjectStorage;
use marquee_player::resolver::DEFAULT_PROXY_ENDPOINT;
use marquee_player::SourceResolver;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_metadata;
pub mod routes_playback;
pub mod routes_upload;

pub use error::ApiError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    /// Metadata search provider; `None` without an API key
    pub metadata: Option<Arc<dyn MetadataProvider>>,
    pub storage: Arc<dyn ObjectStorage>,
    pub resolver: SourceResolver<dyn ObjectStorage>,
    pub proxy: VideoProxy,
}

impl AppContext {
    /// Build the context from configuration, wiring the real collaborators.
    pub fn from_config(config: Config, catalog: Arc<Catalog>) -> Result<Self> {
        let metadata = match config.tmdb.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => {
                let provider = TmdbProvider::new(key.to_string(), config.tmdb.language.clone())?
                    .with_base_url(config.tmdb.base_url.clone());
                Some(Arc::new(provider) as Arc<dyn MetadataProvider>)
            }
            None => {
                tracing::warn!("No TMDB api_key configured; metadata routes disabled");
                None
            }
        };

        let storage: Arc<dyn ObjectStorage> = match SupabaseStorage::from_config(&config.storage)
            .context("Failed to create storage client")?
        {
            Some(storage) => {
                tracing::info!("Using storage bucket {:?}", storage.bucket());
                Arc::new(storage)
            }
            None => {
                tracing::warn!("No storage base_url configured; uploads and stored files disabled");
                Arc::new(UnconfiguredStorage)
            }
        };

        let proxy = VideoProxy::new(&config.proxy).context("Failed to create proxy client")?;

        Ok(Self::new(config, catalog, metadata, storage, proxy))
    }

    /// Assemble a context from explicit collaborators.
    pub fn new(
        config: Config,
        catalog: Arc<Catalog>,
        metadata: Option<Arc<dyn MetadataProvider>>,
        storage: Arc<dyn ObjectStorage>,
        proxy: VideoProxy,
    ) -> Self {
        let resolver = SourceResolver::new(storage.clone())
            .with_proxy_endpoint(DEFAULT_PROXY_ENDPOINT)
            .with_signed_url_expiry(Duration::from_secs(config.storage.signed_url_expiry_secs));

        Self {
            config: Arc::new(config),
            catalog,
            metadata,
            storage,
            resolver,
            proxy,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    let mut app = Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api_routes(&ctx))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Serve static files if directory is provided
    // Uses SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    streaming::proxy_router()
        .merge(routes_metadata::metadata_routes())
        .merge(routes_playback::playback_routes())
        .merge(routes_upload::upload_routes(ctx.config.upload.max_size_bytes))
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let catalog = Catalog::new(config.catalog.path.clone());
    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::from_config(config, catalog)?;

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
