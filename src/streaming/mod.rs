//! Media streaming module.
//!
//! Serves third-party video bytes to the browser player.
//!
//! # Routes
//!
//! - `GET /proxy-video?url=<encoded>` - Range-passthrough proxy for
//!   hotlink-protected hosts

mod proxy;

pub use proxy::{proxy_video, ProxyError, ProxyQuery, VideoProxy};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the proxy router.
pub fn proxy_router() -> Router<AppContext> {
    Router::new().route("/proxy-video", get(proxy_video))
}
