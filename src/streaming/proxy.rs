//! Range-passthrough proxy for hotlink-protected video hosts.
//!
//! `GET /api/proxy-video?url=<encoded>` fetches the target with a browser-like
//! User-Agent and a `Referer` of the target's own origin, forwards the inbound
//! `Range` header, and streams the upstream body back untouched. Only hosts in
//! the proxied family are served.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use marquee_common::hosts::is_proxied_host;
use thiserror::Error;
use url::Url;

use crate::config::ProxyConfig;
use crate::server::AppContext;

/// Upstream response headers copied onto the proxied response.
const PASSTHROUGH_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
    header::CONTENT_LENGTH,
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing url")]
    MissingUrl,

    #[error("Invalid url")]
    InvalidUrl,

    #[error("Host not allowed")]
    HostNotAllowed(String),

    #[error("Upstream fetch failed")]
    Upstream(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::InvalidUrl | Self::HostNotAllowed(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            Self::HostNotAllowed(host) => tracing::warn!(host = %host, "Proxy refused host"),
            Self::Upstream(reason) => tracing::warn!(reason = %reason, "Proxy upstream failed"),
            _ => tracing::debug!("Proxy rejected request: {}", self),
        }

        (
            self.status(),
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Outbound half of the proxy: the HTTP client and the headers it injects.
#[derive(Debug, Clone)]
pub struct VideoProxy {
    client: reqwest::Client,
    user_agent: String,
}

impl VideoProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.user_agent.clone()))
    }

    /// Use a caller-built client. Redirects must be followed by it.
    pub fn with_client(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    /// Check a raw `url` parameter against the allow-list.
    pub fn validate_target(raw: Option<&str>) -> Result<Url, ProxyError> {
        let raw = raw.filter(|s| !s.is_empty()).ok_or(ProxyError::MissingUrl)?;
        let target = Url::parse(raw).map_err(|_| ProxyError::InvalidUrl)?;
        let host = target.host_str().unwrap_or_default().to_ascii_lowercase();
        if !is_proxied_host(&host) {
            return Err(ProxyError::HostNotAllowed(host));
        }
        Ok(target)
    }

    /// Fetch `target` and stream it back with the passthrough headers.
    pub async fn fetch(&self, target: Url, range: Option<&str>) -> Result<Response, ProxyError> {
        let referer = format!("{}/", target.origin().ascii_serialization());

        let mut request = self
            .client
            .get(target.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::REFERER, referer);
        if let Some(range) = range {
            request = request.header(reqwest::header::RANGE, range);
        }

        let upstream = request
            .send()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        let status = StatusCode::from_u16(upstream.status().as_u16())
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;
        tracing::debug!(url = %target, status = %status, range, "Proxying upstream response");

        let mut builder = Response::builder()
            .status(status)
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        for name in PASSTHROUGH_HEADERS {
            if let Some(value) = upstream.headers().get(name.as_str()) {
                if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
                    builder = builder.header(name, value);
                }
            }
        }

        builder
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ProxyError::Upstream(e.to_string()))
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

impl ProxyQuery {
    /// Parse a raw query string. The first `url` pair wins; anything else is
    /// ignored, so malformed queries still reach the JSON error path.
    pub fn parse(raw: Option<&str>) -> Self {
        let url = raw.and_then(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        });
        Self { url }
    }
}

/// `GET /api/proxy-video`
pub async fn proxy_video(
    State(ctx): State<AppContext>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let query = ProxyQuery::parse(raw.as_deref());
    let target = VideoProxy::validate_target(query.url.as_deref())?;
    let range = headers.get(header::RANGE).and_then(|h| h.to_str().ok());
    ctx.proxy.fetch(target, range).await
}
