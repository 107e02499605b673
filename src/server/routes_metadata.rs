//! Metadata search routes.
//!
//! Thin proxies over the configured [`MetadataProvider`] so the API key never
//! reaches the browser.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use marquee_common::MediaType;
use serde::Deserialize;

use super::error::ApiError;
use super::AppContext;
use crate::metadata::{ContentDetail, MetadataProvider, SearchPage, TimeWindow, TrendingKind};

/// Create metadata routes.
pub fn metadata_routes() -> Router<AppContext> {
    Router::new()
        .route("/tmdb/search", get(search))
        .route("/tmdb/details", get(details))
        .route("/tmdb/trending", get(trending))
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub time_window: Option<String>,
    pub media_type: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

fn provider(ctx: &AppContext) -> Result<Arc<dyn MetadataProvider>, ApiError> {
    ctx.metadata
        .clone()
        .filter(|p| p.is_available())
        .ok_or_else(|| ApiError::internal("TMDB API key not configured"))
}

/// `GET /api/tmdb/search?query=`
async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchPage>, ApiError> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter is required"))?;
    let provider = provider(&ctx)?;

    provider.search_multi(&query).await.map(Json).map_err(|e| {
        tracing::error!("TMDB search error: {:#}", e);
        ApiError::internal("Failed to search TMDB")
    })
}

/// `GET /api/tmdb/details?id=&type=movie|tv`
async fn details(
    State(ctx): State<AppContext>,
    Query(params): Query<DetailsQuery>,
) -> Result<Json<ContentDetail>, ApiError> {
    let (Some(id), Some(media_type)) = (params.id, params.media_type) else {
        return Err(ApiError::bad_request("ID and type parameters are required"));
    };
    let provider = provider(&ctx)?;

    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("ID must be numeric"))?;
    let media_type: MediaType = media_type
        .parse()
        .map_err(|_| ApiError::bad_request("Type must be movie or tv"))?;

    provider.details(id, media_type).await.map(Json).map_err(|e| {
        tracing::error!("TMDB details error: {:#}", e);
        ApiError::internal("Failed to fetch TMDB details")
    })
}

/// `GET /api/tmdb/trending?time_window=day|week&media_type=all|movie|tv`
async fn trending(
    State(ctx): State<AppContext>,
    Query(params): Query<TrendingQuery>,
) -> Result<Json<SearchPage>, ApiError> {
    let provider = provider(&ctx)?;

    let window = match params.time_window.as_deref() {
        Some(raw) => raw
            .parse::<TimeWindow>()
            .map_err(|_| ApiError::bad_request("time_window must be day or week"))?,
        None => TimeWindow::default(),
    };
    let kind = match params.media_type.as_deref() {
        Some(raw) => raw
            .parse::<TrendingKind>()
            .map_err(|_| ApiError::bad_request("media_type must be all, movie or tv"))?,
        None => TrendingKind::default(),
    };

    provider.trending(window, kind).await.map(Json).map_err(|e| {
        tracing::error!("TMDB trending error: {:#}", e);
        ApiError::internal("Failed to fetch trending content")
    })
}
