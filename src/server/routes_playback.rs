//! Playback routes.
//!
//! Resolves a catalog record server-side so clients without the player core
//! can still learn how to play it, and hands player-core clients the
//! `[player]` tuning from the server config.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use marquee_common::ContentId;
use marquee_player::{PlaybackStrategy, PlayerConfig, ResolvedSource, SourceClassification};
use serde::Serialize;

use super::error::ApiError;
use super::AppContext;

/// Create playback routes.
pub fn playback_routes() -> Router<AppContext> {
    Router::new()
        .route("/movies/:id/source", get(get_source))
        .route("/player/config", get(get_player_config))
}

#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub classification: SourceClassification,
    pub play_url: String,
    pub download_url: Option<String>,
    pub strategy: PlaybackStrategy,
}

impl From<ResolvedSource> for SourceResponse {
    fn from(source: ResolvedSource) -> Self {
        let strategy = source.strategy();
        Self {
            classification: source.classification,
            play_url: source.play_url,
            download_url: source.download_url,
            strategy,
        }
    }
}

/// `GET /api/movies/:id/source`
async fn get_source(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<SourceResponse>, ApiError> {
    let id = ContentId::from(id);
    let record = ctx
        .catalog
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("Movie not found: {id}")))?;

    let source = ctx
        .resolver
        .resolve(&record.playable())
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

    tracing::debug!(id = %id, classification = source.classification.label(), "Resolved source");
    Ok(Json(source.into()))
}

/// `GET /api/player/config`
async fn get_player_config(State(ctx): State<AppContext>) -> Json<PlayerConfig> {
    Json(ctx.config.player.clone())
}
