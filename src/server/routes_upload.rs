//! Video upload route.
//!
//! Accepts a multipart form with a `video` file, the `movieId` it belongs to
//! and its `type` (`video` or `trailer`), stores the file in the storage
//! bucket and points the catalog record at it.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::{Bytes, BytesMut};
use marquee_common::paths::{file_extension, video_content_type};
use marquee_common::{ContentId, MediaFileKind};
use serde::Serialize;

use super::error::ApiError;
use super::AppContext;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// Room left in the request body limit for the form's text fields and
/// multipart framing.
const FORM_OVERHEAD: u64 = MIB;

/// Create upload routes. `max_size` bounds the file part in bytes.
pub fn upload_routes(max_size: u64) -> Router<AppContext> {
    let body_limit = usize::try_from(max_size.saturating_add(FORM_OVERHEAD)).unwrap_or(usize::MAX);
    Router::new()
        .route("/upload-video", post(upload_video))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_path: String,
    pub public_url: String,
    pub message: String,
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    size: u64,
    data: Bytes,
}

/// Human-readable size limit, e.g. `5GB`.
fn format_limit(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Object path for an upload: `{kind}s/{movie}_{kind}_{millis}.{ext}`.
fn object_path(movie_id: &ContentId, kind: MediaFileKind, file: &UploadedFile, millis: i64) -> String {
    let ext = file_extension(&file.file_name)
        .map(str::to_ascii_lowercase)
        .or_else(|| file.content_type.split('/').nth(1).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    format!("{kind}s/{movie_id}_{kind}_{millis}.{ext}")
}

fn form_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::new(err.status(), format!("Malformed form data: {}", err.body_text()))
}

/// `POST /api/upload-video`
async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let limits = &ctx.config.upload;
    let mut file: Option<UploadedFile> = None;
    let mut movie_id: Option<String> = None;
    let mut kind: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("video") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| video_content_type(&file_name).to_string());

                // Oversized parts are drained without buffering.
                let mut data = BytesMut::new();
                let mut size = 0u64;
                while let Some(chunk) = field.chunk().await.map_err(form_error)? {
                    size += chunk.len() as u64;
                    if size <= limits.max_size_bytes {
                        data.extend_from_slice(&chunk);
                    }
                }

                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && size == 0 {
                    continue;
                }
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    size,
                    data: data.freeze(),
                });
            }
            Some("movieId") => movie_id = Some(field.text().await.map_err(form_error)?),
            Some("type") => kind = Some(field.text().await.map_err(form_error)?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    if !limits.allowed_types.iter().any(|t| *t == file.content_type) {
        return Err(ApiError::bad_request("Invalid file type"));
    }
    if file.size > limits.max_size_bytes {
        return Err(ApiError::bad_request(format!(
            "File too large (max {})",
            format_limit(limits.max_size_bytes)
        )));
    }

    let movie_id = movie_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(ContentId::from)
        .ok_or_else(|| ApiError::bad_request("movieId is required"))?;
    let kind: MediaFileKind = kind
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("type must be video or trailer"))?;

    let file_path = object_path(&movie_id, kind, &file, chrono::Utc::now().timestamp_millis());
    tracing::info!(
        movie = %movie_id,
        path = %file_path,
        size = file.data.len(),
        "Uploading {}",
        kind
    );

    ctx.storage
        .upload(&file_path, file.data, &file.content_type)
        .await
        .map_err(|e| {
            tracing::error!("Upload error: {}", e);
            ApiError::internal("Failed to upload file")
        })?;

    let public_url = ctx.storage.public_url(&file_path).await.map_err(|e| {
        tracing::error!("Public URL error: {}", e);
        ApiError::internal("Internal server error")
    })?;

    if let Err(e) = ctx.catalog.set_file_path(&movie_id, kind, &file_path) {
        tracing::error!("Catalog update error: {}", e);
        if let Err(e) = ctx.storage.remove(&file_path).await {
            tracing::warn!(path = %file_path, "Failed to remove orphaned upload: {}", e);
        }
        return Err(ApiError::internal("Failed to update movie record"));
    }

    Ok(Json(UploadResponse {
        success: true,
        file_path,
        public_url,
        message: format!("{kind} uploaded successfully"),
    }))
}
