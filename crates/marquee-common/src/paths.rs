//! File name utilities for uploaded video files.
//!
//! Used by the upload route to validate incoming files and to derive the
//! extension of the stored object.

use std::path::Path;

/// The extension of a file name, or `None` when it has none.
///
/// # Examples
///
/// ```
/// use marquee_common::paths::file_extension;
///
/// assert_eq!(file_extension("clip.final.mp4"), Some("mp4"));
/// assert_eq!(file_extension("README"), None);
/// ```
pub fn file_extension(file_name: &str) -> Option<&str> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

/// Best-effort MIME type for a video file name.
pub fn video_content_type(file_name: &str) -> &'static str {
    match file_extension(file_name)
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogg") | Some("ogv") => "video/ogg",
        Some("avi") => "video/avi",
        Some("mov") => "video/mov",
        Some("wmv") => "video/wmv",
        Some("mkv") => "video/x-matroska",
        Some("m3u8") => "application/vnd.apple.mpegurl",
        _ => "application/octet-stream",
    }
}
