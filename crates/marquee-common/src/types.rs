//! Core type definitions for catalog content.
//!
//! [`ContentRecord`] mirrors a catalog row as stored and serialized (snake_case
//! field names). [`PlayableContent`] is the read-only subset the playback core
//! works from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ContentId;

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A feature film.
    #[default]
    Movie,
    /// A TV show.
    Tv,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Tv => write!(f, "tv"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(crate::Error::invalid_input(format!(
                "unknown media type: {other}"
            ))),
        }
    }
}

/// Which media slot of a record an uploaded file fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFileKind {
    /// The main feature.
    Video,
    /// The trailer.
    Trailer,
}

impl fmt::Display for MediaFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Trailer => write!(f, "trailer"),
        }
    }
}

impl std::str::FromStr for MediaFileKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "video" => Ok(Self::Video),
            "trailer" => Ok(Self::Trailer),
            other => Err(crate::Error::invalid_input(format!(
                "unknown media file kind: {other}"
            ))),
        }
    }
}

/// A catalog entry (movie or show) with metadata and optional media locators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    /// Direct external video URL.
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    /// Path of an uploaded object in the storage bucket.
    #[serde(default)]
    pub video_file_path: Option<String>,
    #[serde(default)]
    pub trailer_file_path: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    /// Create a bare record with only an id and a title.
    pub fn new(id: impl Into<ContentId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            release_year: None,
            duration_minutes: None,
            genre: None,
            rating: None,
            poster_url: None,
            backdrop_url: None,
            video_url: None,
            trailer_url: None,
            video_file_path: None,
            trailer_file_path: None,
            tmdb_id: None,
            media_type: MediaType::Movie,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder-style setter for the external video URL.
    #[must_use]
    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    /// Builder-style setter for the uploaded storage path.
    #[must_use]
    pub fn with_video_file_path(mut self, path: impl Into<String>) -> Self {
        self.video_file_path = Some(path.into());
        self
    }

    /// Set the storage path for the given media slot.
    pub fn set_file_path(&mut self, kind: MediaFileKind, path: impl Into<String>) {
        let path = Some(path.into());
        match kind {
            MediaFileKind::Video => self.video_file_path = path,
            MediaFileKind::Trailer => self.trailer_file_path = path,
        }
        self.updated_at = Some(Utc::now());
    }

    /// The playback-relevant view of this record.
    pub fn playable(&self) -> PlayableContent {
        PlayableContent::from(self)
    }
}

/// The subset of a [`ContentRecord`] relevant to playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableContent {
    pub id: ContentId,
    pub title: String,
    pub backdrop_url: Option<String>,
    pub external_url: Option<String>,
    pub storage_file_path: Option<String>,
    pub trailer_url: Option<String>,
}

impl From<&ContentRecord> for PlayableContent {
    fn from(record: &ContentRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            backdrop_url: record.backdrop_url.clone(),
            external_url: non_empty(record.video_url.as_deref()),
            storage_file_path: non_empty(record.video_file_path.as_deref()),
            trailer_url: record.trailer_url.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse_and_display() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("music".parse::<MediaType>().is_err());
        assert_eq!(MediaType::Tv.to_string(), "tv");
    }

    #[test]
    fn test_record_deserializes_catalog_row() {
        let json = r#"{
            "id": "a1",
            "title": "Big Buck Bunny",
            "video_url": "https://cdn.example.com/bbb.mp4",
            "video_file_path": null,
            "type": "movie"
        }"#;
        let record: ContentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "a1");
        assert_eq!(record.media_type, MediaType::Movie);
        assert_eq!(
            record.video_url.as_deref(),
            Some("https://cdn.example.com/bbb.mp4")
        );
        assert!(record.video_file_path.is_none());
    }

    #[test]
    fn test_playable_drops_blank_locators() {
        let mut record = ContentRecord::new("a1", "Blank");
        record.video_url = Some("   ".into());
        record.video_file_path = Some(String::new());

        let playable = record.playable();
        assert!(playable.external_url.is_none());
        assert!(playable.storage_file_path.is_none());
    }

    #[test]
    fn test_set_file_path_by_kind() {
        let mut record = ContentRecord::new("a1", "Upload");
        record.set_file_path(MediaFileKind::Trailer, "trailers/a1.mp4");
        assert_eq!(record.trailer_file_path.as_deref(), Some("trailers/a1.mp4"));
        assert!(record.video_file_path.is_none());
        assert!(record.updated_at.is_some());

        record.set_file_path(MediaFileKind::Video, "videos/a1.mp4");
        assert_eq!(record.video_file_path.as_deref(), Some("videos/a1.mp4"));
    }
}
