//! Trait definition and types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait the catalog's search
//! routes are served from, along with the shapes returned to the browser.
//! Field names are snake_case because the front end consumes them verbatim.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use marquee_common::MediaType;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// A movie or show as listed by search and trending queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    /// Provider-specific numeric identifier.
    pub id: u64,
    /// Title for movies, name for shows.
    pub title: String,
    pub overview: Option<String>,
    /// Release date for movies, first air date for shows (YYYY-MM-DD).
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

/// One page of summaries plus the provider's totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<ContentSummary>,
    pub total_results: u64,
    pub total_pages: u64,
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

/// Full details of a single movie or show, credits and trailers included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetail {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// Runtime in minutes; first episode run time for shows.
    pub runtime: Option<u32>,
    pub genres: Vec<Genre>,
    pub media_type: MediaType,
    /// Top-billed cast, at most [`MAX_CAST`].
    pub cast: Vec<CastMember>,
    /// Directors only, at most [`MAX_DIRECTORS`].
    pub crew: Vec<CrewMember>,
    /// YouTube trailers only.
    pub videos: Vec<VideoClip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    pub job: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoClip {
    pub id: String,
    /// Site-specific key, the YouTube video id for trailers.
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Number of cast members kept in a [`ContentDetail`].
pub const MAX_CAST: usize = 10;

/// Number of directors kept in a [`ContentDetail`].
pub const MAX_DIRECTORS: usize = 3;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Trending window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = marquee_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            other => Err(marquee_common::Error::invalid_input(format!(
                "unknown time window: {other}"
            ))),
        }
    }
}

/// Media filter for trending queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingKind {
    #[default]
    All,
    Movie,
    Tv,
}

impl TrendingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// The single media type this filter selects, if any.
    pub fn media_type(self) -> Option<MediaType> {
        match self {
            Self::All => None,
            Self::Movie => Some(MediaType::Movie),
            Self::Tv => Some(MediaType::Tv),
        }
    }
}

impl FromStr for TrendingKind {
    type Err = marquee_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(marquee_common::Error::invalid_input(format!(
                "unknown trending media type: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Image and trailer links
// ---------------------------------------------------------------------------

/// Rendition sizes offered by the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    W200,
    #[default]
    W500,
    W780,
    W1280,
    Original,
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::W200 => "w200",
            Self::W500 => "w500",
            Self::W780 => "w780",
            Self::W1280 => "w1280",
            Self::Original => "original",
        };
        f.write_str(s)
    }
}

/// Build a full image URL from a provider path fragment such as `/abc.jpg`.
///
/// Returns `None` for a missing or empty path.
pub fn image_url(image_base: &str, path: Option<&str>, size: ImageSize) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    Some(format!("{}/{size}{path}", image_base.trim_end_matches('/')))
}

/// Watch URL for a YouTube video key.
pub fn youtube_url(key: &str) -> String {
    format!("https://www.youtube.com/watch?v={key}")
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all metadata providers must implement.
///
/// Providers are shared across request handlers behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has credentials and can serve requests.
    fn is_available(&self) -> bool;

    /// Search movies and shows by free text. Other result kinds are dropped.
    async fn search_multi(&self, query: &str) -> anyhow::Result<SearchPage>;

    /// Fetch full details for the item `id` of the given media type.
    async fn details(&self, id: u64, media_type: MediaType) -> anyhow::Result<ContentDetail>;

    /// Fetch trending items for a window, optionally restricted to one media type.
    async fn trending(&self, window: TimeWindow, kind: TrendingKind)
        -> anyhow::Result<SearchPage>;
}
