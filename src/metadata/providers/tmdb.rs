//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.
//! - Results reshaped into the catalog's summary and detail types: movie/show
//!   fields unified, cast trimmed, crew narrowed to directors, videos narrowed
//!   to YouTube trailers.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use marquee_common::MediaType;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metadata::provider::{
    CastMember, ContentDetail, ContentSummary, CrewMember, Genre, MetadataProvider, SearchPage,
    TimeWindow, TrendingKind, VideoClip, MAX_CAST, MAX_DIRECTORS,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(4) {
    Some(n) => n,
    None => unreachable!(),
};

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbListItem>,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    total_pages: u64,
}

/// A search or trending entry. Movies carry `title`/`release_date`, shows
/// carry `name`/`first_air_date`, people carry neither.
#[derive(Debug, Deserialize)]
struct TmdbListItem {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    runtime: Option<u32>,
    episode_run_time: Option<Vec<u32>>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    credits: Option<TmdbCredits>,
    videos: Option<TmdbVideos>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u64,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    id: u64,
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    id: u64,
    name: String,
    job: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbVideos {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    id: String,
    key: String,
    name: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// Wraps the TMDB v3 REST API with built-in rate limiting and retry logic.
///
/// # Examples
///
/// ```no_run
/// use marquee::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into()).unwrap();
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider with the given API key and language.
    ///
    /// The `language` parameter should be a tag such as `"en-US"`. Rate
    /// limiting is configured at 4 requests per second.
    pub fn new(api_key: String, language: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build TMDB HTTP client")?;

        let rate_limiter = RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND));

        Ok(Self {
            client,
            api_key,
            language,
            base_url: TMDB_BASE_URL.to_string(),
            rate_limiter,
        })
    }

    /// Point the provider at another API root (a mirror or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {}", self.redact(url)))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {}", self.redact(url)))?;

            return Ok(resp);
        }
    }

    /// Build a full API URL with the API key and language query parameters.
    fn url(&self, path: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language)
        );
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Strip the API key before a URL reaches a log line or error message.
    fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.replace(urlencoding::encode(&self.api_key).as_ref(), "***")
    }

    async fn fetch_page(&self, url: &str, what: &str) -> anyhow::Result<TmdbPage> {
        debug!(url = %self.redact(url), "TMDB {what}");
        self.get(url)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to parse TMDB {what} response"))
    }
}

/// Reshape a list entry, dropping anything that is neither a movie nor a show.
///
/// `fallback` supplies the media type for endpoints that omit it on each
/// entry (single-type trending lists).
fn to_summary(item: TmdbListItem, fallback: Option<MediaType>) -> Option<ContentSummary> {
    let media_type = match item.media_type.as_deref() {
        Some(kind) => kind.parse::<MediaType>().ok()?,
        None => fallback?,
    };

    Some(ContentSummary {
        id: item.id,
        title: item.title.or(item.name).unwrap_or_default(),
        overview: item.overview,
        release_date: item.release_date.or(item.first_air_date),
        vote_average: item.vote_average,
        poster_path: item.poster_path,
        backdrop_path: item.backdrop_path,
        media_type,
        genre_ids: item.genre_ids,
    })
}

fn to_page(page: TmdbPage, fallback: Option<MediaType>) -> SearchPage {
    SearchPage {
        results: page
            .results
            .into_iter()
            .filter_map(|item| to_summary(item, fallback))
            .collect(),
        total_results: page.total_results,
        total_pages: page.total_pages,
    }
}

fn to_detail(detail: TmdbDetail, media_type: MediaType) -> ContentDetail {
    let runtime = detail.runtime.filter(|&r| r > 0).or_else(|| {
        detail
            .episode_run_time
            .as_ref()
            .and_then(|v| v.first().copied())
    });
    let credits = detail.credits.unwrap_or_default();

    ContentDetail {
        id: detail.id,
        title: detail.title.or(detail.name).unwrap_or_default(),
        overview: detail.overview,
        release_date: detail.release_date.or(detail.first_air_date),
        vote_average: detail.vote_average,
        poster_path: detail.poster_path,
        backdrop_path: detail.backdrop_path,
        runtime,
        genres: detail
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name,
            })
            .collect(),
        media_type,
        cast: credits
            .cast
            .into_iter()
            .take(MAX_CAST)
            .map(|p| CastMember {
                id: p.id,
                name: p.name,
                character: p.character,
                profile_path: p.profile_path,
            })
            .collect(),
        crew: credits
            .crew
            .into_iter()
            .filter(|p| p.job.as_deref() == Some("Director"))
            .take(MAX_DIRECTORS)
            .map(|p| CrewMember {
                id: p.id,
                name: p.name,
                job: p.job.unwrap_or_default(),
                profile_path: p.profile_path,
            })
            .collect(),
        videos: detail
            .videos
            .unwrap_or_default()
            .results
            .into_iter()
            .filter(|v| v.kind == "Trailer" && v.site == "YouTube")
            .map(|v| VideoClip {
                id: v.id,
                key: v.key,
                name: v.name,
                site: v.site,
                kind: v.kind,
            })
            .collect(),
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_multi(&self, query: &str) -> anyhow::Result<SearchPage> {
        let url = self.url("/search/multi", &[("query", query), ("page", "1")]);
        let page = self.fetch_page(&url, "multi search").await?;
        Ok(to_page(page, None))
    }

    async fn details(&self, id: u64, media_type: MediaType) -> anyhow::Result<ContentDetail> {
        let url = self.url(
            &format!("/{media_type}/{id}"),
            &[("append_to_response", "credits,videos")],
        );
        debug!(url = %self.redact(&url), "TMDB get details");

        let detail: TmdbDetail = self
            .get(&url)
            .await?
            .json()
            .await
            .context("failed to parse TMDB detail response")?;

        Ok(to_detail(detail, media_type))
    }

    async fn trending(
        &self,
        window: TimeWindow,
        kind: TrendingKind,
    ) -> anyhow::Result<SearchPage> {
        let url = self.url(
            &format!("/trending/{}/{}", kind.as_str(), window.as_str()),
            &[],
        );
        let page = self.fetch_page(&url, "trending").await?;
        Ok(to_page(page, kind.media_type()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TmdbProvider {
        TmdbProvider::new("test-key".into(), "en-US".into()).unwrap()
    }

    fn list_item(json: &str) -> TmdbListItem {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn summary_unifies_movie_and_show_fields() {
        let movie = to_summary(
            list_item(
                r#"{"id":1,"media_type":"movie","title":"Heat","release_date":"1995-12-15","genre_ids":[28]}"#,
            ),
            None,
        )
        .unwrap();
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.release_date.as_deref(), Some("1995-12-15"));
        assert_eq!(movie.media_type, MediaType::Movie);
        assert_eq!(movie.genre_ids, vec![28]);

        let show = to_summary(
            list_item(r#"{"id":2,"media_type":"tv","name":"Dark","first_air_date":"2017-12-01"}"#),
            None,
        )
        .unwrap();
        assert_eq!(show.title, "Dark");
        assert_eq!(show.release_date.as_deref(), Some("2017-12-01"));
        assert_eq!(show.media_type, MediaType::Tv);
    }

    #[test]
    fn summary_drops_people() {
        let person = list_item(r#"{"id":3,"media_type":"person","name":"Someone"}"#);
        assert!(to_summary(person, None).is_none());
    }

    #[test]
    fn summary_uses_fallback_media_type() {
        let item = list_item(r#"{"id":4,"title":"Untyped"}"#);
        assert_eq!(
            to_summary(item, Some(MediaType::Movie)).map(|s| s.media_type),
            Some(MediaType::Movie)
        );
        let item = list_item(r#"{"id":4,"title":"Untyped"}"#);
        assert!(to_summary(item, None).is_none());
    }

    #[test]
    fn detail_trims_credits_and_videos() {
        let cast: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"id":{i},"name":"Actor {i}","character":"Role"}}"#))
            .collect();
        let json = format!(
            r#"{{
                "id": 10, "name": "Show", "first_air_date": "2020-01-01",
                "episode_run_time": [42, 50], "genres": [{{"id": 18, "name": "Drama"}}],
                "credits": {{
                    "cast": [{}],
                    "crew": [
                        {{"id": 1, "name": "A", "job": "Director"}},
                        {{"id": 2, "name": "B", "job": "Writer"}},
                        {{"id": 3, "name": "C", "job": "Director"}},
                        {{"id": 4, "name": "D", "job": "Director"}},
                        {{"id": 5, "name": "E", "job": "Director"}}
                    ]
                }},
                "videos": {{"results": [
                    {{"id": "v1", "key": "yt1", "name": "Official", "site": "YouTube", "type": "Trailer"}},
                    {{"id": "v2", "key": "yt2", "name": "Clip", "site": "YouTube", "type": "Clip"}},
                    {{"id": "v3", "key": "vm1", "name": "Vimeo", "site": "Vimeo", "type": "Trailer"}}
                ]}}
            }}"#,
            cast.join(",")
        );
        let detail: TmdbDetail = serde_json::from_str(&json).unwrap();
        let detail = to_detail(detail, MediaType::Tv);

        assert_eq!(detail.title, "Show");
        assert_eq!(detail.release_date.as_deref(), Some("2020-01-01"));
        assert_eq!(detail.runtime, Some(42));
        assert_eq!(detail.genres[0].name, "Drama");
        assert_eq!(detail.cast.len(), MAX_CAST);
        assert_eq!(detail.crew.len(), MAX_DIRECTORS);
        assert!(detail.crew.iter().all(|c| c.job == "Director"));
        assert_eq!(detail.videos.len(), 1);
        assert_eq!(detail.videos[0].key, "yt1");
    }

    #[test]
    fn detail_without_credits() {
        let detail: TmdbDetail =
            serde_json::from_str(r#"{"id":7,"title":"Film","runtime":0,"episode_run_time":[]}"#)
                .unwrap();
        let detail = to_detail(detail, MediaType::Movie);
        assert_eq!(detail.runtime, None);
        assert!(detail.cast.is_empty());
        assert!(detail.crew.is_empty());
        assert!(detail.videos.is_empty());
    }

    #[test]
    fn url_construction() {
        let provider = provider().with_base_url("http://localhost:1234/3/");
        assert_eq!(
            provider.url("/search/multi", &[("query", "star wars & co")]),
            "http://localhost:1234/3/search/multi?api_key=test-key&language=en-US&query=star%20wars%20%26%20co"
        );
    }

    #[test]
    fn redacts_api_key() {
        let provider = provider();
        let url = provider.url("/trending/all/week", &[]);
        let redacted = provider.redact(&url);
        assert!(!redacted.contains("test-key"));
        assert!(redacted.contains("api_key=***"));
    }

    #[test]
    fn provider_is_available() {
        assert!(provider().is_available());

        let empty = TmdbProvider::new(String::new(), "en-US".into()).unwrap();
        assert!(!empty.is_available());
    }

    #[test]
    fn provider_name() {
        assert_eq!(provider().name(), "tmdb");
    }
}
