//! Metadata search for the catalog's "add content" flow.
//!
//! This module defines a generic [`MetadataProvider`] trait and the summary
//! and detail shapes served by the `/api/tmdb/*` routes.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition, shared data types and link builders.
//! - [`providers`] -- Concrete provider implementations (TMDB).

pub mod provider;
pub mod providers;

pub use provider::{
    image_url, youtube_url, CastMember, ContentDetail, ContentSummary, CrewMember, Genre,
    ImageSize, MetadataProvider, SearchPage, TimeWindow, TrendingKind, VideoClip,
};
pub use providers::TmdbProvider;
