//! Marquee-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across marquee:
//!
//! - **Typed IDs**: A type-safe wrapper for catalog content identifiers
//! - **Core Types**: The catalog content record and the playable subset of it
//! - **Host Tables**: Known upstream host families (proxied CDNs and embed hosts)
//! - **Path Utilities**: File extensions and video MIME types
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use marquee_common::{ContentId, Error, Result};
//! use marquee_common::hosts::is_proxied_host;
//!
//! let id = ContentId::from("7f1c2a");
//! assert_eq!(id.as_str(), "7f1c2a");
//!
//! assert!(is_proxied_host("www.terabox.com"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("content"))
//! }
//! ```

pub mod error;
pub mod hosts;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
