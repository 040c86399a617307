//! Content source for BILIBILI COMICS.
//!
//! Fetches chapter lists and page images from the site's JSON API, including
//! the signed-in variant that needs bearer-token management.
//!
//! ## Core Types
//!
//! - [`BilibiliComics`] - Source facade: chapter lists, page lists, image URLs
//! - [`SourceConfig`] - Locale, base URL, timeout, user agent and rate limit
//! - [`SourceError`] - Error type of every fallible operation
//!
//! ## Session
//!
//! - [`auth::SessionCredential`] - Token pair and region decoded from the `access_token` cookie
//! - [`auth::AuthMiddleware`] - Attaches the bearer token, refreshes it on 401 and retries once
//! - [`auth::SessionStore`] - Injectable holder of the current credential
//!
//! ## Pipeline
//!
//! - [`http::Pipeline`] - Ordered [`http::Middleware`] stages over a [`http::Transport`]
//! - [`http::HostRateLimit`] - Per-host request spacing
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use comics_source::{BilibiliComics, ComicRef, SourceConfig};
//! use reqwest::cookie::Jar;
//!
//! # async fn run() -> Result<(), comics_source::SourceError> {
//! let source = BilibiliComics::new(SourceConfig::default(), Arc::new(Jar::default()))?;
//! for chapter in source.chapter_list(&ComicRef::parse("/detail/mc1234")?).await? {
//!     println!("{} {}", chapter.url, chapter.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod http;
pub mod locale;
pub mod models;
pub mod pages;

#[cfg(test)]
mod test_support;

pub use client::{BilibiliComics, BilibiliComicsBuilder};
pub use config::SourceConfig;
pub use error::SourceError;
pub use locale::{Locale, LocaleConfig};
pub use models::{Chapter, ChapterRef, ComicRef, Page};
pub use pages::PageCredential;
