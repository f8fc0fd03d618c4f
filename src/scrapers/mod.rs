//! Source-site scraping.
//!
//! Every site is read by the same two generic stages, driven by its
//! [`SourceProfile`](crate::config::SourceProfile):
//!
//! 1. **Locating** ([`locator`]): find candidate article URLs on a listing page
//! 2. **Extracting** ([`extractor`]): pull title, date and body out of each page
//!
//! Site-specific knowledge lives only in the selectors of [`sources`].
//!
//! Scrapers use:
//! - `url::Url::join` for relative links, never string concatenation
//! - Placeholder-free [`Article`](crate::models::Article) fields: absent means `None`
//! - Logged, non-fatal handling of pages with no matches

pub mod extractor;
pub mod locator;
pub mod sources;
