//! Catalog access: home feed, anime details, search and health.
//!
//! [`CatalogClient`] combines the resilient fetcher with the timed cache and
//! reports every call as a [`RequestOutcome`], so callers always have a
//! payload to show.

mod client;
mod keys;
mod normalize;
mod types;

pub use client::CatalogClient;
pub use keys::CatalogKey;
pub use normalize::{FieldMap, FieldMapNormalizer, Normalizer};
pub use types::{
  AnimeSummary, HealthReport, HealthStatus, HomeFeedSnapshot, RankedEntry, RequestOutcome,
  SearchResultPage, SpotlightEntry, NO_DESCRIPTION, PLACEHOLDER_POSTER, UNKNOWN_TITLE,
};
