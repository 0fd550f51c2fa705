//! Normalized catalog types and the request outcome contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::{ErrorKind, FetchError};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const PLACEHOLDER_POSTER: &str = "/placeholder-anime.jpg";
pub const NO_DESCRIPTION: &str = "No description available";

/// An anime entry mapped from whatever shape the upstream returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeSummary {
  pub id: String,
  pub title: String,
  pub poster_url: String,
  pub rating: f64,
  pub total_episodes: u32,
  /// TV, Movie, OVA, ...
  pub kind: String,
  pub status: String,
  pub genres: Vec<String>,
  pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub year: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_minutes: Option<u32>,
  pub studios: Vec<String>,
  /// "sub" or "dub"
  pub audio_track: String,
}

impl Default for AnimeSummary {
  fn default() -> Self {
    Self {
      id: String::new(),
      title: UNKNOWN_TITLE.to_string(),
      poster_url: PLACEHOLDER_POSTER.to_string(),
      rating: 0.0,
      total_episodes: 0,
      kind: "Unknown".to_string(),
      status: "Unknown".to_string(),
      genres: Vec::new(),
      description: NO_DESCRIPTION.to_string(),
      year: None,
      duration_minutes: None,
      studios: Vec::new(),
      audio_track: "sub".to_string(),
    }
  }
}

/// Featured entry on the home feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotlightEntry {
  #[serde(flatten)]
  pub anime: AnimeSummary,
  pub rank: u32,
  pub extra_info: Vec<String>,
}

/// Entry of a ranked list (top airing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
  #[serde(flatten)]
  pub anime: AnimeSummary,
  pub rank: u32,
}

/// Everything shown on the home page, fetched in one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeedSnapshot {
  pub spotlight: Vec<SpotlightEntry>,
  pub trending: Vec<AnimeSummary>,
  pub top_airing: Vec<RankedEntry>,
  /// Absent only on the empty payload of a failed request
  pub fetched_at: Option<DateTime<Utc>>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
  pub results: Vec<AnimeSummary>,
  pub page: u32,
  pub total_pages: u32,
  pub has_next_page: bool,
  pub total_results: u32,
}

impl Default for SearchResultPage {
  fn default() -> Self {
    Self {
      results: Vec::new(),
      page: 1,
      total_pages: 1,
      has_next_page: false,
      total_results: 0,
    }
  }
}

impl SearchResultPage {
  /// Payload reported when `page` could not be fetched at all.
  pub fn failed(page: u32) -> Self {
    Self {
      page,
      total_pages: 0,
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  #[default]
  Unknown,
  Healthy,
  Unhealthy,
}

/// Result of probing the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
  pub status: HealthStatus,
  pub checked_at: Option<DateTime<Utc>>,
  pub error: Option<String>,
  pub error_kind: Option<ErrorKind>,
}

impl HealthReport {
  pub fn healthy(checked_at: DateTime<Utc>) -> Self {
    Self {
      status: HealthStatus::Healthy,
      checked_at: Some(checked_at),
      error: None,
      error_kind: None,
    }
  }

  pub fn unhealthy(checked_at: DateTime<Utc>, err: &FetchError) -> Self {
    Self {
      status: HealthStatus::Unhealthy,
      checked_at: Some(checked_at),
      error: Some(err.to_string()),
      error_kind: Some(err.kind()),
    }
  }

  /// Map onto the outcome contract: unhealthy reports become failures that
  /// still carry the report as their payload.
  pub fn into_outcome(self) -> RequestOutcome<Self> {
    match (self.status, self.error.clone(), self.error_kind) {
      (HealthStatus::Healthy, _, _) => RequestOutcome::Success {
        data: self,
        from_cache: false,
      },
      (_, reason, kind) => RequestOutcome::Failure {
        reason: reason.unwrap_or_else(|| "API health unknown".to_string()),
        kind: kind.unwrap_or(ErrorKind::Network),
        data: self,
      },
    }
  }
}

/// What every catalog operation returns. Never carries a raw error without
/// a usable payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
  /// Fresh data, from the network or an unexpired cache entry
  Success { data: T, from_cache: bool },
  /// The request failed; an earlier cached copy is served instead
  StaleFallback { data: T, reason: String },
  /// The request failed with nothing cached; `data` is an empty shape
  Failure {
    data: T,
    reason: String,
    kind: ErrorKind,
  },
}

impl<T> RequestOutcome<T> {
  pub fn data(&self) -> &T {
    match self {
      Self::Success { data, .. } | Self::StaleFallback { data, .. } | Self::Failure { data, .. } => {
        data
      }
    }
  }

  pub fn into_data(self) -> T {
    match self {
      Self::Success { data, .. } | Self::StaleFallback { data, .. } | Self::Failure { data, .. } => {
        data
      }
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success { .. })
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, Self::StaleFallback { .. })
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, Self::Failure { .. })
  }

  pub fn from_cache(&self) -> bool {
    match self {
      Self::Success { from_cache, .. } => *from_cache,
      Self::StaleFallback { .. } => true,
      Self::Failure { .. } => false,
    }
  }

  /// Failure message for stale and failed outcomes.
  pub fn reason(&self) -> Option<&str> {
    match self {
      Self::Success { .. } => None,
      Self::StaleFallback { reason, .. } | Self::Failure { reason, .. } => Some(reason),
    }
  }
}
