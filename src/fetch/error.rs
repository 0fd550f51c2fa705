use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed request or cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
  /// No response within the per-attempt deadline
  Timeout,
  /// Response status outside the success range
  Http(u16),
  /// Transport-level failure other than a timeout
  Network,
  /// Envelope reported `success: false`, or the body was malformed
  UnsuccessfulResponse,
  /// Backing store read or write failure (logged, never returned)
  CacheFault,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Timeout => write!(f, "timeout"),
      Self::Http(status) => write!(f, "http {}", status),
      Self::Network => write!(f, "network"),
      Self::UnsuccessfulResponse => write!(f, "unsuccessful response"),
      Self::CacheFault => write!(f, "cache fault"),
    }
  }
}

/// A classified request failure.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
  #[error("Request timeout after {}s", timeout.as_secs_f64())]
  Timeout { url: String, timeout: Duration },

  #[error("HTTP {status}: {reason}")]
  Http {
    url: String,
    status: u16,
    reason: String,
  },

  #[error("Network error: {message}")]
  Network { url: String, message: String },

  #[error("{message}")]
  Unsuccessful { url: String, message: String },
}

impl FetchError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Timeout { .. } => ErrorKind::Timeout,
      Self::Http { status, .. } => ErrorKind::Http(*status),
      Self::Network { .. } => ErrorKind::Network,
      Self::Unsuccessful { .. } => ErrorKind::UnsuccessfulResponse,
    }
  }

  /// The request target this failure belongs to.
  pub fn url(&self) -> &str {
    match self {
      Self::Timeout { url, .. }
      | Self::Http { url, .. }
      | Self::Network { url, .. }
      | Self::Unsuccessful { url, .. } => url,
    }
  }
}
