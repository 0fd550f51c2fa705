use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::error::FetchError;
use super::transport::Transport;

/// Attempt budget, backoff and per-attempt deadline for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first
  pub max_attempts: u32,
  /// Delay unit for linear backoff
  pub base_delay: Duration,
  /// Deadline applied to each attempt independently
  pub timeout: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_secs(1),
      timeout: Duration::from_secs(10),
    }
  }
}

impl RetryPolicy {
  /// Wait before the attempt following `attempt` (1-based): `attempt * base_delay`.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self.base_delay * attempt
  }
}

/// A single logical request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
  pub url: Url,
}

impl RequestSpec {
  pub fn get(url: Url) -> Self {
    Self { url }
  }
}

/// Decoded JSON body of a successful response.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub url: Url,
  pub status: u16,
  pub body: Value,
}

/// Executes requests with a deadline per attempt and linear-backoff retries.
#[derive(Clone)]
pub struct ResilientFetcher {
  transport: Arc<dyn Transport>,
  policy: RetryPolicy,
}

impl ResilientFetcher {
  pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
    Self { transport, policy }
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  /// Run `spec`, retrying any failure until the attempt budget is spent.
  ///
  /// Each call gets a fresh budget. The error of the last attempt is returned.
  pub async fn execute(&self, spec: &RequestSpec) -> Result<RawResponse, FetchError> {
    let max_attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      debug!(attempt, url = %spec.url, "sending request");

      match self.attempt(spec).await {
        Ok(response) => return Ok(response),
        Err(err) => {
          warn!(attempt, url = %spec.url, error = %err, "request attempt failed");

          if attempt >= max_attempts {
            return Err(err);
          }

          tokio::time::sleep(self.policy.delay_after(attempt)).await;
          attempt += 1;
        }
      }
    }
  }

  async fn attempt(&self, spec: &RequestSpec) -> Result<RawResponse, FetchError> {
    let url = spec.url.as_str();

    let reply = match tokio::time::timeout(self.policy.timeout, self.transport.get(&spec.url)).await
    {
      Err(_elapsed) => {
        return Err(FetchError::Timeout {
          url: url.to_string(),
          timeout: self.policy.timeout,
        })
      }
      Ok(Err(e)) => {
        return Err(FetchError::Network {
          url: url.to_string(),
          message: e.message,
        })
      }
      Ok(Ok(reply)) => reply,
    };

    if !(200..300).contains(&reply.status) {
      let reason = StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");

      return Err(FetchError::Http {
        url: url.to_string(),
        status: reply.status,
        reason: reason.to_string(),
      });
    }

    let body = serde_json::from_str(&reply.body).map_err(|e| FetchError::Unsuccessful {
      url: url.to_string(),
      message: format!("Malformed response body: {}", e),
    })?;

    Ok(RawResponse {
      url: spec.url.clone(),
      status: reply.status,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::ErrorKind;
  use crate::testing::MockTransport;
  use serde_json::json;
  use tokio::time::Instant;

  fn spec() -> RequestSpec {
    RequestSpec::get(Url::parse("https://api.example.test/anime/home").unwrap())
  }

  #[tokio::test(start_paused = true)]
  async fn test_succeeds_on_third_attempt_after_linear_backoff() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure("connection refused");
    transport.push_failure("connection reset");
    transport.push_json(json!({ "success": true }));

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    let started = Instant::now();
    let response = fetcher.execute(&spec()).await.expect("third attempt succeeds");

    assert_eq!(response.body, json!({ "success": true }));
    assert_eq!(transport.call_count(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_hanging_transport_times_out_after_three_attempts() {
    let transport = Arc::new(MockTransport::new());
    transport.set_default_hang();

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    let started = Instant::now();
    let err = fetcher.execute(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(transport.call_count(), 3);
    // Three 10s deadlines plus 1s and 2s of backoff
    assert!(started.elapsed() >= Duration::from_secs(33));
  }

  #[tokio::test(start_paused = true)]
  async fn test_no_retry_after_success() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(json!({ "success": true }));

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    fetcher.execute(&spec()).await.unwrap();

    assert_eq!(transport.call_count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_http_status_is_classified_from_last_attempt() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure("connection refused");
    transport.push_failure("connection refused");
    transport.push_status(404);

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    let err = fetcher.execute(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http(404));
    assert_eq!(err.to_string(), "HTTP 404: Not Found");
  }

  #[tokio::test(start_paused = true)]
  async fn test_transport_failure_is_network_not_timeout() {
    let transport = Arc::new(MockTransport::new());
    transport.set_default_failure("dns lookup failed");

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    let err = fetcher.execute(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.to_string(), "Network error: dns lookup failed");
  }

  #[tokio::test(start_paused = true)]
  async fn test_malformed_body_is_unsuccessful_response() {
    let transport = Arc::new(MockTransport::new());
    transport.set_default_body(200, "<html>maintenance</html>");

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    let err = fetcher.execute(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsuccessfulResponse);
    assert_eq!(transport.call_count(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_each_execute_gets_a_fresh_budget() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure("down");
    transport.push_failure("down");
    transport.push_failure("down");
    transport.push_failure("down");
    transport.push_json(json!({}));

    let fetcher = ResilientFetcher::new(transport.clone(), RetryPolicy::default());
    assert!(fetcher.execute(&spec()).await.is_err());
    assert!(fetcher.execute(&spec()).await.is_ok());
    assert_eq!(transport.call_count(), 5);
  }

  #[test]
  fn test_backoff_is_linear() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_after(1), Duration::from_secs(1));
    assert_eq!(policy.delay_after(2), Duration::from_secs(2));
  }
}
