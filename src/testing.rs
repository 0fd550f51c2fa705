//! Test doubles for the transport and the cache clock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use crate::cache::{Clock, MemoryStore, TimedCache};
use crate::catalog::CatalogClient;
use crate::fetch::{HttpReply, ResilientFetcher, RetryPolicy, Transport, TransportError};

/// Clock that only moves when told to.
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}

#[derive(Debug, Clone)]
enum Scripted {
  Reply { status: u16, body: String },
  Failure(String),
  Hang,
  Delayed(std::time::Duration, Box<Scripted>),
}

/// Transport that replays a script of responses, then a default.
///
/// Records every requested URL and counts exchanges that ran to completion,
/// so tests can tell an aborted request from one that finished.
pub struct MockTransport {
  script: Mutex<VecDeque<Scripted>>,
  default: Mutex<Scripted>,
  calls: Mutex<Vec<Url>>,
  completed: AtomicUsize,
}

impl MockTransport {
  pub fn new() -> Self {
    Self {
      script: Mutex::new(VecDeque::new()),
      default: Mutex::new(Scripted::Failure("no scripted response".to_string())),
      calls: Mutex::new(Vec::new()),
      completed: AtomicUsize::new(0),
    }
  }

  fn push(&self, step: Scripted) {
    self.script.lock().unwrap().push_back(step);
  }

  pub fn push_json(&self, body: Value) {
    self.push_body(200, &body.to_string());
  }

  pub fn push_body(&self, status: u16, body: &str) {
    self.push(Scripted::Reply {
      status,
      body: body.to_string(),
    });
  }

  pub fn push_status(&self, status: u16) {
    self.push_body(status, "");
  }

  pub fn push_failure(&self, message: &str) {
    self.push(Scripted::Failure(message.to_string()));
  }

  pub fn push_delayed_json(&self, delay: std::time::Duration, body: Value) {
    self.push(Scripted::Delayed(
      delay,
      Box::new(Scripted::Reply {
        status: 200,
        body: body.to_string(),
      }),
    ));
  }

  pub fn set_default_body(&self, status: u16, body: &str) {
    *self.default.lock().unwrap() = Scripted::Reply {
      status,
      body: body.to_string(),
    };
  }

  pub fn set_default_failure(&self, message: &str) {
    *self.default.lock().unwrap() = Scripted::Failure(message.to_string());
  }

  pub fn set_default_hang(&self) {
    *self.default.lock().unwrap() = Scripted::Hang;
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn calls(&self) -> Vec<Url> {
    self.calls.lock().unwrap().clone()
  }

  pub fn completed_count(&self) -> usize {
    self.completed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
    self.calls.lock().unwrap().push(url.clone());

    let next = self.script.lock().unwrap().pop_front();
    let step = next.unwrap_or_else(|| self.default.lock().unwrap().clone());

    let step = match step {
      Scripted::Delayed(delay, inner) => {
        tokio::time::sleep(delay).await;
        *inner
      }
      other => other,
    };

    let result = match step {
      Scripted::Reply { status, body } => Ok(HttpReply { status, body }),
      Scripted::Failure(message) => Err(TransportError::new(message)),
      Scripted::Hang | Scripted::Delayed(..) => std::future::pending().await,
    };

    self.completed.fetch_add(1, Ordering::SeqCst);
    result
  }
}

/// Single-attempt client over `transport` with an in-memory cache.
pub fn catalog_client(transport: Arc<MockTransport>) -> CatalogClient {
  build_client(transport, TimedCache::new(Arc::new(MemoryStore::new())))
}

/// Like [`catalog_client`], with the cache reading time from `clock`.
pub fn catalog_client_with_clock(transport: Arc<MockTransport>, clock: Arc<ManualClock>) -> CatalogClient {
  build_client(transport, TimedCache::new(Arc::new(MemoryStore::new())).with_clock(clock))
}

fn build_client(transport: Arc<MockTransport>, cache: TimedCache) -> CatalogClient {
  let policy = RetryPolicy {
    max_attempts: 1,
    ..RetryPolicy::default()
  };
  let fetcher = ResilientFetcher::new(transport, policy);
  let base = Url::parse("https://api.example.test/api/v2/hianime").unwrap();

  CatalogClient::new(base, fetcher, Arc::new(cache)).unwrap()
}

/// Let spawned tasks run until `transport` has seen `calls` requests.
pub async fn wait_for_calls(transport: &MockTransport, calls: usize) {
  while transport.call_count() < calls {
    tokio::task::yield_now().await;
  }
}
