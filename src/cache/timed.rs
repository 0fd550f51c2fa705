//! TTL cache over a [`CacheStore`], with namespace eviction and stale reads.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::CacheStore;
use crate::fetch::ErrorKind;

/// Default time-to-live for cached entries.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// Prefix applied to every key this cache writes.
pub const DEFAULT_NAMESPACE: &str = "hianime_";

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Persisted form of a cached value.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
  data: T,
  /// Milliseconds since the Unix epoch at write time
  timestamp: i64,
}

/// Key-value cache with a uniform TTL.
///
/// Keys are scoped under a namespace prefix so the cache can share a backing
/// store with unrelated data. Store faults never reach the caller: reads
/// degrade to misses and writes are dropped after one recovery attempt.
pub struct TimedCache {
  store: Arc<dyn CacheStore>,
  namespace: String,
  ttl: Duration,
  clock: Arc<dyn Clock>,
}

impl TimedCache {
  /// Create a cache over `store` with the default TTL and namespace.
  pub fn new(store: Arc<dyn CacheStore>) -> Self {
    Self {
      store,
      namespace: DEFAULT_NAMESPACE.to_string(),
      ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
      clock: Arc::new(SystemClock),
    }
  }

  /// Set the time-to-live for cached entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Set the key prefix owned by this cache.
  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  /// Replace the clock used for timestamps and expiry.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Current time according to the cache's clock.
  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  pub fn clock(&self) -> Arc<dyn Clock> {
    self.clock.clone()
  }

  fn full_key(&self, key: &str) -> String {
    format!("{}{}", self.namespace, key)
  }

  /// Get an unexpired value.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entry = self.read_entry::<T>(key)?;
    let age_ms = self.clock.now().timestamp_millis() - entry.timestamp;

    if age_ms < self.ttl.num_milliseconds() {
      Some(entry.data)
    } else {
      debug!(key, age_ms, "cache entry expired");
      None
    }
  }

  /// Get a value regardless of its age.
  pub fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.read_entry::<T>(key).map(|entry| entry.data)
  }

  /// Store a value, resetting its timestamp.
  ///
  /// When the store rejects the write, the cache's namespace is cleared and
  /// the write retried once. A second failure is logged and dropped.
  pub fn set<T: Serialize>(&self, key: &str, value: &T) {
    let full_key = self.full_key(key);
    let entry = StoredEntry {
      data: value,
      timestamp: self.clock.now().timestamp_millis(),
    };

    let json = match serde_json::to_string(&entry) {
      Ok(json) => json,
      Err(e) => {
        warn!(kind = %ErrorKind::CacheFault, key, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self.store.set(&full_key, &json) {
      warn!(kind = %ErrorKind::CacheFault, key, error = %e, "cache write failed, clearing namespace");
      self.clear_namespace(&self.namespace);

      if let Err(e) = self.store.set(&full_key, &json) {
        warn!(kind = %ErrorKind::CacheFault, key, error = %e, "cache write retry failed");
      }
    }
  }

  /// Remove every key starting with `prefix`. Returns the number removed.
  pub fn clear_namespace(&self, prefix: &str) -> usize {
    match self.store.remove_prefix(prefix) {
      Ok(removed) => {
        debug!(prefix, removed, "cleared cache namespace");
        removed
      }
      Err(e) => {
        warn!(kind = %ErrorKind::CacheFault, prefix, error = %e, "failed to clear cache namespace");
        0
      }
    }
  }

  /// Remove every entry owned by this cache.
  pub fn clear_all(&self) -> usize {
    self.clear_namespace(&self.namespace)
  }

  fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<StoredEntry<T>> {
    let full_key = self.full_key(key);

    let raw = match self.store.get(&full_key) {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(kind = %ErrorKind::CacheFault, key, error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(entry) => Some(entry),
      Err(e) => {
        warn!(kind = %ErrorKind::CacheFault, key, error = %e, "dropping corrupt cache entry");
        if let Err(e) = self.store.remove(&full_key) {
          warn!(kind = %ErrorKind::CacheFault, key, error = %e, "failed to remove corrupt cache entry");
        }
        None
      }
    }
  }
}
