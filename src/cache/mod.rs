//! Timed caching over a pluggable key-value store.
//!
//! This module provides the persistence side of the catalog client:
//! - A `CacheStore` trait over the backing key-value store, with
//!   in-memory, SQLite and no-op backends
//! - A `TimedCache` that applies a uniform TTL, scopes keys under a
//!   namespace prefix, and still serves expired entries on request so the
//!   client can fall back to stale data when the network is unavailable

mod storage;
mod timed;

pub use storage::{CacheStore, MemoryStore, NoopStore, SqliteStore};
pub use timed::{Clock, SystemClock, TimedCache, DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
