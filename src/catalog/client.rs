//! Catalog client with transparent caching and stale fallback.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::cache::{CacheStore, NoopStore, SqliteStore, TimedCache};
use crate::config::Config;
use crate::fetch::{FetchError, HttpTransport, RequestSpec, ResilientFetcher};

use super::keys::CatalogKey;
use super::normalize::{FieldMapNormalizer, Normalizer};
use super::types::{AnimeSummary, HealthReport, HomeFeedSnapshot, RequestOutcome, SearchResultPage};

/// Whether a fresh cache entry may answer the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheMode {
  PreferCache,
  /// Skip the fresh-hit check. Stale entries are still used on failure.
  ForceNetwork,
}

/// Client for the catalog API.
///
/// Every operation answers with a [`RequestOutcome`]: fresh data, an older
/// cached copy when the network fails, or an empty payload with the reason.
#[derive(Clone)]
pub struct CatalogClient {
  fetcher: ResilientFetcher,
  cache: Arc<TimedCache>,
  normalizer: Arc<dyn Normalizer>,
  base_url: Url,
}

impl CatalogClient {
  pub fn new(base_url: Url, fetcher: ResilientFetcher, cache: Arc<TimedCache>) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API base URL: {}", base_url));
    }

    Ok(Self {
      fetcher,
      cache,
      normalizer: Arc::new(FieldMapNormalizer::default()),
      base_url,
    })
  }

  /// Replace the payload mapping.
  pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
    self.normalizer = normalizer;
    self
  }

  /// Build a client over HTTP and the configured cache store.
  pub fn from_config(config: &Config) -> Result<Self> {
    let transport = Arc::new(HttpTransport::new()?);
    let fetcher = ResilientFetcher::new(transport, config.retry_policy());

    let store: Arc<dyn CacheStore> = if config.cache.enabled {
      Arc::new(SqliteStore::open(config.cache.path.as_deref())?)
    } else {
      Arc::new(NoopStore)
    };

    let cache = TimedCache::new(store)
      .with_ttl(config.cache_ttl())
      .with_namespace(config.cache.namespace.clone());

    let normalizer = FieldMapNormalizer::new(config.fields.clone());

    Ok(Self::new(config.base_url()?, fetcher, Arc::new(cache))?.with_normalizer(Arc::new(normalizer)))
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn cache(&self) -> &TimedCache {
    &self.cache
  }

  /// Home feed, served from cache while fresh.
  pub async fn home(&self) -> RequestOutcome<HomeFeedSnapshot> {
    self.home_with(CacheMode::PreferCache).await
  }

  /// Home feed from the network. The cached copy is kept as a fallback.
  pub async fn refresh_home(&self) -> RequestOutcome<HomeFeedSnapshot> {
    self.home_with(CacheMode::ForceNetwork).await
  }

  async fn home_with(&self, mode: CacheMode) -> RequestOutcome<HomeFeedSnapshot> {
    let normalizer = self.normalizer.clone();
    let cache = &self.cache;

    // Stamped when the response arrives, not when the request starts
    self
      .resolve(&CatalogKey::Home, mode, HomeFeedSnapshot::default(), |data| {
        Some(normalizer.home_feed(data, cache.now()))
      })
      .await
  }

  /// Full information for one anime.
  pub async fn anime_details(&self, id: &str) -> RequestOutcome<AnimeSummary> {
    let key = CatalogKey::AnimeDetails { id: id.to_string() };
    let normalizer = self.normalizer.clone();

    self
      .resolve(&key, CacheMode::PreferCache, AnimeSummary::default(), |data| {
        normalizer.anime_details(data)
      })
      .await
  }

  /// One page of search results.
  pub async fn search(&self, query: &str, page: u32) -> RequestOutcome<SearchResultPage> {
    let key = CatalogKey::Search {
      query: query.to_string(),
      page,
    };
    let normalizer = self.normalizer.clone();

    self
      .resolve(&key, CacheMode::PreferCache, SearchResultPage::failed(page), |data| {
        Some(normalizer.search_page(data, page))
      })
      .await
  }

  /// Probe the API with an uncached home request. Never fails; the report
  /// says whether the API answered.
  pub async fn health_check(&self) -> HealthReport {
    let spec = RequestSpec::get(CatalogKey::Home.endpoint(&self.base_url));

    match self.fetcher.execute(&spec).await {
      Ok(_) => HealthReport::healthy(self.cache.now()),
      Err(err) => HealthReport::unhealthy(self.cache.now(), &err),
    }
  }

  /// Drop every cached catalog entry. Returns the number removed.
  pub fn clear_cache(&self) -> usize {
    self.cache.clear_all()
  }

  /// Cache-first fetch with stale fallback.
  ///
  /// `normalize` maps the envelope's `data`; `None` marks the payload as
  /// unusable.
  async fn resolve<T, F>(&self, key: &CatalogKey, mode: CacheMode, empty: T, normalize: F) -> RequestOutcome<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&Value) -> Option<T>,
  {
    let cache_key = key.cache_key();

    if mode == CacheMode::PreferCache {
      if let Some(data) = self.cache.get::<T>(&cache_key) {
        debug!(key = %cache_key, "cache hit for {}", key.description());
        return RequestOutcome::Success {
          data,
          from_cache: true,
        };
      }
    }

    match self.fetch_data(key, normalize).await {
      Ok(data) => {
        self.cache.set(&cache_key, &data);
        RequestOutcome::Success {
          data,
          from_cache: false,
        }
      }
      Err(err) => match self.cache.get_stale::<T>(&cache_key) {
        Some(data) => {
          info!(key = %cache_key, error = %err, "serving stale {}", key.description());
          RequestOutcome::StaleFallback {
            data,
            reason: err.to_string(),
          }
        }
        None => RequestOutcome::Failure {
          data: empty,
          reason: err.to_string(),
          kind: err.kind(),
        },
      },
    }
  }

  async fn fetch_data<T, F>(&self, key: &CatalogKey, normalize: F) -> Result<T, FetchError>
  where
    F: FnOnce(&Value) -> Option<T>,
  {
    let response = self
      .fetcher
      .execute(&RequestSpec::get(key.endpoint(&self.base_url)))
      .await?;

    let unsuccessful = || FetchError::Unsuccessful {
      url: response.url.to_string(),
      message: key.unsuccessful_message().to_string(),
    };

    if response.body.get("success").and_then(Value::as_bool) != Some(true) {
      return Err(unsuccessful());
    }

    let data = response.body.get("data").unwrap_or(&Value::Null);
    normalize(data).ok_or_else(unsuccessful)
  }
}
