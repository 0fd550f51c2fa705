use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
use crate::catalog::FieldMap;
use crate::fetch::RetryPolicy;

/// Environment variable overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "HIANIME_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://api.hianime.to/anime";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  /// Alternate upstream field names per normalized field
  pub fields: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Deadline for each attempt
  pub timeout_secs: u64,
  pub max_attempts: u32,
  /// Backoff unit; attempt n waits n times this before the next one
  pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    let policy = RetryPolicy::default();
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: policy.timeout.as_secs(),
      max_attempts: policy.max_attempts,
      retry_delay_ms: policy.base_delay.as_millis() as u64,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Persist responses in SQLite; when off nothing is cached
  pub enabled: bool,
  pub ttl_secs: u64,
  pub namespace: String,
  /// Database file (default: $XDG_DATA_HOME/hianime/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: DEFAULT_TTL_MINUTES as u64 * 60,
      namespace: DEFAULT_NAMESPACE.to_string(),
      path: None,
    }
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hianime.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hianime/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_base_url_override(std::env::var(BASE_URL_ENV).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("hianime.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hianime").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file deserializes as null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Replace the base URL when `value` is set and non-blank.
  pub fn with_base_url_override(mut self, value: Option<String>) -> Self {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
      self.api.base_url = url.trim().to_string();
    }
    self
  }

  /// Parsed API base URL.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.api.base_url).map_err(|e| eyre!("Invalid API base URL {}: {}", self.api.base_url, e))
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.api.max_attempts.max(1),
      base_delay: Duration::from_millis(self.api.retry_delay_ms),
      timeout: Duration::from_secs(self.api.timeout_secs),
    }
  }

  pub fn cache_ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.ttl_secs as i64)
  }
}
