//! Cache keys and endpoints of the catalog operations.

use url::Url;

/// One cacheable catalog request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogKey {
  /// The home feed (spotlight, trending, top airing)
  Home,
  /// Full information for one anime
  AnimeDetails { id: String },
  /// One page of a text search
  Search { query: String, page: u32 },
}

impl CatalogKey {
  /// Key inside the cache namespace. The namespace prefix is added by the
  /// cache itself.
  pub fn cache_key(&self) -> String {
    match self {
      Self::Home => "home_data".to_string(),
      Self::AnimeDetails { id } => format!("anime_{}", id),
      Self::Search { query, page } => format!("search_{}_{}", query, page),
    }
  }

  /// Human-readable description for logs.
  pub fn description(&self) -> String {
    match self {
      Self::Home => "home feed".to_string(),
      Self::AnimeDetails { id } => format!("details of {}", id),
      Self::Search { query, page } => format!("search '{}' page {}", query, page),
    }
  }

  /// Absolute URL of the request against `base`.
  pub fn endpoint(&self, base: &Url) -> Url {
    let mut url = base.clone();

    let segment = match self {
      Self::Home => "home",
      Self::AnimeDetails { .. } => "info",
      Self::Search { .. } => "search",
    };

    // Cannot-be-a-base URLs are rejected when the client is built.
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(segment);
    }

    match self {
      Self::Home => {}
      Self::AnimeDetails { id } => {
        url.query_pairs_mut().append_pair("id", id);
      }
      Self::Search { query, page } => {
        url
          .query_pairs_mut()
          .append_pair("q", query)
          .append_pair("page", &page.to_string());
      }
    }

    url
  }

  /// Message reported when the envelope says `success: false`.
  pub fn unsuccessful_message(&self) -> &'static str {
    match self {
      Self::Home => "API returned unsuccessful response",
      Self::AnimeDetails { .. } => "Failed to fetch anime details",
      Self::Search { .. } => "Search request failed",
    }
  }
}
