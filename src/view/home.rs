use chrono::{DateTime, Utc};

use crate::catalog::{AnimeSummary, CatalogClient, HomeFeedSnapshot, RankedEntry, SpotlightEntry};

use super::DataView;

const HOME_INPUT: &str = "home";

/// The home page: spotlight, trending and top airing lists.
pub struct HomeFeedView {
  client: CatalogClient,
  view: DataView<HomeFeedSnapshot>,
}

impl HomeFeedView {
  pub fn new(client: CatalogClient) -> Self {
    let view = DataView::new().with_clock(client.cache().clock());
    Self { client, view }
  }

  /// Load the feed, answering from cache while it is fresh.
  pub fn load(&mut self) {
    let client = self.client.clone();
    self.view.start(HOME_INPUT, async move { client.home().await });
  }

  /// Load from the network again after a failure.
  pub fn retry(&mut self) {
    self.refresh();
  }

  /// Bypass the cache. The cached copy still backs a failed refresh.
  pub fn refresh(&mut self) {
    let client = self.client.clone();
    self
      .view
      .start(HOME_INPUT, async move { client.refresh_home().await });
  }

  pub fn view(&self) -> &DataView<HomeFeedSnapshot> {
    &self.view
  }

  pub fn poll(&mut self) -> bool {
    self.view.poll()
  }

  pub async fn changed(&mut self) -> bool {
    self.view.changed().await
  }

  pub fn dispose(&mut self) {
    self.view.dispose();
  }

  pub fn spotlight(&self) -> &[SpotlightEntry] {
    &self.view.data().spotlight
  }

  pub fn trending(&self) -> &[AnimeSummary] {
    &self.view.data().trending
  }

  pub fn top_airing(&self) -> &[RankedEntry] {
    &self.view.data().top_airing
  }

  /// When the shown feed was fetched from the API.
  pub fn last_updated(&self) -> Option<DateTime<Utc>> {
    self.view.data().fetched_at
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{catalog_client, wait_for_calls, MockTransport};
  use crate::view::LoadState;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn home_body(title: &str) -> serde_json::Value {
    json!({
      "success": true,
      "data": {
        "spotlightAnimes": [{ "id": "s1", "name": title, "rank": 1 }],
        "trendingAnimes": [{ "id": "t1", "name": "Trending" }],
        "top10Animes": { "today": [] }
      }
    })
  }

  #[tokio::test]
  async fn test_load_populates_lists() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(home_body("Kaiju No. 8"));

    let mut home = HomeFeedView::new(catalog_client(transport.clone()));
    assert_eq!(home.view().state(), LoadState::Idle);
    assert!(home.spotlight().is_empty());

    home.load();
    assert!(home.view().is_loading());
    home.changed().await;

    assert!(home.view().is_success());
    assert_eq!(home.spotlight()[0].anime.title, "Kaiju No. 8");
    assert_eq!(home.trending().len(), 1);
    assert!(home.top_airing().is_empty());
    assert!(home.last_updated().is_some());
  }

  #[tokio::test]
  async fn test_failed_refresh_is_stale() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(home_body("Cached"));

    let mut home = HomeFeedView::new(catalog_client(transport.clone()));
    home.load();
    home.changed().await;

    home.refresh();
    home.changed().await;

    assert!(home.view().is_stale());
    assert!(home.view().from_cache());
    assert_eq!(home.spotlight()[0].anime.title, "Cached");
    assert_eq!(transport.call_count(), 2);
  }

  #[tokio::test]
  async fn test_retry_goes_to_network() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure("offline");
    transport.push_json(home_body("Back"));

    let mut home = HomeFeedView::new(catalog_client(transport.clone()));
    home.load();
    home.changed().await;
    assert!(home.view().is_error());
    assert_eq!(home.view().error(), Some("Network error: offline"));

    home.retry();
    home.changed().await;
    assert!(home.view().is_success());
    assert!(home.view().error().is_none());
    assert_eq!(home.spotlight()[0].anime.title, "Back");
  }

  #[tokio::test(start_paused = true)]
  async fn test_late_success_never_overwrites_newer_error() {
    let transport = Arc::new(MockTransport::new());
    transport.push_delayed_json(Duration::from_secs(5), home_body("Late"));
    transport.push_failure("offline");

    let mut home = HomeFeedView::new(catalog_client(transport.clone()));
    home.load();
    wait_for_calls(&transport, 1).await;

    home.retry();
    home.changed().await;
    assert!(home.view().is_error());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!home.poll());
    assert!(home.view().is_error());
    assert!(home.spotlight().is_empty());
    assert_eq!(transport.completed_count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_dispose_aborts_request() {
    let transport = Arc::new(MockTransport::new());
    transport.push_delayed_json(Duration::from_secs(5), home_body("Never"));

    let mut home = HomeFeedView::new(catalog_client(transport.clone()));
    home.load();
    wait_for_calls(&transport, 1).await;

    home.dispose();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!home.poll());
    assert!(home.spotlight().is_empty());
    assert_eq!(transport.completed_count(), 0);
  }
}
