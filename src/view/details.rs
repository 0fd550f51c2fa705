use crate::catalog::{AnimeSummary, CatalogClient};

use super::DataView;

/// Details page for one anime, keyed by its id.
pub struct AnimeDetailsView {
  client: CatalogClient,
  anime_id: Option<String>,
  view: DataView<AnimeSummary>,
}

impl AnimeDetailsView {
  pub fn new(client: CatalogClient) -> Self {
    let view = DataView::new().with_clock(client.cache().clock());
    Self {
      client,
      anime_id: None,
      view,
    }
  }

  /// Switch to another anime. `None` or a blank id clears the view without
  /// a request.
  ///
  /// Setting the id already shown is a no-op.
  pub fn set_anime_id(&mut self, anime_id: Option<&str>) {
    let anime_id = anime_id.map(str::trim).filter(|id| !id.is_empty());
    if self.anime_id.as_deref() == anime_id {
      return;
    }

    self.anime_id = anime_id.map(String::from);
    match anime_id {
      Some(id) => self.fetch(id.to_string()),
      None => self.view.reset(),
    }
  }

  pub fn retry(&mut self) {
    if let Some(id) = self.anime_id.clone() {
      self.fetch(id);
    }
  }

  fn fetch(&mut self, id: String) {
    let client = self.client.clone();
    let input = id.clone();
    self
      .view
      .start(input, async move { client.anime_details(&id).await });
  }

  pub fn anime_id(&self) -> Option<&str> {
    self.anime_id.as_deref()
  }

  pub fn anime(&self) -> &AnimeSummary {
    self.view.data()
  }

  pub fn view(&self) -> &DataView<AnimeSummary> {
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
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::ErrorKind;
  use crate::cache::Clock;
  use crate::testing::{catalog_client, catalog_client_with_clock, ManualClock, MockTransport};
  use serde_json::json;
  use std::sync::Arc;

  fn details_body(id: &str, name: &str) -> serde_json::Value {
    json!({ "success": true, "data": { "anime": { "id": id, "name": name } } })
  }

  #[tokio::test]
  async fn test_setting_id_loads_details() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(details_body("vinland-saga-1", "Vinland Saga"));

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some("vinland-saga-1"));
    details.changed().await;

    assert!(details.view().is_success());
    assert_eq!(details.anime().title, "Vinland Saga");
    assert_eq!(details.anime_id(), Some("vinland-saga-1"));
  }

  #[tokio::test]
  async fn test_none_returns_to_idle_without_request() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(details_body("mob-1", "Mob Psycho 100"));

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some("mob-1"));
    details.changed().await;

    details.set_anime_id(None);
    assert!(details.view().is_idle());
    assert_eq!(details.anime(), &AnimeSummary::default());
    assert!(!details.changed().await);
    assert_eq!(transport.call_count(), 1);
  }

  #[tokio::test]
  async fn test_blank_id_is_idle_without_request() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(details_body("mob-1", "Mob Psycho 100"));

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some(""));
    details.set_anime_id(Some("   "));

    assert!(details.view().is_idle());
    assert_eq!(details.anime_id(), None);
    assert!(!details.changed().await);
    assert_eq!(transport.call_count(), 0);

    details.set_anime_id(Some(" mob-1 "));
    details.changed().await;
    assert_eq!(details.anime_id(), Some("mob-1"));
    assert!(transport.calls()[0].as_str().ends_with("/info?id=mob-1"));
  }

  #[tokio::test]
  async fn test_last_updated_follows_cache_clock() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(details_body("frieren-1", "Frieren"));
    let clock = Arc::new(ManualClock::new());
    clock.advance(chrono::Duration::hours(3));

    let mut details = AnimeDetailsView::new(catalog_client_with_clock(transport, clock.clone()));
    details.set_anime_id(Some("frieren-1"));
    details.changed().await;

    assert!(details.view().is_success());
    assert_eq!(details.view().last_updated(), Some(clock.now()));
  }

  #[tokio::test]
  async fn test_unknown_id_fails_with_default_summary() {
    let transport = Arc::new(MockTransport::new());

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some("does-not-exist"));
    details.changed().await;

    assert!(details.view().is_error());
    assert_eq!(details.view().error_kind(), Some(ErrorKind::Network));
    assert_eq!(details.anime(), &AnimeSummary::default());
  }

  #[tokio::test]
  async fn test_retry_repeats_same_id() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure("offline");
    transport.push_json(details_body("frieren-1", "Frieren"));

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some("frieren-1"));
    details.changed().await;
    assert!(details.view().is_error());

    details.retry();
    details.changed().await;
    assert!(details.view().is_success());

    let calls = transport.calls();
    assert_eq!(calls[0], calls[1]);
  }

  #[tokio::test]
  async fn test_new_id_failure_does_not_show_previous_anime() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(details_body("a-1", "First"));

    let mut details = AnimeDetailsView::new(catalog_client(transport.clone()));
    details.set_anime_id(Some("a-1"));
    details.changed().await;

    details.set_anime_id(Some("b-2"));
    details.changed().await;

    assert!(details.view().is_error());
    assert_eq!(details.anime().title, "Unknown Title");
  }
}
