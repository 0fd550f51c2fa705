use crate::catalog::{AnimeSummary, CatalogClient, SearchResultPage};

use super::DataView;

/// Paged text search.
pub struct SearchView {
  client: CatalogClient,
  query: String,
  /// Page of the latest request, repeated by `retry`
  requested_page: u32,
  view: DataView<SearchResultPage>,
}

impl SearchView {
  pub fn new(client: CatalogClient) -> Self {
    let view = DataView::new().with_clock(client.cache().clock());
    Self {
      client,
      query: String::new(),
      requested_page: 1,
      view,
    }
  }

  /// Search for `query`. A blank query cancels any request and clears the
  /// results.
  pub fn search(&mut self, query: &str, page: u32) {
    let query = query.trim();
    if query.is_empty() {
      self.clear();
      return;
    }

    self.query = query.to_string();
    self.requested_page = page;

    let client = self.client.clone();
    let query = self.query.clone();
    self
      .view
      .start(self.query.clone(), async move { client.search(&query, page).await });
  }

  /// Replace the results with the following page, when there is one.
  pub fn load_next_page(&mut self) {
    let data = self.view.data();
    if self.query.is_empty() || !data.has_next_page || self.view.is_loading() {
      return;
    }

    let next = match data.page.checked_add(1) {
      Some(next) => next,
      None => return,
    };
    let query = self.query.clone();
    self.search(&query, next);
  }

  /// Repeat the last request.
  pub fn retry(&mut self) {
    if !self.query.is_empty() {
      let query = self.query.clone();
      self.search(&query, self.requested_page);
    }
  }

  pub fn clear(&mut self) {
    self.query.clear();
    self.requested_page = 1;
    self.view.reset();
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn results(&self) -> &[AnimeSummary] {
    &self.view.data().results
  }

  pub fn page(&self) -> u32 {
    self.view.data().page
  }

  pub fn total_pages(&self) -> u32 {
    self.view.data().total_pages
  }

  pub fn has_next_page(&self) -> bool {
    self.view.data().has_next_page
  }

  pub fn total_results(&self) -> u32 {
    self.view.data().total_results
  }

  pub fn view(&self) -> &DataView<SearchResultPage> {
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
