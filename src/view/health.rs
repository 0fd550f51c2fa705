use chrono::{DateTime, Utc};

use crate::catalog::{CatalogClient, HealthReport, HealthStatus};

use super::DataView;

/// API availability indicator.
pub struct HealthView {
  client: CatalogClient,
  view: DataView<HealthReport>,
}

impl HealthView {
  pub fn new(client: CatalogClient) -> Self {
    let view = DataView::new()
      .with_clock(client.cache().clock())
      .with_failure_payload();
    Self { client, view }
  }

  pub fn check_health(&mut self) {
    let client = self.client.clone();
    self.view.start("health", async move {
      client.health_check().await.into_outcome()
    });
  }

  pub fn status(&self) -> HealthStatus {
    self.view.data().status
  }

  pub fn is_healthy(&self) -> bool {
    self.status() == HealthStatus::Healthy
  }

  pub fn is_unknown(&self) -> bool {
    self.status() == HealthStatus::Unknown
  }

  pub fn last_check(&self) -> Option<DateTime<Utc>> {
    self.view.data().checked_at
  }

  pub fn report(&self) -> &HealthReport {
    self.view.data()
  }

  pub fn view(&self) -> &DataView<HealthReport> {
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
