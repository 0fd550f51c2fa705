use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Status and body of a single HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpReply {
  pub status: u16,
  pub body: String,
}

/// Failure below the HTTP layer (DNS, connect, TLS, reset, body read).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
  pub message: String,
}

impl TransportError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    Self::new(e.to_string())
  }
}

/// One GET round-trip. Deadlines and retries are applied by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &Url) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport sending JSON headers.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }

  /// Wrap an existing client. Its default headers are used as-is.
  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
    let response = self.client.get(url.clone()).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    Ok(HttpReply { status, body })
  }
}
