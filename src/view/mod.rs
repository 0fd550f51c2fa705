//! Load-state controllers for catalog data.
//!
//! A [`DataView<T>`] owns at most one in-flight request and the last data it
//! produced. Requests run on spawned tasks and report back through a channel;
//! the owner applies results by calling [`DataView::poll`] from its event
//! loop tick, or by awaiting [`DataView::changed`].
//!
//! ```ignore
//! let mut home = HomeFeedView::new(client.clone());
//! home.load();
//!
//! // In event loop tick
//! if home.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! match home.view().state() {
//!     LoadState::Loading => render_spinner(),
//!     LoadState::Success | LoadState::Stale => render_feed(home.trending()),
//!     LoadState::Error => render_error(home.view().error()),
//!     LoadState::Idle => {}
//! }
//! ```

mod details;
mod health;
mod home;
mod search;

pub use details::AnimeDetailsView;
pub use health::HealthView;
pub use home::HomeFeedView;
pub use search::SearchView;

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::cache::{Clock, SystemClock};
use crate::catalog::RequestOutcome;
use crate::fetch::ErrorKind;

/// Where a view is in its request lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
  /// Nothing requested yet, or cleared
  #[default]
  Idle,
  Loading,
  Success,
  /// The request failed; `data` still holds the last good value
  Error,
  /// The request failed and an older cached copy is shown
  Stale,
}

struct InFlight<T> {
  token: AbortHandle,
  receiver: oneshot::Receiver<RequestOutcome<T>>,
  input: String,
  /// State and error to return to if the request is cancelled
  resting: LoadState,
  resting_error: Option<String>,
  resting_error_kind: Option<ErrorKind>,
}

/// Request state plus the data it produced.
pub struct DataView<T> {
  state: LoadState,
  data: T,
  /// Input the current data was produced for
  data_input: Option<String>,
  error: Option<String>,
  error_kind: Option<ErrorKind>,
  from_cache: bool,
  last_updated: Option<DateTime<Utc>>,
  in_flight: Option<InFlight<T>>,
  take_failure_payload: bool,
  disposed: bool,
  clock: Arc<dyn Clock>,
}

impl<T: Default + Send + 'static> DataView<T> {
  pub fn new() -> Self {
    Self {
      state: LoadState::Idle,
      data: T::default(),
      data_input: None,
      error: None,
      error_kind: None,
      from_cache: false,
      last_updated: None,
      in_flight: None,
      take_failure_payload: false,
      disposed: false,
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used for `last_updated`.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Show the payload of failed outcomes instead of keeping earlier data.
  pub fn with_failure_payload(mut self) -> Self {
    self.take_failure_payload = true;
    self
  }

  /// Start a request for `input`, cancelling the one in flight.
  ///
  /// No-op once disposed.
  pub fn start<Fut>(&mut self, input: impl Into<String>, request: Fut)
  where
    Fut: Future<Output = RequestOutcome<T>> + Send + 'static,
  {
    if self.disposed {
      return;
    }

    let (resting, resting_error, resting_error_kind) = match self.in_flight.take() {
      Some(previous) => {
        previous.token.abort();
        (previous.resting, previous.resting_error, previous.resting_error_kind)
      }
      None => (self.state, self.error.take(), self.error_kind.take()),
    };

    let (token, registration) = AbortHandle::new_pair();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
      if let Ok(outcome) = Abortable::new(request, registration).await {
        // Receiver may have been dropped
        let _ = tx.send(outcome);
      }
    });

    self.in_flight = Some(InFlight {
      token,
      receiver: rx,
      input: input.into(),
      resting,
      resting_error,
      resting_error_kind,
    });
    self.state = LoadState::Loading;
    self.error = None;
    self.error_kind = None;
  }

  /// Apply a finished request, if any.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let in_flight = match &mut self.in_flight {
      Some(in_flight) => in_flight,
      None => return false,
    };

    let result = match in_flight.receiver.try_recv() {
      Err(oneshot::error::TryRecvError::Empty) => return false,
      Ok(outcome) => Ok(outcome),
      Err(oneshot::error::TryRecvError::Closed) => Err(()),
    };

    self.finish(result);
    true
  }

  /// Wait for the in-flight request and apply it.
  ///
  /// Returns `false` immediately when nothing is in flight.
  pub async fn changed(&mut self) -> bool {
    let in_flight = match &mut self.in_flight {
      Some(in_flight) => in_flight,
      None => return false,
    };

    let result = (&mut in_flight.receiver).await.map_err(|_| ());
    self.finish(result);
    true
  }

  fn finish(&mut self, result: Result<RequestOutcome<T>, ()>) {
    let input = match self.in_flight.take() {
      Some(in_flight) => in_flight.input,
      None => return,
    };

    match result {
      Ok(outcome) => self.apply(input, outcome),
      // The task ended without reporting back (panicked)
      Err(()) => {
        self.state = LoadState::Error;
        self.error = Some("Request was interrupted".to_string());
      }
    }
  }

  fn apply(&mut self, input: String, outcome: RequestOutcome<T>) {
    match outcome {
      RequestOutcome::Success { data, from_cache } => {
        self.state = LoadState::Success;
        self.data = data;
        self.data_input = Some(input);
        self.from_cache = from_cache;
        self.last_updated = Some(self.clock.now());
      }
      RequestOutcome::StaleFallback { data, reason } => {
        self.state = LoadState::Stale;
        self.data = data;
        self.data_input = Some(input);
        self.error = Some(reason);
        self.from_cache = true;
      }
      RequestOutcome::Failure { data, reason, kind } => {
        if self.take_failure_payload || self.data_input.as_deref() != Some(input.as_str()) {
          self.data = data;
          self.data_input = Some(input);
        }
        self.state = LoadState::Error;
        self.error = Some(reason);
        self.error_kind = Some(kind);
        self.from_cache = false;
      }
    }
  }

  /// Abort the in-flight request; its result will never be applied.
  pub fn cancel(&mut self) {
    if let Some(in_flight) = self.in_flight.take() {
      debug!(input = %in_flight.input, "cancelling request");
      in_flight.token.abort();
      self.state = in_flight.resting;
      self.error = in_flight.resting_error;
      self.error_kind = in_flight.resting_error_kind;
    }
  }

  /// Cancel and return to `Idle` with empty data.
  pub fn reset(&mut self) {
    self.cancel();
    self.state = LoadState::Idle;
    self.data = T::default();
    self.data_input = None;
    self.error = None;
    self.error_kind = None;
    self.from_cache = false;
  }

  /// Cancel and stop accepting requests.
  pub fn dispose(&mut self) {
    self.cancel();
    self.disposed = true;
  }
}

impl<T: Default + Send + 'static> Default for DataView<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> DataView<T> {
  pub fn state(&self) -> LoadState {
    self.state
  }

  /// Current data; the default value until something loads.
  pub fn data(&self) -> &T {
    &self.data
  }

  /// Failure message in `Error` and `Stale`.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn error_kind(&self) -> Option<ErrorKind> {
    self.error_kind
  }

  pub fn from_cache(&self) -> bool {
    self.from_cache
  }

  /// When the last successful request finished.
  pub fn last_updated(&self) -> Option<DateTime<Utc>> {
    self.last_updated
  }

  pub fn is_idle(&self) -> bool {
    self.state == LoadState::Idle
  }

  pub fn is_loading(&self) -> bool {
    self.state == LoadState::Loading
  }

  pub fn is_success(&self) -> bool {
    self.state == LoadState::Success
  }

  pub fn is_error(&self) -> bool {
    self.state == LoadState::Error
  }

  pub fn is_stale(&self) -> bool {
    self.state == LoadState::Stale
  }

  pub fn is_disposed(&self) -> bool {
    self.disposed
  }
}

impl<T> Drop for DataView<T> {
  fn drop(&mut self) {
    if let Some(in_flight) = self.in_flight.take() {
      in_flight.token.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DataView<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DataView")
      .field("state", &self.state)
      .field("data", &self.data)
      .field("error", &self.error)
      .field("from_cache", &self.from_cache)
      .field("last_updated", &self.last_updated)
      .finish_non_exhaustive()
  }
}
