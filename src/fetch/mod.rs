//! HTTP fetching with timeouts, bounded retry and failure classification.

mod error;
mod retry;
mod transport;

pub use error::{ErrorKind, FetchError};
pub use retry::{RawResponse, RequestSpec, ResilientFetcher, RetryPolicy};
pub use transport::{HttpReply, HttpTransport, Transport, TransportError};
