//! Response body type and bounded request body collection.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use reqauth_core::AuthError;

/// Body of the responses this crate produces itself.
#[derive(Debug, Default)]
pub enum AuthResponseBody {
    /// A buffered JSON payload.
    Buffered(Full<Bytes>),
    /// No body.
    #[default]
    Empty,
}

impl AuthResponseBody {
    /// Create a response body from raw bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty response body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl Body for AuthResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

/// Limits applied while buffering a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    /// Largest body accepted, in bytes.
    pub max_size: usize,
    /// Deadline for receiving the whole body.
    pub read_timeout: Duration,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Buffer `body` in memory, enforcing `limits`.
///
/// # Errors
///
/// - [`AuthError::PayloadTooLarge`] once more than `max_size` bytes arrive.
/// - [`AuthError::BodyTimeout`] if the body is not complete in time.
/// - [`AuthError::BodyRead`] if the underlying body fails.
pub async fn collect_limited<B>(body: B, limits: BodyLimits) -> Result<Bytes, AuthError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limited = Limited::new(body, limits.max_size);
    match tokio::time::timeout(limits.read_timeout, limited.collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(error)) if error.downcast_ref::<LengthLimitError>().is_some() => {
            Err(AuthError::PayloadTooLarge(limits.max_size))
        }
        Ok(Err(error)) => Err(AuthError::BodyRead(error.to_string())),
        Err(_) => Err(AuthError::BodyTimeout),
    }
}
