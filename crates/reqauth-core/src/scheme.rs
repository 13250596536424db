//! The seam between the authentication driver and a concrete scheme.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::header::ParseOptions;
use crate::types::{AuthRequest, Principal};

/// Result of checking parsed credentials against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The credentials are valid for this request.
    Authenticated(Principal),
    /// The credentials were computed correctly but against a nonce that has
    /// expired or whose count was already used. The client should retry with
    /// a fresh challenge without prompting for new credentials.
    Stale(AuthError),
    /// The credentials are invalid.
    Rejected(AuthError),
}

impl Verification {
    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Stale(_) | Self::Rejected(_) => None,
        }
    }
}

/// An authentication scheme: parses its credential header, verifies it, and
/// produces the challenge sent with a 401 response.
#[async_trait]
pub trait AuthScheme: Send + Sync {
    /// The typed credential header.
    type Header: Send;

    /// The scheme token, e.g. `Digest`.
    fn scheme(&self) -> &str;

    /// Parse the raw `Authorization` header value.
    fn parse(&self, raw: &str) -> Option<Self::Header>;

    /// Use `options` when parsing. Schemes whose parser takes no options
    /// ignore them.
    fn set_parse_options(&mut self, _options: ParseOptions) {}

    /// Verify parsed credentials against the request.
    async fn verify(&self, header: Self::Header, request: &AuthRequest<'_>) -> Verification;

    /// The `WWW-Authenticate` value to send. `stale` is set when the previous
    /// credentials failed only because their nonce was stale or replayed.
    fn challenge(&self, stale: bool) -> String;
}
