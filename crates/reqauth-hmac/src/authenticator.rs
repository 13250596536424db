//! Server-side Hmac verification.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqauth_core::config::HmacConfig;
use reqauth_core::{
    AlgorithmRegistry, AuthError, AuthRequest, AuthScheme, AuthorizationHeader, BuildError,
    ConfigError, HashAlgorithm, ParseOptions, Principal, SecretResolver,
    UNKNOWN_IDENTITY_SECRET, Verification,
};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::builder::HmacBuilder;
use crate::header::HmacHeader;
use crate::signing::parse_timestamp;

/// Verifies Hmac-signed requests.
///
/// A request is accepted when its timestamp header is signed, lies within
/// the allowed clock skew, and the signature recomputed with the client's
/// secret matches the one presented.
pub struct HmacAuthenticator {
    scheme: String,
    algorithm: HashAlgorithm,
    timestamp_header: String,
    max_skew: Duration,
    resolver: Arc<dyn SecretResolver>,
    options: ParseOptions,
}

impl fmt::Debug for HmacAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacAuthenticator")
            .field("scheme", &self.scheme)
            .field("algorithm", &self.algorithm)
            .field("timestamp_header", &self.timestamp_header)
            .field("max_skew", &self.max_skew)
            .finish_non_exhaustive()
    }
}

impl HmacAuthenticator {
    /// Create an authenticator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] if the configured
    /// algorithm is not registered.
    pub fn new(
        config: &HmacConfig,
        resolver: Arc<dyn SecretResolver>,
    ) -> Result<Self, ConfigError> {
        let algorithm = AlgorithmRegistry::default()
            .resolve(&config.algorithm)
            .ok_or_else(|| ConfigError::UnsupportedAlgorithm(config.algorithm.clone()))?;
        Ok(Self {
            scheme: config.scheme.clone(),
            algorithm,
            timestamp_header: config.timestamp_header.to_ascii_lowercase(),
            max_skew: config.max_clock_skew(),
            resolver,
            options: ParseOptions::default(),
        })
    }

    /// Use `options` when parsing credential headers.
    #[must_use]
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.set_parse_options(options);
        self
    }

    /// The hash algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Verify `header` against `request` as of `now`.
    #[must_use]
    pub fn verify_at(
        &self,
        header: &HmacHeader,
        request: &AuthRequest<'_>,
        now: DateTime<Utc>,
    ) -> Verification {
        debug!(
            client_id = header.client_id(),
            scope = header.credential_scope(),
            signed_headers = %header.signed_headers().join(";"),
            "Verifying Hmac signature"
        );

        if !header.signed_headers().contains(&self.timestamp_header) {
            debug!(timestamp_header = %self.timestamp_header, "Timestamp header is not signed");
            return rejected(AuthError::InvalidAuthHeader);
        }

        let Some(timestamp) = request.header(&self.timestamp_header).and_then(parse_timestamp)
        else {
            return rejected(AuthError::MissingHeader(self.timestamp_header.clone()));
        };
        let skew = now.signed_duration_since(timestamp).abs();
        if !skew.to_std().is_ok_and(|skew| skew <= self.max_skew) {
            debug!(%timestamp, %now, "Request timestamp outside allowed skew");
            return rejected(AuthError::RequestExpired);
        }

        let resolved = self.resolver.resolve_secret(header.client_id());
        let known = resolved.is_some();
        let secret = resolved.unwrap_or_else(|| UNKNOWN_IDENTITY_SECRET.to_owned());

        let signed = HmacBuilder::new(self.scheme.clone(), self.algorithm)
            .client_id(header.client_id())
            .credential_scope(header.credential_scope())
            .signed_headers(header.signed_headers())
            .timestamp_header(self.timestamp_header.clone())
            .sign(&secret, request);
        let expected = match signed {
            Ok(signed) => signed,
            Err(BuildError::MissingRequestHeader(name)) => {
                return rejected(AuthError::MissingHeader(name));
            }
            Err(error) => {
                debug!(%error, "Could not rebuild Hmac signature");
                return rejected(AuthError::InvalidAuthHeader);
            }
        };

        let presented = header.signature().to_ascii_lowercase();
        let matches = bool::from(expected.signature().as_bytes().ct_eq(presented.as_bytes()));
        if !known {
            debug!(client_id = header.client_id(), "Unknown Hmac client");
            return rejected(AuthError::SignatureDoesNotMatch);
        }
        if !matches {
            debug!(
                canonical_request = expected.canonical_request(),
                "Hmac signature mismatch"
            );
            return rejected(AuthError::SignatureDoesNotMatch);
        }

        info!(client_id = header.client_id(), "Hmac authentication succeeded");
        Verification::Authenticated(Principal::new(header.client_id(), self.scheme.clone()))
    }
}

fn rejected(error: AuthError) -> Verification {
    warn!(%error, "Hmac credentials rejected");
    Verification::Rejected(error)
}

#[async_trait]
impl AuthScheme for HmacAuthenticator {
    type Header = HmacHeader;

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn parse(&self, raw: &str) -> Option<HmacHeader> {
        HmacHeader::parse(raw, &self.scheme, &self.options)
    }

    fn set_parse_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    async fn verify(&self, header: HmacHeader, request: &AuthRequest<'_>) -> Verification {
        self.verify_at(&header, request, Utc::now())
    }

    fn challenge(&self, _stale: bool) -> String {
        self.scheme.clone()
    }
}
