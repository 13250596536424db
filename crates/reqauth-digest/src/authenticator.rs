//! Server-side Digest verification.
//!
//! Checks run in this order, stopping at the first failure:
//!
//! 1. `realm`, `opaque` and `algorithm` match this server's configuration.
//! 2. `uri` matches the request target.
//! 3. The nonce was issued by this server (an expired nonce is remembered).
//! 4. The password is resolved and the response digest recomputed. An unknown
//!    user is hashed with a placeholder password and rejected like a wrong one.
//! 5. An expired nonce now yields a stale verdict.
//! 6. The nonce count is recorded in the [`NonceTracker`]; a count that is not
//!    greater than the last accepted one is a replay.
//!
//! The tracker is consulted last so that requests with a wrong response
//! cannot consume nonce counts.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqauth_core::builder::AuthorizationHeaderBuilder;
use reqauth_core::config::DigestConfig;
use reqauth_core::{
    AlgorithmRegistry, AuthError, AuthRequest, AuthScheme, AuthorizationHeader, BuildError,
    ConfigError, HashAlgorithm, ParseOptions, Principal, SecretResolver,
    UNKNOWN_IDENTITY_SECRET, Verification,
};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::builder::DigestBuilder;
use crate::challenge::DigestChallenge;
use crate::header::DigestHeader;
use crate::nonce::{NonceError, NonceIssuer};
use crate::tracker::NonceTracker;
use crate::SCHEME;

/// Verifies Digest credentials and issues challenges.
pub struct DigestAuthenticator {
    realm: String,
    opaque: String,
    algorithm: HashAlgorithm,
    issuer: NonceIssuer,
    tracker: Arc<dyn NonceTracker>,
    resolver: Arc<dyn SecretResolver>,
    options: ParseOptions,
}

impl fmt::Debug for DigestAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAuthenticator")
            .field("realm", &self.realm)
            .field("opaque", &self.opaque)
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl DigestAuthenticator {
    /// Create an authenticator using the default algorithm registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] if the configured
    /// algorithm is not registered, or any error from [`DigestConfig::validate`].
    pub fn new(
        config: &DigestConfig,
        resolver: Arc<dyn SecretResolver>,
        tracker: Arc<dyn NonceTracker>,
    ) -> Result<Self, ConfigError> {
        Self::with_registry(config, &AlgorithmRegistry::default(), resolver, tracker)
    }

    /// Create an authenticator resolving the algorithm in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] if the configured
    /// algorithm is not registered, or any error from [`DigestConfig::validate`].
    pub fn with_registry(
        config: &DigestConfig,
        registry: &AlgorithmRegistry,
        resolver: Arc<dyn SecretResolver>,
        tracker: Arc<dyn NonceTracker>,
    ) -> Result<Self, ConfigError> {
        let algorithm = registry
            .resolve(&config.algorithm)
            .ok_or_else(|| ConfigError::UnsupportedAlgorithm(config.algorithm.clone()))?;
        config.validate()?;
        Ok(Self {
            realm: config.realm.clone(),
            opaque: config.opaque.clone(),
            algorithm,
            issuer: NonceIssuer::new(
                algorithm,
                config.nonce_secret.clone(),
                config.etag.clone(),
                config.nonce_ttl(),
            ),
            tracker,
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

    /// The nonce issuer.
    #[must_use]
    pub fn issuer(&self) -> &NonceIssuer {
        &self.issuer
    }

    /// Build a challenge carrying a freshly issued nonce.
    #[must_use]
    pub fn issue_challenge(&self, stale: bool) -> DigestChallenge {
        DigestChallenge::new(
            self.realm.clone(),
            self.issuer.issue(),
            self.opaque.clone(),
            self.algorithm.name(),
        )
        .with_stale(stale)
    }

    fn expected_response(
        &self,
        header: &DigestHeader,
        password: &str,
        request: &AuthRequest<'_>,
    ) -> Result<String, BuildError> {
        let mut builder = DigestBuilder::new(self.algorithm)
            .username(header.username())
            .realm(header.realm())
            .compute_ha1(password)?
            .uri(header.uri())
            .qop(header.qop())
            .compute_ha2(request.method(), request.body())?
            .nonce(header.nonce())
            .nc(header.nc())
            .cnonce(header.cnonce());
        if let Some(opaque) = header.opaque() {
            builder = builder.opaque(opaque);
        }
        Ok(builder.compute_response()?.build()?.response().to_owned())
    }

    fn check_parameters(
        &self,
        header: &DigestHeader,
        request: &AuthRequest<'_>,
    ) -> Result<(), AuthError> {
        if header.realm() != self.realm {
            return Err(AuthError::RealmMismatch);
        }
        if header.opaque() != Some(self.opaque.as_str()) {
            return Err(AuthError::OpaqueMismatch);
        }
        if let Some(algorithm) = header.algorithm() {
            if !algorithm.trim().eq_ignore_ascii_case(self.algorithm.name()) {
                return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
            }
        }
        if header.uri() != request.target() {
            return Err(AuthError::UriMismatch);
        }
        Ok(())
    }

    async fn record_nonce_count(&self, header: &DigestHeader) -> Result<bool, AuthError> {
        let count = header.nc().value();
        let unavailable = |e: crate::tracker::TrackerError| {
            warn!(error = %e, "Nonce store failed, denying request");
            AuthError::NonceStoreUnavailable(e.to_string())
        };

        if let Some(last) = self
            .tracker
            .try_get_entry(header.nonce())
            .await
            .map_err(unavailable)?
        {
            if last >= count {
                return Ok(false);
            }
        }
        self.tracker
            .try_add_entry(header.nonce(), count)
            .await
            .map_err(unavailable)
    }
}

fn rejected(error: AuthError) -> Verification {
    warn!(%error, "Digest credentials rejected");
    Verification::Rejected(error)
}

fn stale(error: AuthError) -> Verification {
    warn!(%error, "Digest nonce is stale");
    Verification::Stale(error)
}

#[async_trait]
impl AuthScheme for DigestAuthenticator {
    type Header = DigestHeader;

    fn scheme(&self) -> &str {
        SCHEME
    }

    fn parse(&self, raw: &str) -> Option<DigestHeader> {
        DigestHeader::parse(raw, SCHEME, &self.options)
    }

    fn set_parse_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    async fn verify(&self, header: DigestHeader, request: &AuthRequest<'_>) -> Verification {
        debug!(
            username = header.username(),
            uri = header.uri(),
            qop = %header.qop(),
            nc = %header.nc(),
            "Verifying Digest credentials"
        );

        if let Err(error) = self.check_parameters(&header, request) {
            return rejected(error);
        }

        let expired = match self.issuer.validate(header.nonce()) {
            Ok(_) => false,
            Err(NonceError::Expired) => true,
            Err(NonceError::Malformed) => return rejected(AuthError::InvalidNonce),
        };

        let resolved = self.resolver.resolve_secret(header.username());
        let known = resolved.is_some();
        let password = resolved.unwrap_or_else(|| UNKNOWN_IDENTITY_SECRET.to_owned());

        let expected = match self.expected_response(&header, &password, request) {
            Ok(expected) => expected,
            Err(error) => {
                debug!(%error, "Digest credentials carry an empty field");
                return rejected(AuthError::InvalidAuthHeader);
            }
        };
        let matches = bool::from(expected.as_bytes().ct_eq(header.response().as_bytes()));
        if !known {
            debug!(username = header.username(), "Unknown Digest user");
            return rejected(AuthError::SignatureDoesNotMatch);
        }
        if !matches {
            return rejected(AuthError::SignatureDoesNotMatch);
        }

        if expired {
            return stale(AuthError::StaleNonce);
        }

        match self.record_nonce_count(&header).await {
            Ok(true) => {
                info!(username = header.username(), "Digest authentication succeeded");
                Verification::Authenticated(Principal::new(header.username(), SCHEME))
            }
            Ok(false) => stale(AuthError::NonceReplayed),
            Err(error) => Verification::Rejected(error),
        }
    }

    fn challenge(&self, stale: bool) -> String {
        self.issue_challenge(stale).to_string()
    }
}
