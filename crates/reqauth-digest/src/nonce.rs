//! Server nonces.
//!
//! A nonce encodes its own issue time and a keyed hash over it:
//!
//! ```text
//! nonce = base64("{timestamp}:{hex(H("{micros}:{etag}:{base64(secret)}"))}")
//! ```
//!
//! `timestamp` is RFC 3339 UTC with microsecond precision and `micros` is the
//! same instant as microseconds since the Unix epoch. Validation recomputes
//! the hash, so a nonce that was not issued with this server's secret fails
//! even if its timestamp is well formed.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use reqauth_core::HashAlgorithm;
use subtle::ConstantTimeEq;

/// Why a nonce was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
    /// Not a nonce issued by this server.
    #[error("nonce is malformed or was not issued by this server")]
    Malformed,
    /// Issued by this server but older than the nonce lifetime.
    #[error("nonce has expired")]
    Expired,
}

/// Issues and validates nonces.
#[derive(Clone)]
pub struct NonceIssuer {
    algorithm: HashAlgorithm,
    secret: String,
    etag: String,
    ttl: Duration,
}

impl std::fmt::Debug for NonceIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceIssuer")
            .field("algorithm", &self.algorithm)
            .field("etag", &self.etag)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl NonceIssuer {
    /// Create an issuer. `secret` and `etag` are mixed into every nonce.
    #[must_use]
    pub fn new(
        algorithm: HashAlgorithm,
        secret: impl Into<String>,
        etag: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            algorithm,
            secret: secret.into(),
            etag: etag.into(),
            ttl,
        }
    }

    /// Nonce lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a nonce stamped with the current time.
    #[must_use]
    pub fn issue(&self) -> String {
        self.issue_at(Utc::now())
    }

    /// Issue a nonce stamped with `timestamp`.
    #[must_use]
    pub fn issue_at(&self, timestamp: DateTime<Utc>) -> String {
        let formatted = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        STANDARD.encode(format!("{formatted}:{}", self.keyed_hash(&timestamp)))
    }

    /// Check a nonce against the current time.
    ///
    /// # Errors
    ///
    /// See [`validate_at`](Self::validate_at).
    pub fn validate(&self, nonce: &str) -> Result<DateTime<Utc>, NonceError> {
        self.validate_at(nonce, Utc::now())
    }

    /// Check a nonce against `now` and return its issue time.
    ///
    /// # Errors
    ///
    /// Returns [`NonceError::Malformed`] if the nonce does not decode, its
    /// timestamp is not in canonical form, or its hash does not match, and
    /// [`NonceError::Expired`] if it is older than the lifetime.
    pub fn validate_at(
        &self,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, NonceError> {
        let decoded = STANDARD.decode(nonce).map_err(|_| NonceError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| NonceError::Malformed)?;
        let (formatted, hash) = decoded.rsplit_once(':').ok_or(NonceError::Malformed)?;

        let issued = DateTime::parse_from_rfc3339(formatted)
            .map_err(|_| NonceError::Malformed)?
            .with_timezone(&Utc);
        // Only the exact spelling we emit is accepted.
        if issued.to_rfc3339_opts(SecondsFormat::Micros, true) != formatted {
            return Err(NonceError::Malformed);
        }

        let expected = self.keyed_hash(&issued);
        if !bool::from(expected.as_bytes().ct_eq(hash.as_bytes())) {
            return Err(NonceError::Malformed);
        }

        let age = now.signed_duration_since(issued);
        match age.to_std() {
            Ok(age) if age > self.ttl => Err(NonceError::Expired),
            _ => Ok(issued),
        }
    }

    fn keyed_hash(&self, timestamp: &DateTime<Utc>) -> String {
        let input = format!(
            "{}:{}:{}",
            timestamp.timestamp_micros(),
            self.etag,
            STANDARD.encode(&self.secret)
        );
        self.algorithm.hash_hex(input.as_bytes())
    }
}
