//! The Digest `WWW-Authenticate` challenge.

use std::fmt;

use reqauth_core::header::{ParseOptions, parse_credentials};
use reqauth_core::HeaderWriter;

use crate::header::Qop;
use crate::SCHEME;

/// A Digest challenge as sent with a 401 response.
///
/// # Examples
///
/// ```
/// use reqauth_digest::DigestChallenge;
///
/// let challenge = DigestChallenge::new("api", "bm9uY2U=", "xyz", "SHA-256");
/// assert_eq!(
///     challenge.to_string(),
///     r#"Digest realm="api", qop="auth, auth-int", nonce="bm9uY2U=", opaque="xyz", stale="false", algorithm="SHA-256""#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    realm: String,
    qop: Vec<Qop>,
    nonce: String,
    opaque: String,
    stale: bool,
    algorithm: String,
}

impl DigestChallenge {
    /// Create a fresh (non-stale) challenge offering `auth` and `auth-int`.
    #[must_use]
    pub fn new(
        realm: impl Into<String>,
        nonce: impl Into<String>,
        opaque: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            realm: realm.into(),
            qop: vec![Qop::Auth, Qop::AuthInt],
            nonce: nonce.into(),
            opaque: opaque.into(),
            stale: false,
            algorithm: algorithm.into(),
        }
    }

    /// Mark the challenge as answering a stale or replayed nonce.
    #[must_use]
    pub fn with_stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    /// Parse a challenge received from a server.
    ///
    /// `realm` and `nonce` are required. A missing `qop` offers `auth`, a
    /// missing `algorithm` means `MD5`. Unknown `qop` tokens are skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let fields = parse_credentials(raw.trim(), SCHEME, &ParseOptions::default())?;
        let qop = match fields.get("qop") {
            Some(offered) => {
                let qop: Vec<Qop> = offered.split(',').filter_map(|q| q.parse().ok()).collect();
                if qop.is_empty() {
                    return None;
                }
                qop
            }
            None => vec![Qop::Auth],
        };
        Some(Self {
            realm: fields.get_owned("realm")?,
            qop,
            nonce: fields.get_owned("nonce")?,
            opaque: fields.get_owned("opaque").unwrap_or_default(),
            stale: fields
                .get("stale")
                .is_some_and(|stale| stale.eq_ignore_ascii_case("true")),
            algorithm: fields
                .get_owned("algorithm")
                .unwrap_or_else(|| "MD5".to_owned()),
        })
    }

    /// Protection space.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Offered qualities of protection.
    #[must_use]
    pub fn qop(&self) -> &[Qop] {
        &self.qop
    }

    /// Server nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Opaque value the client must echo.
    #[must_use]
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Whether the previous nonce was rejected as stale.
    #[must_use]
    pub fn stale(&self) -> bool {
        self.stale
    }

    /// Hash algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

impl fmt::Display for DigestChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qop = self
            .qop
            .iter()
            .map(|q| q.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let value = HeaderWriter::new(SCHEME)
            .quoted("realm", &self.realm)
            .quoted("qop", &qop)
            .quoted("nonce", &self.nonce)
            .quoted("opaque", &self.opaque)
            .quoted("stale", if self.stale { "true" } else { "false" })
            .quoted("algorithm", &self.algorithm)
            .finish();
        f.write_str(&value)
    }
}
