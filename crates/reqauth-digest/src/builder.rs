//! Phased builder for Digest credentials.
//!
//! The hash chain is computed in three stages, each a distinct type:
//!
//! ```text
//! DigestBuilder<Start> --ha1--> DigestBuilder<Ha1> --ha2--> DigestBuilder<Ha2> --response--> DigestBuilder<Responded>
//! ```
//!
//! ```text
//! HA1      = H(username:realm:password)
//! HA2      = H(METHOD:uri)                   qop=auth
//!            H(METHOD:uri:H(entity-body))    qop=auth-int
//! response = H(HA1:nonce:nc:cnonce:qop:HA2)
//! ```
//!
//! Each setter lives on the stage whose hash consumes the field, so a field
//! cannot change after it has been hashed. Only `opaque`, which is echoed but
//! never hashed, can be set at any stage. Each hash step checks its
//! [`Relation`] before running, so a missing input field fails with a
//! [`BuildError`] instead of hashing the empty string.
//!
//! ```compile_fail
//! use reqauth_core::HashAlgorithm;
//! use reqauth_digest::DigestBuilder;
//!
//! let ha1 = DigestBuilder::new(HashAlgorithm::MD5)
//!     .username("Mufasa")
//!     .realm("testrealm@host.com")
//!     .compute_ha1("Circle Of Life")
//!     .unwrap();
//! // `username` was consumed by HA1.
//! let _ = ha1.username("Scar");
//! ```

use reqauth_core::builder::{AuthorizationHeaderBuilder, HeaderFields, Relation};
use reqauth_core::{BuildError, HashAlgorithm};

use crate::header::{DigestHeader, NonceCount, Qop};
use crate::SCHEME;

const USERNAME: &str = "username";
const REALM: &str = "realm";
const NONCE: &str = "nonce";
const URI: &str = "uri";
const QOP: &str = "qop";
const NC: &str = "nc";
const CNONCE: &str = "cnonce";
const RESPONSE: &str = "response";
const OPAQUE: &str = "opaque";

/// `HA1` needs the identity and protection space.
pub const COMPUTE_HA1: Relation = Relation::new("compute_ha1", &[USERNAME, REALM]);
/// `HA2` needs the request target and quality of protection.
pub const COMPUTE_HA2: Relation = Relation::new("compute_ha2", &[URI, QOP]);
/// The response needs the nonce material.
pub const COMPUTE_RESPONSE: Relation =
    Relation::new("compute_response", &[NONCE, NC, CNONCE, QOP]);
/// Fields every built header carries.
pub const BUILD: Relation = Relation::new(
    "build",
    &[REALM, NONCE, USERNAME, QOP, URI, NC, CNONCE, RESPONSE],
);

/// Initial stage: no hash computed yet.
#[derive(Debug, Clone, Copy)]
pub struct Start;

/// `HA1` is known.
#[derive(Debug, Clone)]
pub struct Ha1 {
    ha1: String,
}

/// `HA1` and `HA2` are known.
#[derive(Debug, Clone)]
pub struct Ha2 {
    ha1: String,
    ha2: String,
}

/// The response digest is computed; the header can be built.
#[derive(Debug, Clone, Copy)]
pub struct Responded;

/// Builds Digest credentials for one algorithm.
///
/// # Examples
///
/// ```
/// use reqauth_core::{AuthorizationHeaderBuilder, HashAlgorithm};
/// use reqauth_digest::{DigestBuilder, NonceCount, Qop};
///
/// let header = DigestBuilder::new(HashAlgorithm::MD5)
///     .username("Mufasa")
///     .realm("testrealm@host.com")
///     .compute_ha1("Circle Of Life")?
///     .uri("/dir/index.html")
///     .qop(Qop::Auth)
///     .compute_ha2("GET", b"")?
///     .nonce("dcd98b7102dd2f0e8b11d0f600bfb0c093")
///     .nc(&NonceCount::new(1))
///     .cnonce("0a4f113b")
///     .compute_response()?
///     .build()?;
///
/// assert_eq!(header.response(), "6629fae49393a05397450978507c4ef1");
/// # Ok::<(), reqauth_core::BuildError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DigestBuilder<S> {
    algorithm: HashAlgorithm,
    fields: HeaderFields,
    stage: S,
}

impl DigestBuilder<Start> {
    /// Start building credentials hashed with `algorithm`.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            fields: HeaderFields::new(),
            stage: Start,
        }
    }

    /// Set the user name.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.fields.set(USERNAME, username);
        self
    }

    /// Set the protection space.
    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.fields.set(REALM, realm);
        self
    }

    /// Compute `HA1` from the password.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if `username` or `realm` is unset.
    pub fn compute_ha1(self, password: &str) -> Result<DigestBuilder<Ha1>, BuildError> {
        self.fields.require(&COMPUTE_HA1)?;
        let input = format!(
            "{}:{}:{password}",
            self.fields.value(USERNAME),
            self.fields.value(REALM)
        );
        let ha1 = self.algorithm.hash_hex(input.as_bytes());
        Ok(self.advance(Ha1 { ha1 }))
    }

    /// Use a stored `HA1` instead of a password.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if `username` or `realm` is unset.
    pub fn with_ha1(self, ha1: impl Into<String>) -> Result<DigestBuilder<Ha1>, BuildError> {
        self.fields.require(&COMPUTE_HA1)?;
        let ha1 = ha1.into();
        Ok(self.advance(Ha1 { ha1 }))
    }
}

impl DigestBuilder<Ha1> {
    /// Set the request target.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.fields.set(URI, uri);
        self
    }

    /// Set the quality of protection.
    #[must_use]
    pub fn qop(mut self, qop: Qop) -> Self {
        self.fields.set(QOP, qop.as_str());
        self
    }

    /// Compute `HA2`. The method is upper-cased; `body` is hashed only for
    /// `auth-int`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if `uri` or `qop` is unset.
    pub fn compute_ha2(self, method: &str, body: &[u8]) -> Result<DigestBuilder<Ha2>, BuildError> {
        self.fields.require(&COMPUTE_HA2)?;
        let method = method.to_ascii_uppercase();
        let uri = self.fields.value(URI);
        let input = if self.fields.value(QOP) == Qop::AuthInt.as_str() {
            format!("{method}:{uri}:{}", self.algorithm.hash_hex(body))
        } else {
            format!("{method}:{uri}")
        };
        let ha2 = self.algorithm.hash_hex(input.as_bytes());
        let ha1 = self.stage.ha1.clone();
        Ok(self.advance(Ha2 { ha1, ha2 }))
    }
}

impl DigestBuilder<Ha2> {
    /// Set the server nonce.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.fields.set(NONCE, nonce);
        self
    }

    /// Set the nonce count, keeping its spelling.
    #[must_use]
    pub fn nc(mut self, nc: &NonceCount) -> Self {
        self.fields.set(NC, nc.as_str());
        self
    }

    /// Set the client nonce.
    #[must_use]
    pub fn cnonce(mut self, cnonce: impl Into<String>) -> Self {
        self.fields.set(CNONCE, cnonce);
        self
    }

    /// Compute the response digest.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if `nonce`, `nc`, `cnonce` or
    /// `qop` is unset.
    pub fn compute_response(mut self) -> Result<DigestBuilder<Responded>, BuildError> {
        self.fields.require(&COMPUTE_RESPONSE)?;
        let input = format!(
            "{}:{}:{}:{}:{}:{}",
            self.stage.ha1,
            self.fields.value(NONCE),
            self.fields.value(NC),
            self.fields.value(CNONCE),
            self.fields.value(QOP),
            self.stage.ha2,
        );
        let response = self.algorithm.hash_hex(input.as_bytes());
        self.fields.set(RESPONSE, response);
        Ok(self.advance(Responded))
    }
}

impl DigestBuilder<Responded> {
    /// The computed response digest.
    #[must_use]
    pub fn response(&self) -> &str {
        self.fields.value(RESPONSE)
    }
}

impl<S> DigestBuilder<S> {
    /// Set the opaque value to echo.
    #[must_use]
    pub fn opaque(mut self, opaque: impl Into<String>) -> Self {
        self.fields.set(OPAQUE, opaque);
        self
    }

    /// The hash algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn advance<T>(self, stage: T) -> DigestBuilder<T> {
        DigestBuilder {
            algorithm: self.algorithm,
            fields: self.fields,
            stage,
        }
    }
}

impl AuthorizationHeaderBuilder for DigestBuilder<Responded> {
    type Header = DigestHeader;

    const BUILD: Relation = BUILD;

    fn fields(&self) -> &HeaderFields {
        &self.fields
    }

    fn assemble(self) -> DigestHeader {
        let fields = self.fields;
        let owned = |name: &str| fields.value(name).to_owned();
        DigestHeader {
            scheme: SCHEME.to_owned(),
            username: owned(USERNAME),
            realm: owned(REALM),
            nonce: owned(NONCE),
            uri: owned(URI),
            qop: if fields.value(QOP) == Qop::AuthInt.as_str() {
                Qop::AuthInt
            } else {
                Qop::Auth
            },
            nc: NonceCount::parse(fields.value(NC)).unwrap_or_else(|| NonceCount::new(0)),
            cnonce: owned(CNONCE),
            response: owned(RESPONSE),
            opaque: fields.get(OPAQUE).filter(|o| !o.is_empty()).map(ToOwned::to_owned),
            algorithm: Some(self.algorithm.name().to_owned()),
        }
    }
}
