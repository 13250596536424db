//! Request signer.
//!
//! [`HmacBuilder`] has two stages. While [`Unsigned`], the credential and
//! the list of headers to sign are set; [`sign`](HmacBuilder::sign) then
//! reads the request, computes the signature and moves to [`Signed`], the
//! only stage that can build a header.

use std::fmt;

use reqauth_core::builder::{AuthorizationHeaderBuilder, HeaderFields, Relation};
use reqauth_core::config::HmacConfig;
use reqauth_core::{AlgorithmRegistry, AuthRequest, BuildError, ConfigError, HashAlgorithm};
use tracing::debug;

use crate::canonical::canonical_request_for;
use crate::header::HmacHeader;
use crate::signing::{
    build_string_to_sign, compute_signature, derive_date_key, format_timestamp, parse_timestamp,
};

const CLIENT_ID: &str = "client_id";
const CREDENTIAL_SCOPE: &str = "credential_scope";
const SIGNED_HEADERS: &str = "signed_headers";
const SIGNATURE: &str = "signature";

/// Signing needs the credential.
pub const SIGN: Relation = Relation::new("sign", &[CLIENT_ID, CREDENTIAL_SCOPE]);
/// Fields every built header carries.
pub const BUILD: Relation = Relation::new(
    "build",
    &[CLIENT_ID, CREDENTIAL_SCOPE, SIGNED_HEADERS, SIGNATURE],
);

/// Headers signed when none are chosen.
pub const DEFAULT_SIGNED_HEADERS: [&str; 2] = ["host", "date"];

/// Credential and header list are being collected.
#[derive(Debug, Clone, Copy)]
pub struct Unsigned;

/// The signature is computed.
#[derive(Debug, Clone)]
pub struct Signed {
    canonical_request: String,
    string_to_sign: String,
}

/// Signs requests and builds [`HmacHeader`]s.
///
/// # Examples
///
/// ```
/// use reqauth_core::{AuthRequest, AuthorizationHeaderBuilder, HashAlgorithm};
/// use reqauth_hmac::HmacBuilder;
///
/// let (parts, ()) = http::Request::builder()
///     .uri("/orders")
///     .header("host", "api.example.com")
///     .header("date", "20261018T120000Z")
///     .body(())?
///     .into_parts();
///
/// let header = HmacBuilder::new("HMAC-SHA256", HashAlgorithm::SHA256)
///     .client_id("client-1")
///     .credential_scope("20261018/orders")
///     .sign("secret", &AuthRequest::new(&parts, b""))?
///     .build()?;
///
/// assert_eq!(header.signed_headers(), ["host", "date"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct HmacBuilder<S> {
    scheme: String,
    algorithm: HashAlgorithm,
    timestamp_header: String,
    signed_headers: Vec<String>,
    fields: HeaderFields,
    stage: S,
}

impl<S: fmt::Debug> fmt::Debug for HmacBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacBuilder")
            .field("scheme", &self.scheme)
            .field("algorithm", &self.algorithm)
            .field("timestamp_header", &self.timestamp_header)
            .field("signed_headers", &self.signed_headers)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl HmacBuilder<Unsigned> {
    /// Start a signer for `scheme` hashing with `algorithm`.
    ///
    /// Signs `host` and `date` and reads the timestamp from `date` unless
    /// told otherwise.
    #[must_use]
    pub fn new(scheme: impl Into<String>, algorithm: HashAlgorithm) -> Self {
        Self {
            scheme: scheme.into(),
            algorithm,
            timestamp_header: "date".to_owned(),
            signed_headers: DEFAULT_SIGNED_HEADERS.iter().map(|h| (*h).to_owned()).collect(),
            fields: HeaderFields::new(),
            stage: Unsigned,
        }
    }

    /// Start a signer from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] if the configured
    /// algorithm is not registered.
    pub fn from_config(config: &HmacConfig) -> Result<Self, ConfigError> {
        let algorithm = AlgorithmRegistry::default()
            .resolve(&config.algorithm)
            .ok_or_else(|| ConfigError::UnsupportedAlgorithm(config.algorithm.clone()))?;
        Ok(Self::new(config.scheme.clone(), algorithm)
            .timestamp_header(config.timestamp_header.clone())
            .signed_headers(config.default_signed_headers.iter().cloned()))
    }

    /// Set the client identifier.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.fields.set(CLIENT_ID, client_id);
        self
    }

    /// Set the credential scope.
    #[must_use]
    pub fn credential_scope(mut self, scope: impl Into<String>) -> Self {
        self.fields.set(CREDENTIAL_SCOPE, scope);
        self
    }

    /// Choose the headers to sign, in order. Names are lower-cased.
    #[must_use]
    pub fn signed_headers<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.signed_headers = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Read the signing timestamp from `name`.
    #[must_use]
    pub fn timestamp_header(mut self, name: impl Into<String>) -> Self {
        self.timestamp_header = name.into().to_ascii_lowercase();
        self
    }

    /// Sign `request` with `secret`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingField`] if the client id or scope is unset.
    /// - [`BuildError::EmptySignedHeaders`] if no header is to be signed.
    /// - [`BuildError::MissingRequestHeader`] if the timestamp header or a
    ///   signed header is absent from the request.
    /// - [`BuildError::InvalidTimestamp`] if the timestamp cannot be parsed.
    pub fn sign(
        mut self,
        secret: &str,
        request: &AuthRequest<'_>,
    ) -> Result<HmacBuilder<Signed>, BuildError> {
        self.fields.require(&SIGN)?;
        if self.signed_headers.is_empty() || self.signed_headers.iter().any(String::is_empty) {
            return Err(BuildError::EmptySignedHeaders);
        }

        let raw_timestamp = request
            .header(&self.timestamp_header)
            .ok_or_else(|| BuildError::MissingRequestHeader(self.timestamp_header.clone()))?;
        let timestamp = parse_timestamp(raw_timestamp)
            .ok_or_else(|| BuildError::InvalidTimestamp(raw_timestamp.to_owned()))?;

        let canonical_request =
            canonical_request_for(request, &self.signed_headers, self.algorithm)?;
        debug!(canonical_request, "Built canonical request");

        let string_to_sign = build_string_to_sign(
            &self.scheme,
            &format_timestamp(&timestamp),
            self.fields.value(CREDENTIAL_SCOPE),
            &self.algorithm.hash_hex(canonical_request.as_bytes()),
        );
        debug!(string_to_sign, "Built string to sign");

        let date_key = derive_date_key(self.algorithm, secret, &timestamp);
        let signature = compute_signature(self.algorithm, &date_key, &string_to_sign);

        self.fields.set(SIGNED_HEADERS, self.signed_headers.join(";"));
        self.fields.set(SIGNATURE, signature);
        Ok(HmacBuilder {
            scheme: self.scheme,
            algorithm: self.algorithm,
            timestamp_header: self.timestamp_header,
            signed_headers: self.signed_headers,
            fields: self.fields,
            stage: Signed {
                canonical_request,
                string_to_sign,
            },
        })
    }
}

impl HmacBuilder<Signed> {
    /// The hex-encoded signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        self.fields.value(SIGNATURE)
    }

    /// The canonical request that was signed.
    #[must_use]
    pub fn canonical_request(&self) -> &str {
        &self.stage.canonical_request
    }

    /// The string that was signed.
    #[must_use]
    pub fn string_to_sign(&self) -> &str {
        &self.stage.string_to_sign
    }
}

impl AuthorizationHeaderBuilder for HmacBuilder<Signed> {
    type Header = HmacHeader;

    const BUILD: Relation = BUILD;

    fn fields(&self) -> &HeaderFields {
        &self.fields
    }

    fn assemble(self) -> HmacHeader {
        HmacHeader {
            scheme: self.scheme,
            client_id: self.fields.value(CLIENT_ID).to_owned(),
            credential_scope: self.fields.value(CREDENTIAL_SCOPE).to_owned(),
            signed_headers: self.signed_headers,
            signature: self.fields.value(SIGNATURE).to_owned(),
        }
    }
}
