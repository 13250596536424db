//! Error types shared by the reqauth crates.
//!
//! Three error classes are kept apart on purpose:
//!
//! - [`AuthError`]: the request could not be authenticated. These are ordinary
//!   outcomes that end in a challenge or a rejection response.
//! - [`BuildError`]: a header builder was driven without the data one of its
//!   stages requires. These are programming or configuration mistakes.
//! - [`ConfigError`]: the configuration could not be loaded or names an
//!   unsupported algorithm.

/// Errors that cause a request to fail authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed for the expected scheme.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The hash algorithm named by the client is unknown or not the one this
    /// server is configured for.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The realm in the credentials does not match the protection space.
    #[error("Realm does not match")]
    RealmMismatch,

    /// The opaque value was not returned unchanged.
    #[error("Opaque value does not match")]
    OpaqueMismatch,

    /// The digest `uri` field does not match the request target.
    #[error("Digest uri does not match the request target")]
    UriMismatch,

    /// The nonce was not issued by this server or has been tampered with.
    #[error("Invalid nonce")]
    InvalidNonce,

    /// The nonce was issued by this server but is older than its lifetime.
    #[error("Nonce is stale")]
    StaleNonce,

    /// The nonce count was already used with this nonce.
    #[error("Nonce count was already used")]
    NonceReplayed,

    /// A header listed in `SignedHeaders` is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The request timestamp lies outside the accepted clock-skew window.
    #[error("Request has expired")]
    RequestExpired,

    /// The computed signature or digest response does not match the one provided.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The request did not arrive over a secure transport.
    #[error("Secure transport is required")]
    InsecureTransport,

    /// The request body exceeds the configured buffering limit.
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// The request body could not be read.
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// The request body was not received before the read deadline.
    #[error("Timed out reading request body")]
    BodyTimeout,

    /// The nonce store could not be consulted.
    #[error("Nonce store unavailable: {0}")]
    NonceStoreUnavailable(String),
}

/// A header builder stage was invoked without its required inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A field required by `operation` is absent or empty.
    #[error("{operation} requires field `{field}`")]
    MissingField {
        /// The builder operation that was attempted.
        operation: &'static str,
        /// The missing field.
        field: &'static str,
    },

    /// The signed header list is empty.
    #[error("signed header list must not be empty")]
    EmptySignedHeaders,

    /// A header to be signed is not present on the request.
    #[error("request has no `{0}` header to sign")]
    MissingRequestHeader(String),

    /// The signing timestamp could not be parsed.
    #[error("invalid signing timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// The environment variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The configured algorithm is not registered.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Any other configuration problem.
    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Convenience result type for authentication steps.
pub type AuthResult<T> = Result<T, AuthError>;
