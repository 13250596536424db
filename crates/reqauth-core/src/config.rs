//! Configuration for the authentication schemes and the driver.
//!
//! All configuration can be driven by environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AUTH_REQUIRE_SECURE_TRANSPORT` | `true` |
//! | `AUTH_TRUST_FORWARDED_PROTO` | `false` |
//! | `AUTH_MAX_BODY_SIZE` | `10485760` |
//! | `AUTH_BODY_READ_TIMEOUT_MS` | `30000` |
//! | `AUTH_CREDENTIAL_DELIMITER` | `", "` |
//! | `DIGEST_REALM` | `reqauth` |
//! | `DIGEST_ALGORITHM` | `SHA-256` |
//! | `DIGEST_NONCE_TTL_SECS` | `30` |
//! | `DIGEST_TRACKER_TTL_SECS` | `300` |
//! | `DIGEST_NONCE_SECRET` | random per process |
//! | `DIGEST_ETAG` | `reqauth` |
//! | `DIGEST_OPAQUE` | random per process |
//! | `HMAC_SCHEME` | `HMAC-SHA256` |
//! | `HMAC_ALGORITHM` | `SHA-256` |
//! | `HMAC_TIMESTAMP_HEADER` | `date` |
//! | `HMAC_MAX_CLOCK_SKEW_SECS` | `300` |
//! | `HMAC_DEFAULT_SIGNED_HEADERS` | `host;date` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::algorithm::AlgorithmRegistry;
use crate::error::ConfigError;
use crate::header::{DEFAULT_DELIMITER, ParseOptions};

/// Global authentication configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Reject requests that did not arrive over a secure transport.
    pub require_secure_transport: bool,
    /// Honour `X-Forwarded-Proto` when deciding whether transport is secure.
    pub trust_forwarded_proto: bool,
    /// Largest request body buffered for hashing, in bytes.
    pub max_body_size: usize,
    /// Deadline for receiving the request body, in milliseconds.
    pub body_read_timeout_ms: u64,
    /// Delimiter between credential fields.
    pub credential_delimiter: String,
    /// Digest scheme settings.
    pub digest: DigestConfig,
    /// Hmac scheme settings.
    pub hmac: HmacConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_secure_transport: true,
            trust_forwarded_proto: false,
            max_body_size: 10 * 1024 * 1024,
            body_read_timeout_ms: 30_000,
            credential_delimiter: DEFAULT_DELIMITER.to_owned(),
            digest: DigestConfig::default(),
            hmac: HmacConfig::default(),
        }
    }
}

/// Digest scheme settings.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DigestConfig {
    /// Protection space advertised in challenges.
    pub realm: String,
    /// Hash algorithm name.
    pub algorithm: String,
    /// Nonce lifetime in seconds.
    pub nonce_ttl_secs: u64,
    /// How long the nonce tracker remembers a nonce, in seconds.
    pub tracker_ttl_secs: u64,
    /// Server secret mixed into nonces.
    pub nonce_secret: String,
    /// Entity tag mixed into nonces.
    pub etag: String,
    /// Opaque value the client must return unchanged.
    pub opaque: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            realm: "reqauth".to_owned(),
            algorithm: "SHA-256".to_owned(),
            nonce_ttl_secs: 30,
            tracker_ttl_secs: 300,
            nonce_secret: random_token(),
            etag: "reqauth".to_owned(),
            opaque: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl DigestConfig {
    /// Nonce lifetime.
    #[must_use]
    pub fn nonce_ttl(&self) -> Duration {
        Duration::from_secs(self.nonce_ttl_secs)
    }

    /// Nonce tracker retention.
    #[must_use]
    pub fn tracker_ttl(&self) -> Duration {
        Duration::from_secs(self.tracker_ttl_secs)
    }

    /// Check the Digest settings.
    ///
    /// The tracker must remember a nonce for at least as long as the nonce
    /// is fresh, otherwise a forgotten nonce count could be accepted again.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.realm.is_empty() {
            return Err(ConfigError::Invalid("digest realm must not be empty".to_owned()));
        }
        if self.nonce_secret.is_empty() {
            return Err(ConfigError::Invalid("digest nonce secret must not be empty".to_owned()));
        }
        if self.tracker_ttl_secs < self.nonce_ttl_secs {
            return Err(ConfigError::Invalid(format!(
                "digest tracker ttl ({}s) must not be shorter than the nonce ttl ({}s)",
                self.tracker_ttl_secs, self.nonce_ttl_secs
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for DigestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestConfig")
            .field("realm", &self.realm)
            .field("algorithm", &self.algorithm)
            .field("nonce_ttl_secs", &self.nonce_ttl_secs)
            .field("tracker_ttl_secs", &self.tracker_ttl_secs)
            .field("nonce_secret", &"<redacted>")
            .field("etag", &self.etag)
            .field("opaque", &self.opaque)
            .finish()
    }
}

/// Hmac scheme settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HmacConfig {
    /// Scheme token in the `Authorization` header and first line of the string to sign.
    pub scheme: String,
    /// Hash algorithm name.
    pub algorithm: String,
    /// Header carrying the signing timestamp.
    pub timestamp_header: String,
    /// Largest accepted difference between the signing timestamp and now, in seconds.
    pub max_clock_skew_secs: u64,
    /// Headers signed when the caller does not choose any.
    pub default_signed_headers: Vec<String>,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            scheme: "HMAC-SHA256".to_owned(),
            algorithm: "SHA-256".to_owned(),
            timestamp_header: "date".to_owned(),
            max_clock_skew_secs: 300,
            default_signed_headers: vec!["host".to_owned(), "date".to_owned()],
        }
    }
}

impl HmacConfig {
    /// Accepted clock skew.
    #[must_use]
    pub fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew_secs)
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values, or any
    /// error reported by [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "AUTH_REQUIRE_SECURE_TRANSPORT", parse_bool)? {
            config.require_secure_transport = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTH_TRUST_FORWARDED_PROTO", parse_bool)? {
            config.trust_forwarded_proto = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTH_MAX_BODY_SIZE", parse_number)? {
            config.max_body_size = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTH_BODY_READ_TIMEOUT_MS", parse_number)? {
            config.body_read_timeout_ms = v;
        }
        if let Some(v) = lookup("AUTH_CREDENTIAL_DELIMITER") {
            config.credential_delimiter = v;
        }

        if let Some(v) = lookup("DIGEST_REALM") {
            config.digest.realm = v;
        }
        if let Some(v) = lookup("DIGEST_ALGORITHM") {
            config.digest.algorithm = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_NONCE_TTL_SECS", parse_number)? {
            config.digest.nonce_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_TRACKER_TTL_SECS", parse_number)? {
            config.digest.tracker_ttl_secs = v;
        }
        if let Some(v) = lookup("DIGEST_NONCE_SECRET") {
            config.digest.nonce_secret = v;
        }
        if let Some(v) = lookup("DIGEST_ETAG") {
            config.digest.etag = v;
        }
        if let Some(v) = lookup("DIGEST_OPAQUE") {
            config.digest.opaque = v;
        }

        if let Some(v) = lookup("HMAC_SCHEME") {
            config.hmac.scheme = v;
        }
        if let Some(v) = lookup("HMAC_ALGORITHM") {
            config.hmac.algorithm = v;
        }
        if let Some(v) = lookup("HMAC_TIMESTAMP_HEADER") {
            config.hmac.timestamp_header = v.to_ascii_lowercase();
        }
        if let Some(v) = parse_var(&lookup, "HMAC_MAX_CLOCK_SKEW_SECS", parse_number)? {
            config.hmac.max_clock_skew_secs = v;
        }
        if let Some(v) = lookup("HMAC_DEFAULT_SIGNED_HEADERS") {
            config.hmac.default_signed_headers = v
                .split(';')
                .map(|name| name.trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the schemes cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedAlgorithm`] if an algorithm is not in
    /// the default registry, or [`ConfigError::Invalid`] for other problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let registry = AlgorithmRegistry::default();
        for name in [&self.digest.algorithm, &self.hmac.algorithm] {
            if registry.resolve(name).is_none() {
                return Err(ConfigError::UnsupportedAlgorithm(name.clone()));
            }
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid("max body size must be positive".to_owned()));
        }
        self.digest.validate()?;
        if self.hmac.scheme.is_empty() || self.hmac.scheme.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "hmac scheme must be a single token: {:?}",
                self.hmac.scheme
            )));
        }
        if self.hmac.default_signed_headers.is_empty() {
            return Err(ConfigError::Invalid(
                "hmac default signed headers must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Parse options built from the configured delimiter.
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::with_delimiter(self.credential_delimiter.clone())
    }

    /// Body read deadline.
    #[must_use]
    pub fn body_read_timeout(&self) -> Duration {
        Duration::from_millis(self.body_read_timeout_ms)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => parse(value.trim())
            .map(Some)
            .ok_or(ConfigError::InvalidValue { var, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

fn random_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
