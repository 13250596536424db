//! The Digest `Authorization` header.

use std::fmt;
use std::str::FromStr;

use reqauth_core::header::{AuthorizationHeader, CredentialMap};
use reqauth_core::HeaderWriter;

/// Quality of protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qop {
    /// Authentication only.
    Auth,
    /// Authentication with integrity protection of the request body.
    AuthInt,
}

impl Qop {
    /// Wire token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
        }
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qop {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auth" => Ok(Self::Auth),
            "auth-int" => Ok(Self::AuthInt),
            _ => Err(()),
        }
    }
}

/// The `nc` field: a hexadecimal request counter bound to a nonce.
///
/// The client's exact spelling is kept because it is part of the hashed
/// response; [`value`](Self::value) is the parsed counter used for replay
/// tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonceCount {
    raw: String,
    value: u64,
}

impl NonceCount {
    /// The eight-digit spelling of `value` that clients send, e.g. `00000001`.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self {
            raw: format!("{value:08x}"),
            value,
        }
    }

    /// Parse a hexadecimal counter of at most 16 digits.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > 16 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u64::from_str_radix(raw, 16).ok()?;
        Some(Self {
            raw: raw.to_owned(),
            value,
        })
    }

    /// The counter as sent.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The numeric counter.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl fmt::Display for NonceCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parsed Digest credentials.
///
/// # Examples
///
/// ```
/// use reqauth_core::{AuthorizationHeader, ParseOptions};
/// use reqauth_digest::DigestHeader;
///
/// let raw = r#"Digest username="Mufasa", realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html", qop=auth, nc=00000001, cnonce="0a4f113b", response="6629fae49393a05397450978507c4ef1", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;
/// let header = DigestHeader::parse(raw, "Digest", &ParseOptions::default()).unwrap();
/// assert_eq!(header.username(), "Mufasa");
/// assert_eq!(header.nc().value(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestHeader {
    pub(crate) scheme: String,
    pub(crate) username: String,
    pub(crate) realm: String,
    pub(crate) nonce: String,
    pub(crate) uri: String,
    pub(crate) qop: Qop,
    pub(crate) nc: NonceCount,
    pub(crate) cnonce: String,
    pub(crate) response: String,
    pub(crate) opaque: Option<String>,
    pub(crate) algorithm: Option<String>,
}

impl DigestHeader {
    /// User name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Protection space.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Server nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Request target the response was computed over.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Quality of protection.
    #[must_use]
    pub fn qop(&self) -> Qop {
        self.qop
    }

    /// Nonce count.
    #[must_use]
    pub fn nc(&self) -> &NonceCount {
        &self.nc
    }

    /// Client nonce.
    #[must_use]
    pub fn cnonce(&self) -> &str {
        &self.cnonce
    }

    /// Request digest.
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Opaque value echoed from the challenge.
    #[must_use]
    pub fn opaque(&self) -> Option<&str> {
        self.opaque.as_deref()
    }

    /// Algorithm named by the client.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }
}

impl AuthorizationHeader for DigestHeader {
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "username", "realm", "nonce", "uri", "qop", "nc", "cnonce", "response",
    ];

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn parse_core(scheme: &str, credentials: &CredentialMap) -> Option<Self> {
        Some(Self {
            scheme: scheme.to_owned(),
            username: credentials.get_owned("username")?,
            realm: credentials.get_owned("realm")?,
            nonce: credentials.get_owned("nonce")?,
            uri: credentials.get_owned("uri")?,
            qop: credentials.get("qop")?.parse().ok()?,
            nc: NonceCount::parse(credentials.get("nc")?)?,
            cnonce: credentials.get_owned("cnonce")?,
            response: credentials.get_owned("response")?,
            opaque: credentials.get_owned("opaque"),
            algorithm: credentials.get_owned("algorithm"),
        })
    }
}

impl fmt::Display for DigestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = HeaderWriter::new(&self.scheme)
            .quoted("username", &self.username)
            .quoted("realm", &self.realm)
            .quoted("nonce", &self.nonce)
            .quoted("uri", &self.uri)
            .token("qop", self.qop.as_str())
            .token("nc", self.nc.as_str())
            .quoted("cnonce", &self.cnonce)
            .quoted("response", &self.response)
            .quoted_opt("opaque", self.opaque.as_deref())
            .token_opt("algorithm", self.algorithm.as_deref())
            .finish();
        f.write_str(&value)
    }
}
