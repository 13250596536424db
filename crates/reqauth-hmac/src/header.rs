//! The Hmac `Authorization` header.
//!
//! ```text
//! <Scheme> Credential={clientId}/{credentialScope}, SignedHeaders={h1;h2;...}, Signature={hex}
//! ```

use std::fmt;

use reqauth_core::HeaderWriter;
use reqauth_core::header::{AuthorizationHeader, CredentialMap};

/// Parsed Hmac credentials.
///
/// # Examples
///
/// ```
/// use reqauth_core::{AuthorizationHeader, ParseOptions};
/// use reqauth_hmac::HmacHeader;
///
/// let raw = "HMAC-SHA256 Credential=client-1/20261018/orders, SignedHeaders=host;date, Signature=abcd";
/// let header = HmacHeader::parse(raw, "HMAC-SHA256", &ParseOptions::default()).unwrap();
/// assert_eq!(header.client_id(), "client-1");
/// assert_eq!(header.credential_scope(), "20261018/orders");
/// assert_eq!(header.signed_headers(), ["host", "date"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacHeader {
    pub(crate) scheme: String,
    pub(crate) client_id: String,
    pub(crate) credential_scope: String,
    pub(crate) signed_headers: Vec<String>,
    pub(crate) signature: String,
}

impl HmacHeader {
    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Credential scope.
    #[must_use]
    pub fn credential_scope(&self) -> &str {
        &self.credential_scope
    }

    /// Lower-case names of the signed headers, in signing order.
    #[must_use]
    pub fn signed_headers(&self) -> &[String] {
        &self.signed_headers
    }

    /// Hex-encoded signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Split a `SignedHeaders` value into lower-case names.
///
/// Returns `None` for an empty list or an empty name.
pub(crate) fn parse_signed_headers(value: &str) -> Option<Vec<String>> {
    let names: Vec<String> = value
        .split(';')
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();
    if names.iter().any(String::is_empty) {
        return None;
    }
    Some(names)
}

impl AuthorizationHeader for HmacHeader {
    const REQUIRED_FIELDS: &'static [&'static str] = &["Credential", "SignedHeaders", "Signature"];

    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn parse_core(scheme: &str, credentials: &CredentialMap) -> Option<Self> {
        let (client_id, credential_scope) = credentials.get("Credential")?.split_once('/')?;
        if client_id.is_empty() || credential_scope.is_empty() {
            return None;
        }
        let signature = credentials.get_owned("Signature")?;
        if signature.is_empty() {
            return None;
        }
        Some(Self {
            scheme: scheme.to_owned(),
            client_id: client_id.to_owned(),
            credential_scope: credential_scope.to_owned(),
            signed_headers: parse_signed_headers(credentials.get("SignedHeaders")?)?,
            signature,
        })
    }
}

impl fmt::Display for HmacHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = HeaderWriter::new(&self.scheme)
            .token(
                "Credential",
                &format!("{}/{}", self.client_id, self.credential_scope),
            )
            .token("SignedHeaders", &self.signed_headers.join(";"))
            .token("Signature", &self.signature)
            .finish();
        f.write_str(&value)
    }
}
