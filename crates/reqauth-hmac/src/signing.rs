//! String-to-sign, key derivation and signature computation.
//!
//! ```text
//! StringToSign = Scheme \n Timestamp \n CredentialScope \n Hex(H(CanonicalRequest))
//! DateKey      = HMAC(Secret, yyyyMMdd)
//! Signature    = Hex(HMAC(DateKey, StringToSign))
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use reqauth_core::HashAlgorithm;

/// ISO 8601 basic format used in the string to sign.
const ISO8601_BASIC: &str = "%Y%m%dT%H%M%SZ";

/// Date format used for key derivation.
const DATE_STAMP: &str = "%Y%m%d";

/// Parse a signing timestamp in ISO 8601 basic (`20261018T120000Z`) or
/// RFC 2822 (`Sun, 18 Oct 2026 12:00:00 GMT`) form.
///
/// # Examples
///
/// ```
/// use reqauth_hmac::signing::{format_timestamp, parse_timestamp};
///
/// let ts = parse_timestamp("Sun, 18 Oct 2026 12:00:00 GMT").unwrap();
/// assert_eq!(format_timestamp(&ts), "20261018T120000Z");
/// ```
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, ISO8601_BASIC) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Format a timestamp in ISO 8601 basic form.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(ISO8601_BASIC).to_string()
}

/// Build the string to sign.
///
/// # Examples
///
/// ```
/// use reqauth_hmac::signing::build_string_to_sign;
///
/// let sts = build_string_to_sign("HMAC-SHA256", "20261018T120000Z", "20261018/orders", "abc");
/// assert_eq!(sts, "HMAC-SHA256\n20261018T120000Z\n20261018/orders\nabc");
/// ```
#[must_use]
pub fn build_string_to_sign(
    scheme: &str,
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{scheme}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the signing key for the day of `timestamp`.
#[must_use]
pub fn derive_date_key(
    algorithm: HashAlgorithm,
    secret: &str,
    timestamp: &DateTime<Utc>,
) -> Vec<u8> {
    let date = timestamp.format(DATE_STAMP).to_string();
    algorithm.hmac(secret.as_bytes(), date.as_bytes())
}

/// Compute the hex-encoded signature of `string_to_sign`.
#[must_use]
pub fn compute_signature(
    algorithm: HashAlgorithm,
    date_key: &[u8],
    string_to_sign: &str,
) -> String {
    hex::encode(algorithm.hmac(date_key, string_to_sign.as_bytes()))
}
