//! Canonical request construction.
//!
//! The canonical request is the line-feed separated text that the signature
//! covers:
//!
//! ```text
//! HTTPMethod
//! CanonicalURI
//! CanonicalQueryString
//! name:value            (one line per signed header, in SignedHeaders order)
//! SignedHeaders
//! HexEncode(Hash(Body))
//! ```
//!
//! Only the headers named in `SignedHeaders` take part, so unsigned headers
//! cannot influence the signature.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};
use reqauth_core::{AuthRequest, BuildError, HashAlgorithm};

/// Characters percent-encoded in URI path segments: everything except the
/// RFC 3986 unreserved set. `/` separators are kept.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A signed header with all of its values in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeader<'a> {
    /// Lower-case header name.
    pub name: &'a str,
    /// Header values.
    pub values: Vec<&'a str>,
}

/// Build the canonical request string.
///
/// # Examples
///
/// ```
/// use reqauth_hmac::canonical::{SignedHeader, build_canonical_request};
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/orders",
///     "page=2",
///     &[SignedHeader { name: "host", values: vec!["api.example.com"] }],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/orders\npage=2\nhost:api.example.com\nhost\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[SignedHeader<'_>],
    payload_hash: &str,
) -> String {
    let mut lines = Vec::with_capacity(headers.len() + 5);
    lines.push(method.to_ascii_uppercase());
    lines.push(build_canonical_uri(path));
    lines.push(build_canonical_query_string(query));
    lines.extend(headers.iter().map(canonical_header_line));
    lines.push(build_signed_headers_string(headers.iter().map(|h| h.name)));
    lines.push(payload_hash.to_owned());
    lines.join("\n")
}

/// Build the canonical request for `request`, covering `signed_headers`.
///
/// # Errors
///
/// Returns [`BuildError::MissingRequestHeader`] for the first signed header
/// the request does not carry.
pub fn canonical_request_for(
    request: &AuthRequest<'_>,
    signed_headers: &[String],
    algorithm: HashAlgorithm,
) -> Result<String, BuildError> {
    let mut headers = Vec::with_capacity(signed_headers.len());
    for name in signed_headers {
        let values = request.header_values(name);
        if values.is_empty() {
            return Err(BuildError::MissingRequestHeader(name.clone()));
        }
        headers.push(SignedHeader {
            name: name.as_str(),
            values,
        });
    }
    Ok(build_canonical_request(
        request.method(),
        request.path(),
        request.query(),
        &headers,
        &algorithm.hash_hex(request.body()),
    ))
}

/// Build the canonical URI by percent-encoding each path segment.
///
/// Segments are decoded to raw bytes first so already-encoded paths are not
/// encoded twice. Bytes that are not valid UTF-8 keep their own escapes.
///
/// # Examples
///
/// ```
/// use reqauth_hmac::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/a b/c"), "/a%20b/c");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded: Vec<u8> = percent_decode_str(segment).collect();
            percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string: parameters sorted by name, then value.
///
/// Values are kept exactly as sent; clients differ in how they encode them
/// and the signature covers what is on the wire.
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join signed header names with `;`, keeping their order.
#[must_use]
pub fn build_signed_headers_string<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(";")
}

/// `name:value`, with multiple values joined by line feeds.
fn canonical_header_line(header: &SignedHeader<'_>) -> String {
    let values = header
        .values
        .iter()
        .map(|value| collapse_whitespace(value.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}:{values}", header.name)
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
