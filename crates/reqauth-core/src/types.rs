//! Request and identity types shared by the schemes and the driver.

use std::fmt;

use http::request::Parts;

/// Request extension marking a connection that was accepted over TLS.
///
/// A TLS acceptor inserts this into the request extensions so that the
/// driver can enforce secure transport for requests whose URI carries no
/// scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecureTransport;

/// The parts of an HTTP request that authentication inspects.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    parts: &'a Parts,
    body: &'a [u8],
}

impl<'a> AuthRequest<'a> {
    /// Wrap request parts and the fully buffered body.
    #[must_use]
    pub fn new(parts: &'a Parts, body: &'a [u8]) -> Self {
        Self { parts, body }
    }

    /// The request head.
    #[must_use]
    pub fn parts(&self) -> &'a Parts {
        self.parts
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &'a str {
        self.parts.method.as_str()
    }

    /// The URI path.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.parts.uri.path()
    }

    /// The raw query string, or `""`.
    #[must_use]
    pub fn query(&self) -> &'a str {
        self.parts.uri.query().unwrap_or("")
    }

    /// The request target as sent on the request line (path plus query).
    #[must_use]
    pub fn target(&self) -> &'a str {
        self.parts
            .uri
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str)
    }

    /// The buffered request body.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// The first value of header `name`, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// All values of header `name` in request order.
    ///
    /// Values that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&'a str> {
        self.parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// The `Authorization` header text, if present and valid UTF-8.
    #[must_use]
    pub fn authorization(&self) -> Option<&'a str> {
        self.header(http::header::AUTHORIZATION.as_str())
    }

    /// Whether the request arrived over a secure transport.
    ///
    /// True for `https` URIs and for requests carrying the [`SecureTransport`]
    /// extension. `X-Forwarded-Proto: https` counts only when
    /// `trust_forwarded_proto` is set.
    #[must_use]
    pub fn is_secure(&self, trust_forwarded_proto: bool) -> bool {
        if self.parts.uri.scheme() == Some(&http::uri::Scheme::HTTPS)
            || self.parts.extensions.get::<SecureTransport>().is_some()
        {
            return true;
        }
        trust_forwarded_proto
            && self
                .header("x-forwarded-proto")
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
    }
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    name: String,
    scheme: String,
}

impl Principal {
    /// Create a principal authenticated by `scheme`.
    #[must_use]
    pub fn new(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scheme: scheme.into(),
        }
    }

    /// The user name or client id.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheme that authenticated this principal.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(builder: http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_should_expose_request_line_components() {
        let parts = parts(
            http::Request::builder()
                .method("POST")
                .uri("http://example.com/a/b?x=1&y=2"),
        );
        let request = AuthRequest::new(&parts, b"body");
        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), "/a/b");
        assert_eq!(request.query(), "x=1&y=2");
        assert_eq!(request.target(), "/a/b?x=1&y=2");
        assert_eq!(request.body(), b"body");
    }

    #[test]
    fn test_should_collect_multi_valued_headers_in_order() {
        let parts = parts(
            http::Request::builder()
                .uri("/")
                .header("x-multi", "one")
                .header("x-multi", "two"),
        );
        let request = AuthRequest::new(&parts, b"");
        assert_eq!(request.header_values("x-multi"), vec!["one", "two"]);
        assert_eq!(request.header("x-multi"), Some("one"));
        assert!(request.authorization().is_none());
    }

    #[test]
    fn test_should_detect_secure_transport() {
        let https = parts(http::Request::builder().uri("https://example.com/"));
        assert!(AuthRequest::new(&https, b"").is_secure(false));

        let plain = parts(http::Request::builder().uri("/"));
        assert!(!AuthRequest::new(&plain, b"").is_secure(false));

        let mut tls = parts(http::Request::builder().uri("/"));
        tls.extensions.insert(SecureTransport);
        assert!(AuthRequest::new(&tls, b"").is_secure(false));
    }

    #[test]
    fn test_should_trust_forwarded_proto_only_when_enabled() {
        let forwarded = parts(
            http::Request::builder()
                .uri("/")
                .header("x-forwarded-proto", "HTTPS"),
        );
        let request = AuthRequest::new(&forwarded, b"");
        assert!(!request.is_secure(false));
        assert!(request.is_secure(true));
    }

    #[test]
    fn test_should_display_principal_with_scheme() {
        let principal = Principal::new("Mufasa", "Digest");
        assert_eq!(principal.to_string(), "Digest:Mufasa");
        assert_eq!(principal.name(), "Mufasa");
        assert_eq!(principal.scheme(), "Digest");
    }
}
