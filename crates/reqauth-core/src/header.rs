//! Generic `Scheme key=value, ...` credential headers.
//!
//! An authorization header is parsed in two steps:
//!
//! 1. [`parse_credentials`] checks the scheme prefix and splits the remainder
//!    into a [`CredentialMap`] of field names to (unquoted) values.
//! 2. The scheme's [`AuthorizationHeader::parse_core`] builds the typed header
//!    once every field in [`AuthorizationHeader::REQUIRED_FIELDS`] is present.
//!
//! Every malformed input (wrong scheme, unbalanced quotes, tokens without `=`,
//! duplicate field names, missing required fields) yields `None`, which callers
//! treat as "no usable credentials".
//!
//! [`HeaderWriter`] is the inverse: it renders the fields of a header or
//! challenge back into wire form.

use std::fmt;

use tracing::debug;

/// The delimiter used between credential fields unless configured otherwise.
pub const DEFAULT_DELIMITER: &str = ", ";

/// Options controlling how credential fields are split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    delimiter: String,
}

impl ParseOptions {
    /// Use `delimiter` between fields. An empty delimiter falls back to
    /// [`DEFAULT_DELIMITER`].
    #[must_use]
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Self::default();
        }
        Self { delimiter }
    }

    /// The field delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_owned(),
        }
    }
}

/// Ordered field-name to field-value mapping parsed from a credential header.
///
/// Field names are case-sensitive and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialMap {
    entries: Vec<(String, String)>,
}

impl CredentialMap {
    /// Look up a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Look up a field value and return an owned copy.
    #[must_use]
    pub fn get_owned(&self, name: &str) -> Option<String> {
        self.get(name).map(ToOwned::to_owned)
    }

    /// Whether the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The first name in `names` that is not present, if any.
    #[must_use]
    pub fn first_missing<'a>(&self, names: &[&'a str]) -> Option<&'a str> {
        names.iter().copied().find(|name| !self.contains(name))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fields were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert a field. Returns `false` (and leaves the map unchanged) if the
    /// name is already present.
    fn insert(&mut self, name: &str, value: String) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.push((name.to_owned(), value));
        true
    }
}

/// Split `raw` into a [`CredentialMap`] if it starts with `scheme` followed by
/// a space.
///
/// # Examples
///
/// ```
/// use reqauth_core::header::{ParseOptions, parse_credentials};
///
/// let map = parse_credentials(
///     "Digest username=\"Mufasa\", qop=auth",
///     "Digest",
///     &ParseOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(map.get("username"), Some("Mufasa"));
/// assert_eq!(map.get("qop"), Some("auth"));
/// ```
#[must_use]
pub fn parse_credentials(raw: &str, scheme: &str, options: &ParseOptions) -> Option<CredentialMap> {
    let rest = raw.strip_prefix(scheme)?.strip_prefix(' ')?;

    let mut map = CredentialMap::default();
    for token in split_unquoted(rest, options.delimiter())? {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let (key, value) = token.split_once('=')?;
        let key = key.trim();
        if key.is_empty() || key.contains('"') {
            return None;
        }

        let value = unquote(value.trim())?;
        if !map.insert(key, value) {
            debug!(field = key, "duplicate credential field");
            return None;
        }
    }

    Some(map)
}

/// A typed credential header for one authentication scheme.
pub trait AuthorizationHeader: Sized + fmt::Display {
    /// Fields that must all be present for [`parse_core`](Self::parse_core) to be called.
    const REQUIRED_FIELDS: &'static [&'static str];

    /// The scheme token this header was parsed with.
    fn scheme(&self) -> &str;

    /// Build the header from a credential map that contains every required field.
    fn parse_core(scheme: &str, credentials: &CredentialMap) -> Option<Self>;

    /// Parse `raw` as a header of `scheme`.
    ///
    /// Returns `None` when the text is malformed or any required field is missing.
    fn parse(raw: &str, scheme: &str, options: &ParseOptions) -> Option<Self> {
        let credentials = parse_credentials(raw, scheme, options)?;
        if let Some(missing) = credentials.first_missing(Self::REQUIRED_FIELDS) {
            debug!(scheme, field = missing, "credential header is missing a required field");
            return None;
        }
        Self::parse_core(scheme, &credentials)
    }
}

/// Renders `Scheme k="v", k=v` header values.
///
/// # Examples
///
/// ```
/// use reqauth_core::HeaderWriter;
///
/// let value = HeaderWriter::new("Digest")
///     .quoted("realm", "a \"quoted\" realm")
///     .token("qop", "auth")
///     .finish();
/// assert_eq!(value, r#"Digest realm="a \"quoted\" realm", qop=auth"#);
/// ```
#[derive(Debug, Clone)]
pub struct HeaderWriter {
    scheme: String,
    fields: Vec<String>,
}

impl HeaderWriter {
    /// Start a header for `scheme`.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field whose value is wrapped in double quotes.
    #[must_use]
    pub fn quoted(mut self, name: &str, value: &str) -> Self {
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            if ch == '"' || ch == '\\' {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        self.fields.push(format!("{name}=\"{escaped}\""));
        self
    }

    /// Append a field whose value is written verbatim.
    #[must_use]
    pub fn token(mut self, name: &str, value: &str) -> Self {
        self.fields.push(format!("{name}={value}"));
        self
    }

    /// Append a quoted field only when `value` is present.
    #[must_use]
    pub fn quoted_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.quoted(name, value),
            None => self,
        }
    }

    /// Append a verbatim field only when `value` is present.
    #[must_use]
    pub fn token_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.token(name, value),
            None => self,
        }
    }

    /// Render the header value.
    #[must_use]
    pub fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.scheme;
        }
        format!("{} {}", self.scheme, self.fields.join(DEFAULT_DELIMITER))
    }
}

/// Split on `delimiter` outside of double-quoted sections.
///
/// Returns `None` if a quoted section is not terminated.
fn split_unquoted<'a>(input: &'a str, delimiter: &str) -> Option<Vec<&'a str>> {
    let bytes = input.as_bytes();
    let delimiter = delimiter.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_quotes = false;
            }
            i += 1;
        } else if b == b'"' {
            in_quotes = true;
            i += 1;
        } else if !delimiter.is_empty() && bytes[i..].starts_with(delimiter) {
            tokens.push(&input[start..i]);
            i += delimiter.len();
            start = i;
        } else {
            i += 1;
        }
    }

    if in_quotes {
        return None;
    }
    tokens.push(&input[start..]);
    Some(tokens)
}

/// Strip one pair of surrounding double quotes and resolve backslash escapes.
///
/// Unquoted values must not contain quotes at all.
fn unquote(value: &str) -> Option<String> {
    let Some(inner) = value.strip_prefix('"') else {
        return (!value.contains('"')).then(|| value.to_owned());
    };
    let inner = inner.strip_suffix('"')?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?),
            '"' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestHeader {
        scheme: String,
        user: String,
        token: String,
    }

    impl fmt::Display for TestHeader {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let value = HeaderWriter::new(&self.scheme)
                .quoted("user", &self.user)
                .token("token", &self.token)
                .finish();
            f.write_str(&value)
        }
    }

    impl AuthorizationHeader for TestHeader {
        const REQUIRED_FIELDS: &'static [&'static str] = &["user", "token"];

        fn scheme(&self) -> &str {
            &self.scheme
        }

        fn parse_core(scheme: &str, credentials: &CredentialMap) -> Option<Self> {
            Some(Self {
                scheme: scheme.to_owned(),
                user: credentials.get_owned("user")?,
                token: credentials.get_owned("token")?,
            })
        }
    }

    fn parse(raw: &str) -> Option<CredentialMap> {
        parse_credentials(raw, "Test", &ParseOptions::default())
    }

    #[test]
    fn test_should_parse_quoted_and_unquoted_fields() {
        let map = parse(r#"Test a="1", b=2, c="three""#).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get("b"), Some("2"));
        assert_eq!(map.get("c"), Some("three"));
    }

    #[test]
    fn test_should_keep_input_order() {
        let map = parse("Test z=1, a=2, m=3").unwrap();
        let names: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_should_split_on_first_equals_only() {
        let map = parse("Test sig=abc==, x=a=b").unwrap();
        assert_eq!(map.get("sig"), Some("abc=="));
        assert_eq!(map.get("x"), Some("a=b"));
    }

    #[test]
    fn test_should_not_split_inside_quotes() {
        let map = parse(r#"Test qop="auth, auth-int", realm="r""#).unwrap();
        assert_eq!(map.get("qop"), Some("auth, auth-int"));
        assert_eq!(map.get("realm"), Some("r"));
    }

    #[test]
    fn test_should_resolve_escaped_quotes() {
        let map = parse(r#"Test realm="say \"hi\"""#).unwrap();
        assert_eq!(map.get("realm"), Some(r#"say "hi""#));
    }

    #[test]
    fn test_should_reject_wrong_scheme() {
        assert!(parse("Basic a=1").is_none());
        assert!(parse("Testing a=1").is_none());
        assert!(parse("Test").is_none());
        assert!(parse_credentials("test a=1", "Test", &ParseOptions::default()).is_none());
    }

    #[test]
    fn test_should_reject_truncated_quoted_value() {
        assert!(parse(r#"Test a="unterminated"#).is_none());
        assert!(parse(r#"Test a="x", b="y"#).is_none());
        assert!(parse(r#"Test a=x"y"#).is_none());
    }

    #[test]
    fn test_should_reject_token_without_equals() {
        assert!(parse("Test a=1, garbage").is_none());
    }

    #[test]
    fn test_should_reject_duplicate_fields() {
        assert!(parse("Test a=1, a=2").is_none());
    }

    #[test]
    fn test_should_treat_field_names_case_sensitively() {
        let map = parse("Test Realm=x").unwrap();
        assert!(map.get("realm").is_none());
        assert_eq!(map.get("Realm"), Some("x"));
    }

    #[test]
    fn test_should_honor_custom_delimiter() {
        let options = ParseOptions::with_delimiter(",");
        let map = parse_credentials("Test a=1,b=2, c=3", "Test", &options).unwrap();
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get("b"), Some("2"));
        assert_eq!(map.get("c"), Some("3"));
    }

    #[test]
    fn test_should_fall_back_to_default_for_empty_delimiter() {
        assert_eq!(ParseOptions::with_delimiter(""), ParseOptions::default());
    }

    #[test]
    fn test_should_handle_multibyte_values() {
        let map = parse(r#"Test user="Jäsøn Doe", b=ü"#).unwrap();
        assert_eq!(map.get("user"), Some("Jäsøn Doe"));
        assert_eq!(map.get("b"), Some("ü"));
    }

    #[test]
    fn test_should_require_all_required_fields() {
        let options = ParseOptions::default();
        assert!(TestHeader::parse(r#"Test user="u""#, "Test", &options).is_none());
        assert!(TestHeader::parse("Test token=t", "Test", &options).is_none());
        let header = TestHeader::parse(r#"Test token=t, user="u""#, "Test", &options).unwrap();
        assert_eq!(header.user, "u");
        assert_eq!(header.token, "t");
        assert_eq!(header.scheme(), "Test");
    }

    #[test]
    fn test_should_ignore_unknown_fields() {
        let options = ParseOptions::default();
        let header =
            TestHeader::parse(r#"Test extra=1, user="u", token=t"#, "Test", &options).unwrap();
        assert_eq!(header.user, "u");
    }

    #[test]
    fn test_should_round_trip_through_writer() {
        let options = ParseOptions::default();
        let original = TestHeader {
            scheme: "Test".to_owned(),
            user: r#"a "b", c"#.to_owned(),
            token: "xyz".to_owned(),
        };
        let parsed = TestHeader::parse(&original.to_string(), "Test", &options).unwrap();
        assert_eq!(parsed.user, original.user);
        assert_eq!(parsed.token, original.token);
    }

    #[test]
    fn test_should_render_scheme_only_without_fields() {
        assert_eq!(HeaderWriter::new("HMAC-SHA256").finish(), "HMAC-SHA256");
    }

    #[test]
    fn test_should_skip_absent_optional_fields() {
        let value = HeaderWriter::new("X")
            .quoted_opt("a", None)
            .token_opt("b", Some("2"))
            .finish();
        assert_eq!(value, "X b=2");
    }
}
