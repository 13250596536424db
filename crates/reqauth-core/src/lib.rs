//! Shared building blocks for HTTP request authentication.
//!
//! This crate holds everything the Digest and Hmac schemes have in common:
//! the generic credential-header parser and writer, the builder precondition
//! framework, the hash algorithm registry, configuration, and the
//! [`AuthScheme`] seam the driver dispatches through.
//!
//! # Usage
//!
//! ```rust
//! use reqauth_core::header::{ParseOptions, parse_credentials};
//!
//! let raw = r#"Digest username="Mufasa", realm="testrealm@host.com", qop=auth"#;
//! let fields = parse_credentials(raw, "Digest", &ParseOptions::default()).unwrap();
//! assert_eq!(fields.get("username"), Some("Mufasa"));
//! assert_eq!(fields.get("qop"), Some("auth"));
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Hash algorithm registry (MD5, SHA-256, SHA-512-256)
//! - [`builder`] - Field relations and the final builder stage
//! - [`config`] - Environment-driven configuration
//! - [`credentials`] - Secret resolution
//! - [`error`] - Authentication, builder, and configuration errors
//! - [`header`] - Credential header parsing and rendering
//! - [`scheme`] - The scheme trait and verification outcomes
//! - [`types`] - Request view and principal

pub mod algorithm;
pub mod builder;
pub mod config;
pub mod credentials;
pub mod error;
pub mod header;
pub mod scheme;
pub mod types;

pub use algorithm::{AlgorithmRegistry, HashAlgorithm};
pub use builder::{AuthorizationHeaderBuilder, HeaderFields, Relation};
pub use config::{AuthConfig, DigestConfig, HmacConfig};
pub use credentials::{SecretResolver, StaticSecretResolver, UNKNOWN_IDENTITY_SECRET};
pub use error::{AuthError, AuthResult, BuildError, ConfigError};
pub use header::{AuthorizationHeader, CredentialMap, HeaderWriter, ParseOptions};
pub use scheme::{AuthScheme, Verification};
pub use types::{AuthRequest, Principal, SecureTransport};
