//! Digest access authentication.
//!
//! Implements the server side of the RFC 2617 / RFC 7616 challenge-response
//! scheme and the client-side header builder:
//!
//! - [`DigestHeader`] and [`DigestChallenge`] parse and render the
//!   `Authorization` and `WWW-Authenticate` values.
//! - [`DigestBuilder`] computes `HA1`, `HA2` and the response digest in
//!   phases, so no hash step can run before its inputs are set.
//! - [`NonceIssuer`] issues self-validating, time-stamped nonces.
//! - [`NonceTracker`] records the highest nonce count seen per nonce;
//!   [`InMemoryNonceTracker`] is a sharded in-process implementation.
//! - [`DigestAuthenticator`] ties them together behind
//!   [`reqauth_core::AuthScheme`].
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use reqauth_core::config::DigestConfig;
//! use reqauth_core::{AuthScheme, StaticSecretResolver};
//! use reqauth_digest::{DigestAuthenticator, InMemoryNonceTracker};
//!
//! let resolver = StaticSecretResolver::new(vec![
//!     ("Mufasa".to_owned(), "Circle Of Life".to_owned()),
//! ]);
//! let tracker = InMemoryNonceTracker::new(Duration::from_secs(300));
//! let auth = DigestAuthenticator::new(
//!     &DigestConfig::default(),
//!     Arc::new(resolver),
//!     Arc::new(tracker),
//! )?;
//!
//! assert!(auth.challenge(false).starts_with("Digest realm="));
//! # Ok::<(), reqauth_core::ConfigError>(())
//! ```

pub mod authenticator;
pub mod builder;
pub mod challenge;
pub mod header;
pub mod nonce;
pub mod tracker;

/// The Digest scheme token.
pub const SCHEME: &str = "Digest";

pub use authenticator::DigestAuthenticator;
pub use builder::DigestBuilder;
pub use challenge::DigestChallenge;
pub use header::{DigestHeader, NonceCount, Qop};
pub use nonce::{NonceError, NonceIssuer};
pub use tracker::{InMemoryNonceTracker, NonceTracker, TrackerError};
