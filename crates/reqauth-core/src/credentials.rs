//! Secret resolution.
//!
//! The host application supplies a [`SecretResolver`] mapping a Digest user
//! name to its password, or an Hmac client id to its client secret. The
//! schemes treat an unknown identity exactly like a wrong secret so that
//! responses do not reveal which identities exist.

use std::collections::HashMap;

/// Secret hashed in place of an unknown identity's, so that rejecting it
/// takes the same work as rejecting a wrong secret. It never authenticates.
pub const UNKNOWN_IDENTITY_SECRET: &str = "reqauth:unknown-identity";

/// Looks up the shared secret for an identity.
pub trait SecretResolver: Send + Sync {
    /// Return the secret for `identity`, or `None` if the identity is unknown.
    fn resolve_secret(&self, identity: &str) -> Option<String>;
}

impl<F> SecretResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve_secret(&self, identity: &str) -> Option<String> {
        self(identity)
    }
}

/// A simple in-memory resolver backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use reqauth_core::credentials::{SecretResolver, StaticSecretResolver};
///
/// let resolver = StaticSecretResolver::new(vec![
///     ("Mufasa".to_owned(), "Circle Of Life".to_owned()),
/// ]);
///
/// assert_eq!(resolver.resolve_secret("Mufasa").as_deref(), Some("Circle Of Life"));
/// assert!(resolver.resolve_secret("Scar").is_none());
/// ```
#[derive(Clone)]
pub struct StaticSecretResolver {
    secrets: HashMap<String, String>,
}

impl StaticSecretResolver {
    /// Create a resolver from `(identity, secret)` pairs.
    pub fn new(secrets: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            secrets: secrets.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for StaticSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecretResolver")
            .field("identities", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretResolver for StaticSecretResolver {
    fn resolve_secret(&self, identity: &str) -> Option<String> {
        self.secrets.get(identity).cloned()
    }
}
