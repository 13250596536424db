//! Hash algorithm registry.
//!
//! Both schemes select their hash function by name: Digest through the
//! `algorithm` field (`MD5`, `SHA-256`, `SHA-512-256`) and Hmac through its
//! configured algorithm. [`AlgorithmRegistry`] maps those identifiers to a
//! [`HashAlgorithm`] carrying the plain digest and keyed-hash constructors, so
//! new algorithms are added by registering them rather than by editing the
//! schemes' dispatch.

use std::fmt;

use digest::Digest;
use hmac::{Hmac, KeyInit, Mac};
use md5::Md5;
use sha2::{Sha256, Sha512_256};

/// A named hash function with its HMAC counterpart.
#[derive(Clone, Copy)]
pub struct HashAlgorithm {
    name: &'static str,
    digest: fn(&[u8]) -> Vec<u8>,
    mac: fn(&[u8], &[u8]) -> Vec<u8>,
}

impl HashAlgorithm {
    /// MD5, the RFC 2617 default.
    pub const MD5: Self = Self::new("MD5", digest_with::<Md5>, hmac_md5);
    /// SHA-256 (RFC 7616).
    pub const SHA256: Self = Self::new("SHA-256", digest_with::<Sha256>, hmac_sha256);
    /// SHA-512/256 (RFC 7616).
    pub const SHA512_256: Self =
        Self::new("SHA-512-256", digest_with::<Sha512_256>, hmac_sha512_256);

    /// Create an algorithm from its wire name and constructors.
    #[must_use]
    pub const fn new(
        name: &'static str,
        digest: fn(&[u8]) -> Vec<u8>,
        mac: fn(&[u8], &[u8]) -> Vec<u8>,
    ) -> Self {
        Self { name, digest, mac }
    }

    /// The identifier used on the wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Hash `data` and return the raw bytes.
    #[must_use]
    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        (self.digest)(data)
    }

    /// Hash `data` and return lower-case hex.
    #[must_use]
    pub fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }

    /// Compute the keyed hash of `data` under `key`.
    #[must_use]
    pub fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        (self.mac)(key, data)
    }
}

impl fmt::Debug for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HashAlgorithm").field(&self.name).finish()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for HashAlgorithm {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(other.name)
    }
}

impl Eq for HashAlgorithm {}

/// Lookup table from algorithm identifiers to [`HashAlgorithm`]s.
///
/// Lookups ignore ASCII case. Names that are not registered resolve to `None`,
/// and callers must treat that as a failure rather than fall back to a default.
///
/// # Examples
///
/// ```
/// use reqauth_core::AlgorithmRegistry;
///
/// let registry = AlgorithmRegistry::default();
/// assert_eq!(registry.resolve("sha-256").unwrap().name(), "SHA-256");
/// assert!(registry.resolve("SHA-1").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    algorithms: Vec<HashAlgorithm>,
}

impl AlgorithmRegistry {
    /// Create a registry with no algorithms.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            algorithms: Vec::new(),
        }
    }

    /// Register an algorithm, replacing any existing entry with the same name.
    pub fn register(&mut self, algorithm: HashAlgorithm) -> &mut Self {
        self.algorithms.retain(|existing| existing != &algorithm);
        self.algorithms.push(algorithm);
        self
    }

    /// Resolve an algorithm by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<HashAlgorithm> {
        self.algorithms
            .iter()
            .find(|alg| alg.name.eq_ignore_ascii_case(name.trim()))
            .copied()
    }

    /// Names of all registered algorithms, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.algorithms.iter().map(HashAlgorithm::name)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(HashAlgorithm::MD5)
            .register(HashAlgorithm::SHA256)
            .register(HashAlgorithm::SHA512_256);
        registry
    }
}

fn digest_with<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

fn hmac_md5(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Md5>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha512_256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha512_256>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
