//! HMAC request signing.
//!
//! A client signs a request with a shared secret; the server rebuilds the
//! same signature and compares:
//!
//! ```text
//! CanonicalRequest = Method \n URI \n Query \n SignedHeaderLines \n SignedHeaders \n Hex(H(Body))
//! StringToSign     = Scheme \n Timestamp \n CredentialScope \n Hex(H(CanonicalRequest))
//! DateKey          = HMAC(Secret, yyyyMMdd)
//! Signature        = Hex(HMAC(DateKey, StringToSign))
//! ```
//!
//! [`HmacBuilder`] is the signer, [`HmacHeader`] the `Authorization` value,
//! and [`HmacAuthenticator`] the server side behind
//! [`reqauth_core::AuthScheme`].

pub mod authenticator;
pub mod builder;
pub mod canonical;
pub mod header;
pub mod signing;

pub use authenticator::HmacAuthenticator;
pub use builder::{HmacBuilder, Signed, Unsigned};
pub use header::HmacHeader;
