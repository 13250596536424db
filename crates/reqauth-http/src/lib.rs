//! HTTP integration for reqauth.
//!
//! - [`driver`] - The scheme-agnostic [`try_authenticate`] template and
//!   [`Authenticator`]
//! - [`body`] - Bounded request body buffering and the rejection body type
//! - [`response`] - Status mapping and rejection responses
//! - [`service`] - [`AuthService`], a hyper middleware that authenticates
//!   requests before passing them on
//!
//! # Usage
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::service::service_fn;
//! use reqauth_core::config::AuthConfig;
//! use reqauth_core::{Principal, StaticSecretResolver};
//! use reqauth_hmac::HmacAuthenticator;
//! use reqauth_http::AuthService;
//!
//! let config = AuthConfig::default();
//! let resolver = StaticSecretResolver::new(vec![
//!     ("client-1".to_owned(), "s3cr3t".to_owned()),
//! ]);
//! let scheme = HmacAuthenticator::new(&config.hmac, Arc::new(resolver))?;
//!
//! let inner = service_fn(|req: http::Request<Full<Bytes>>| async move {
//!     let who = req.extensions().get::<Principal>().map(ToString::to_string);
//!     Ok::<_, Infallible>(http::Response::new(Full::new(Bytes::from(who.unwrap_or_default()))))
//! });
//! let service = AuthService::from_config(inner, scheme, &config);
//! # let _ = service;
//! # Ok::<(), reqauth_core::ConfigError>(())
//! ```

pub mod body;
pub mod driver;
pub mod response;
pub mod service;

pub use body::{AuthResponseBody, BodyLimits, collect_limited};
pub use driver::{AuthOutcome, Authenticator, preflight, try_authenticate};
pub use response::{error_to_response, status_for};
pub use service::{AuthService, AuthServiceResponse};
