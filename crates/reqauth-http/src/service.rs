//! Authenticating hyper middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{Either, Full};
use hyper::service::Service;
use reqauth_core::config::AuthConfig;
use reqauth_core::{AuthError, AuthRequest, AuthScheme, Principal};
use tracing::{debug, info};

use crate::body::{AuthResponseBody, BodyLimits, collect_limited};
use crate::driver::{AuthOutcome, Authenticator};
use crate::response::error_to_response;

/// Hyper `Service` that authenticates each request before handing it on.
///
/// The request body is buffered within [`BodyLimits`] so schemes can hash it,
/// then passed to the inner service as a `Full<Bytes>`. On success the
/// resolved [`Principal`] is inserted into the request extensions. Failures
/// are answered here and never reach the inner service.
#[derive(Debug)]
pub struct AuthService<S, A> {
    inner: Arc<S>,
    authenticator: Arc<Authenticator<A>>,
    limits: BodyLimits,
}

impl<S, A: AuthScheme> AuthService<S, A> {
    /// Wrap `inner` with `authenticator`, using default body limits.
    pub fn new(inner: S, authenticator: Authenticator<A>) -> Self {
        Self {
            inner: Arc::new(inner),
            authenticator: Arc::new(authenticator),
            limits: BodyLimits::default(),
        }
    }

    /// Wrap `inner` with `scheme`, taking transport policy and body limits
    /// from `config`.
    pub fn from_config(inner: S, scheme: A, config: &AuthConfig) -> Self {
        Self::new(inner, Authenticator::from_config(scheme, config)).with_limits(BodyLimits {
            max_size: config.max_body_size,
            read_timeout: config.body_read_timeout(),
        })
    }

    /// Replace the body limits.
    #[must_use]
    pub fn with_limits(mut self, limits: BodyLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The authenticator in use.
    #[must_use]
    pub fn authenticator(&self) -> &Authenticator<A> {
        &self.authenticator
    }
}

impl<S, A> Clone for AuthService<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            authenticator: Arc::clone(&self.authenticator),
            limits: self.limits,
        }
    }
}

/// Response of an [`AuthService`]: the inner service's body, or a rejection.
pub type AuthServiceResponse<B> = http::Response<Either<B, AuthResponseBody>>;

impl<S, A, B, ResBody> Service<http::Request<B>> for AuthService<S, A>
where
    S: Service<http::Request<Full<Bytes>>, Response = http::Response<ResBody>>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    A: AuthScheme + 'static,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = AuthServiceResponse<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        let authenticator = Arc::clone(&self.authenticator);
        let limits = self.limits;
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();

            let (error, stale) = match authenticate(&authenticator, &parts, body, limits).await {
                Ok((principal, bytes)) => {
                    info!(
                        principal = %principal,
                        method = %parts.method,
                        path = parts.uri.path(),
                        "Request authenticated"
                    );
                    parts.extensions.insert(principal);
                    let request = http::Request::from_parts(parts, Full::new(bytes));
                    return inner.call(request).await.map(|r| r.map(Either::Left));
                }
                Err(failure) => failure,
            };

            debug!(%error, stale, %request_id, "Rejecting request");
            let challenge = authenticator.challenge(stale);
            Ok(error_to_response(&error, &challenge, &request_id).map(Either::Right))
        })
    }
}

/// Authenticate `parts`, reading the body only once the request carries
/// credentials over an acceptable transport.
async fn authenticate<A, B>(
    authenticator: &Authenticator<A>,
    parts: &http::request::Parts,
    body: B,
    limits: BodyLimits,
) -> Result<(Principal, Bytes), (AuthError, bool)>
where
    A: AuthScheme,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let failed = |error: AuthError| (error, false);

    authenticator
        .preflight(&AuthRequest::new(parts, &[]))
        .map_err(failed)?;
    if declared_length(parts).is_some_and(|length| length > limits.max_size) {
        return Err(failed(AuthError::PayloadTooLarge(limits.max_size)));
    }

    let bytes = collect_limited(body, limits).await.map_err(failed)?;
    match authenticator.authenticate(&AuthRequest::new(parts, &bytes)).await {
        AuthOutcome::Authenticated(principal) => Ok((principal, bytes)),
        AuthOutcome::Failed { error, stale } => Err((error, stale)),
    }
}

fn declared_length(parts: &http::request::Parts) -> Option<usize> {
    parts
        .headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
