//! Scheme-agnostic authentication driver.
//!
//! [`try_authenticate`] performs the steps every scheme shares: transport
//! check, header extraction, and mapping the scheme's verdict onto an
//! [`AuthOutcome`]. The scheme supplies only a parser and a verifier.
//! [`Authenticator`] binds the driver to an [`AuthScheme`] and a transport
//! policy.

use std::future::Future;

use reqauth_core::config::AuthConfig;
use reqauth_core::{AuthError, AuthRequest, AuthScheme, Principal, Verification};
use tracing::debug;

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The request is authenticated.
    Authenticated(Principal),
    /// The request is not authenticated.
    Failed {
        /// Why.
        error: AuthError,
        /// The credentials were right but their nonce is expired or reused.
        stale: bool,
    },
}

impl AuthOutcome {
    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Failed { .. } => None,
        }
    }

    /// The failure reason, if any.
    #[must_use]
    pub fn error(&self) -> Option<&AuthError> {
        match self {
            Self::Authenticated(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    fn failed(error: AuthError) -> Self {
        Self::Failed {
            error,
            stale: false,
        }
    }
}

impl From<Verification> for AuthOutcome {
    fn from(verification: Verification) -> Self {
        match verification {
            Verification::Authenticated(principal) => Self::Authenticated(principal),
            Verification::Stale(error) => Self::Failed { error, stale: true },
            Verification::Rejected(error) => Self::failed(error),
        }
    }
}

/// Transport and header checks that need no body.
///
/// Returns the raw `Authorization` value.
///
/// # Errors
///
/// [`AuthError::InsecureTransport`] when a secure transport is required and
/// absent, [`AuthError::MissingAuthHeader`] when there is no credential.
pub fn preflight<'a>(
    request: &AuthRequest<'a>,
    require_secure_transport: bool,
    trust_forwarded_proto: bool,
) -> Result<&'a str, AuthError> {
    if require_secure_transport && !request.is_secure(trust_forwarded_proto) {
        return Err(AuthError::InsecureTransport);
    }
    request
        .authorization()
        .filter(|raw| !raw.trim().is_empty())
        .ok_or(AuthError::MissingAuthHeader)
}

/// Authenticate `request` with a scheme's `parse` and `verify` steps.
///
/// `parse` turns the raw `Authorization` value into the scheme's header or
/// `None`; `verify` recomputes and compares the credentials.
pub async fn try_authenticate<'r, 'a, H, P, V, F>(
    request: &'r AuthRequest<'a>,
    require_secure_transport: bool,
    trust_forwarded_proto: bool,
    parse: P,
    verify: V,
) -> AuthOutcome
where
    P: FnOnce(&str) -> Option<H>,
    V: FnOnce(H, &'r AuthRequest<'a>) -> F,
    F: Future<Output = Verification>,
{
    let raw = match preflight(request, require_secure_transport, trust_forwarded_proto) {
        Ok(raw) => raw,
        Err(error) => {
            debug!(%error, method = request.method(), path = request.path(), "Preflight failed");
            return AuthOutcome::failed(error);
        }
    };

    let Some(header) = parse(raw) else {
        debug!(method = request.method(), path = request.path(), "Unparseable credentials");
        return AuthOutcome::failed(AuthError::InvalidAuthHeader);
    };

    verify(header, request).await.into()
}

/// An [`AuthScheme`] with its transport policy.
#[derive(Debug)]
pub struct Authenticator<A> {
    scheme: A,
    require_secure_transport: bool,
    trust_forwarded_proto: bool,
}

impl<A: AuthScheme> Authenticator<A> {
    /// Wrap `scheme`, requiring a secure transport and ignoring
    /// `X-Forwarded-Proto`.
    #[must_use]
    pub fn new(scheme: A) -> Self {
        Self {
            scheme,
            require_secure_transport: true,
            trust_forwarded_proto: false,
        }
    }

    /// Wrap `scheme` with the transport policy and credential delimiter from
    /// `config`.
    #[must_use]
    pub fn from_config(mut scheme: A, config: &AuthConfig) -> Self {
        scheme.set_parse_options(config.parse_options());
        Self {
            scheme,
            require_secure_transport: config.require_secure_transport,
            trust_forwarded_proto: config.trust_forwarded_proto,
        }
    }

    /// Set whether requests must arrive over a secure transport.
    #[must_use]
    pub fn require_secure_transport(mut self, required: bool) -> Self {
        self.require_secure_transport = required;
        self
    }

    /// Set whether `X-Forwarded-Proto: https` counts as secure.
    #[must_use]
    pub fn trust_forwarded_proto(mut self, trusted: bool) -> Self {
        self.trust_forwarded_proto = trusted;
        self
    }

    /// The wrapped scheme.
    #[must_use]
    pub fn scheme(&self) -> &A {
        &self.scheme
    }

    /// Run [`preflight`] with this policy.
    ///
    /// # Errors
    ///
    /// See [`preflight`].
    pub fn preflight<'a>(&self, request: &AuthRequest<'a>) -> Result<&'a str, AuthError> {
        preflight(
            request,
            self.require_secure_transport,
            self.trust_forwarded_proto,
        )
    }

    /// Authenticate `request`.
    pub async fn authenticate(&self, request: &AuthRequest<'_>) -> AuthOutcome {
        try_authenticate(
            request,
            self.require_secure_transport,
            self.trust_forwarded_proto,
            |raw| self.scheme.parse(raw),
            |header, request| self.scheme.verify(header, request),
        )
        .await
    }

    /// The `WWW-Authenticate` value for a failed attempt.
    #[must_use]
    pub fn challenge(&self, stale: bool) -> String {
        self.scheme.challenge(stale)
    }
}
