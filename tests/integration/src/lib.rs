//! End-to-end tests for reqauth.
//!
//! Requests are fed straight into [`AuthService`] in process; the inner
//! service echoes the authenticated principal and the body it received.
//!
//! ```text
//! cargo test -p reqauth-integration
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Once};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use reqauth_core::config::AuthConfig;
use reqauth_core::{
    AuthRequest, AuthorizationHeaderBuilder, HashAlgorithm, Principal, StaticSecretResolver,
};
use reqauth_digest::{DigestAuthenticator, DigestBuilder, DigestChallenge, InMemoryNonceTracker};
use reqauth_digest::{NonceCount, Qop};
use reqauth_hmac::{HmacAuthenticator, HmacBuilder};
use reqauth_http::AuthService;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Digest user known to the test services.
pub const DIGEST_USER: (&str, &str) = ("Mufasa", "Circle Of Life");

/// Hmac client known to the test services.
pub const HMAC_CLIENT: (&str, &str) = ("client-1", "s3cr3t");

/// Inner service answering `{"principal": "...", "body": "..."}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Service<http::Request<Full<Bytes>>> for Echo {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Full<Bytes>>) -> Self::Future {
        Box::pin(async move {
            let principal = req
                .extensions()
                .get::<Principal>()
                .map(ToString::to_string);
            let body = req.into_body().collect().await?.to_bytes();
            let json = serde_json::json!({
                "principal": principal,
                "body": String::from_utf8_lossy(&body),
            });
            Ok(http::Response::new(Full::new(Bytes::from(json.to_string()))))
        })
    }
}

/// Configuration shared by the tests.
#[must_use]
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.digest.realm = "testrealm@host.com".to_owned();
    config.max_body_size = 1024;
    config
}

/// Digest-protected [`Echo`].
#[must_use]
pub fn digest_service(config: &AuthConfig) -> AuthService<Echo, DigestAuthenticator> {
    init_tracing();

    let resolver = StaticSecretResolver::new(vec![(
        DIGEST_USER.0.to_owned(),
        DIGEST_USER.1.to_owned(),
    )]);
    let tracker = InMemoryNonceTracker::new(config.digest.tracker_ttl());
    let scheme = DigestAuthenticator::new(&config.digest, Arc::new(resolver), Arc::new(tracker))
        .expect("digest configuration is valid");
    AuthService::from_config(Echo, scheme, config)
}

/// Hmac-protected [`Echo`].
#[must_use]
pub fn hmac_service(config: &AuthConfig) -> AuthService<Echo, HmacAuthenticator> {
    init_tracing();

    let resolver = StaticSecretResolver::new(vec![(
        HMAC_CLIENT.0.to_owned(),
        HMAC_CLIENT.1.to_owned(),
    )]);
    let scheme = HmacAuthenticator::new(&config.hmac, Arc::new(resolver))
        .expect("hmac configuration is valid");
    AuthService::from_config(Echo, scheme, config)
}

/// A collected response.
#[derive(Debug)]
pub struct Reply {
    /// Response status.
    pub status: http::StatusCode,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// Parsed JSON body, `Null` when empty.
    pub json: serde_json::Value,
}

impl Reply {
    /// The `WWW-Authenticate` header, if present.
    #[must_use]
    pub fn challenge(&self) -> Option<&str> {
        self.headers
            .get(http::header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
    }

    /// The Digest challenge carried by this reply.
    #[must_use]
    pub fn digest_challenge(&self) -> DigestChallenge {
        self.challenge()
            .and_then(DigestChallenge::parse)
            .expect("reply carries a Digest challenge")
    }

    /// The principal echoed by [`Echo`].
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.json["principal"].as_str()
    }
}

/// Send `request` through `service` and collect the reply.
pub async fn send<S>(service: &S, request: http::Request<Full<Bytes>>) -> anyhow::Result<Reply>
where
    S: Service<
            http::Request<Full<Bytes>>,
            Response = reqauth_http::AuthServiceResponse<Full<Bytes>>,
            Error = Infallible,
        >,
{
    let response = service.call(request).await?;
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read response body: {e}"))?
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(Reply {
        status: parts.status,
        headers: parts.headers,
        json,
    })
}

/// Build a request without credentials.
#[must_use]
pub fn request(method: &str, uri: &str, body: &'static [u8]) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::HOST, "api.example.com")
        .body(Full::new(Bytes::from_static(body)))
        .expect("valid request")
}

/// Attach an `Authorization` value to `request`.
#[must_use]
pub fn with_authorization(
    mut request: http::Request<Full<Bytes>>,
    value: &str,
) -> http::Request<Full<Bytes>> {
    request.headers_mut().insert(
        http::header::AUTHORIZATION,
        value.parse().expect("valid header value"),
    );
    request
}

/// A Digest client answering challenges with increasing nonce counts.
#[derive(Debug)]
pub struct DigestClient {
    username: String,
    password: String,
    nc: u64,
}

impl DigestClient {
    /// Client for `username` / `password`.
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            nc: 0,
        }
    }

    /// Client for the known test user.
    #[must_use]
    pub fn mufasa() -> Self {
        Self::new(DIGEST_USER.0, DIGEST_USER.1)
    }

    /// Answer `challenge` for `method` and `uri` with the next nonce count.
    pub fn answer(
        &mut self,
        challenge: &DigestChallenge,
        method: &str,
        uri: &str,
        qop: Qop,
        body: &[u8],
    ) -> String {
        self.nc += 1;
        self.answer_with(challenge, method, uri, qop, body, self.nc)
    }

    /// Answer `challenge` with an explicit nonce count.
    #[must_use]
    pub fn answer_with(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        uri: &str,
        qop: Qop,
        body: &[u8],
        nc: u64,
    ) -> String {
        let algorithm = reqauth_core::AlgorithmRegistry::default()
            .resolve(challenge.algorithm())
            .expect("challenge names a known algorithm");
        DigestBuilder::new(algorithm)
            .username(self.username.as_str())
            .realm(challenge.realm())
            .compute_ha1(&self.password)
            .expect("username and realm are set")
            .uri(uri)
            .qop(qop)
            .compute_ha2(method, body)
            .expect("uri and qop are set")
            .nonce(challenge.nonce())
            .nc(&NonceCount::new(nc))
            .cnonce("0a4f113b")
            .opaque(challenge.opaque())
            .compute_response()
            .expect("nonce, nc and cnonce are set")
            .build()
            .expect("all fields are set")
            .to_string()
    }
}

/// Build an Hmac-signed request.
///
/// `headers` are added before signing; `signed` names the headers to sign.
#[must_use]
pub fn hmac_request(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: &'static [u8],
    secret: &str,
    signed: &[&str],
) -> http::Request<Full<Bytes>> {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::HOST, "api.example.com");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder
        .body(Full::new(Bytes::from_static(body)))
        .expect("valid request");

    let (parts, body_full) = request.into_parts();
    let header = HmacBuilder::new("HMAC-SHA256", HashAlgorithm::SHA256)
        .client_id(HMAC_CLIENT.0)
        .credential_scope("20261018/orders")
        .signed_headers(signed)
        .sign(secret, &AuthRequest::new(&parts, body))
        .expect("request carries every signed header")
        .build()
        .expect("all fields are set");
    with_authorization(
        http::Request::from_parts(parts, body_full),
        &header.to_string(),
    )
}

/// The current time as an Hmac timestamp.
#[must_use]
pub fn now_stamp() -> String {
    reqauth_hmac::signing::format_timestamp(&chrono::Utc::now())
}

mod test_digest;
mod test_hmac;
