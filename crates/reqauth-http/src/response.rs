//! Rejection responses.
//!
//! Failures that the client can fix by authenticating get `401` and a fresh
//! challenge; the rest map to the status that names the problem:
//!
//! | Error | Status |
//! |-------|--------|
//! | `InsecureTransport` | 403 |
//! | `PayloadTooLarge` | 413 |
//! | `BodyTimeout` | 408 |
//! | `BodyRead` | 400 |
//! | `NonceStoreUnavailable` | 503 |
//! | anything else | 401 + `WWW-Authenticate` |

use http::StatusCode;
use reqauth_core::AuthError;

use crate::body::AuthResponseBody;

/// Content type of rejection bodies.
pub const CONTENT_TYPE: &str = "application/json";

/// HTTP status for a failed authentication.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InsecureTransport => StatusCode::FORBIDDEN,
        AuthError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        AuthError::BodyTimeout => StatusCode::REQUEST_TIMEOUT,
        AuthError::BodyRead(_) => StatusCode::BAD_REQUEST,
        AuthError::NonceStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::UNAUTHORIZED,
    }
}

/// Stable error code for a failed authentication.
///
/// Every credential failure shares `Unauthorized` so that responses do not
/// tell an unknown identity apart from a wrong secret or a bad nonce.
#[must_use]
pub fn error_code(error: &AuthError) -> &'static str {
    match error {
        AuthError::InsecureTransport => "InsecureTransport",
        AuthError::PayloadTooLarge(_) => "PayloadTooLarge",
        AuthError::BodyTimeout => "RequestTimeout",
        AuthError::BodyRead(_) => "BadRequest",
        AuthError::NonceStoreUnavailable(_) => "ServiceUnavailable",
        _ => "Unauthorized",
    }
}

/// Serialize a rejection into a JSON body.
///
/// ```json
/// { "error": "PayloadTooLarge", "message": "Request body exceeds 1024 bytes" }
/// ```
///
/// `401` responses carry a generic message.
#[must_use]
pub fn error_to_json(error: &AuthError) -> Vec<u8> {
    let message = if status_for(error) == StatusCode::UNAUTHORIZED {
        "Authentication required".to_owned()
    } else {
        error.to_string()
    };
    serde_json::to_vec(&serde_json::json!({
        "error": error_code(error),
        "message": message,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Build the rejection response for `error`.
///
/// `challenge` is the `WWW-Authenticate` value and is attached to `401`
/// responses only.
#[must_use]
pub fn error_to_response(
    error: &AuthError,
    challenge: &str,
    request_id: &str,
) -> http::Response<AuthResponseBody> {
    let status = status_for(error);
    let mut builder = http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header("x-request-id", request_id);
    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header(http::header::WWW_AUTHENTICATE, challenge);
    }
    builder
        .body(AuthResponseBody::from_bytes(error_to_json(error)))
        .unwrap_or_else(|_| {
            // The challenge or request id was not a valid header value.
            let mut response = http::Response::new(AuthResponseBody::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}
