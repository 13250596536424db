//! Hmac request signing through the HTTP middleware.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use http::StatusCode;
    use reqauth_core::config::AuthConfig;
    use reqauth_core::{AuthRequest, AuthorizationHeaderBuilder, StaticSecretResolver};
    use reqauth_hmac::{HmacAuthenticator, HmacBuilder};
    use reqauth_http::AuthService;

    use crate::{
        Echo, HMAC_CLIENT, hmac_request, hmac_service, now_stamp, request, send, test_config,
        with_authorization,
    };

    const URI: &str = "https://api.example.com/orders?b=2&a=1";

    #[tokio::test]
    async fn test_should_authenticate_signed_request() {
        let service = hmac_service(&test_config());
        let date = now_stamp();
        let signed = hmac_request(
            "POST",
            URI,
            &[("date", date.as_str())],
            b"{\"qty\":1}",
            HMAC_CLIENT.1,
            &["host", "date"],
        );

        let reply = send(&service, signed).await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.principal(), Some("HMAC-SHA256:client-1"));
        assert_eq!(reply.json["body"], "{\"qty\":1}");
    }

    #[tokio::test]
    async fn test_should_challenge_with_scheme_token_only() {
        let service = hmac_service(&test_config());
        let reply = send(&service, request("GET", URI, b"")).await.unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.challenge(), Some("HMAC-SHA256"));
    }

    #[tokio::test]
    async fn test_should_scope_signature_to_signed_headers() {
        let service = hmac_service(&test_config());
        let date = now_stamp();
        let signed = hmac_request(
            "GET",
            URI,
            &[("date", date.as_str()), ("x-tenant", "acme"), ("x-trace", "1")],
            b"",
            HMAC_CLIENT.1,
            &["host", "date", "x-tenant"],
        );
        let raw = signed
            .headers()
            .get(http::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();

        let resend = |tenant: &'static str, trace: &'static str| {
            let mut req = with_authorization(request("GET", URI, b""), &raw);
            let headers = req.headers_mut();
            headers.insert("date", date.parse().unwrap());
            headers.insert("x-tenant", http::HeaderValue::from_static(tenant));
            headers.insert("x-trace", http::HeaderValue::from_static(trace));
            req
        };

        let trace_changed = send(&service, resend("acme", "2")).await.unwrap();
        assert_eq!(trace_changed.status, StatusCode::OK);

        let tenant_changed = send(&service, resend("evil", "1")).await.unwrap();
        assert_eq!(tenant_changed.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_tampered_body() {
        let service = hmac_service(&test_config());
        let date = now_stamp();
        let signed = hmac_request(
            "PUT",
            URI,
            &[("date", date.as_str())],
            b"original",
            HMAC_CLIENT.1,
            &["host", "date"],
        );
        let (parts, _) = signed.into_parts();
        let tampered = http::Request::from_parts(
            parts,
            http_body_util::Full::new(bytes::Bytes::from_static(b"modified")),
        );

        let reply = send(&service, tampered).await.unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_stale_timestamp() {
        let service = hmac_service(&test_config());
        let old = reqauth_hmac::signing::format_timestamp(
            &(chrono::Utc::now() - chrono::Duration::minutes(10)),
        );
        let signed = hmac_request(
            "GET",
            URI,
            &[("date", old.as_str())],
            b"",
            HMAC_CLIENT.1,
            &["host", "date"],
        );

        let reply = send(&service, signed).await.unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_not_reveal_whether_client_exists() {
        let service = hmac_service(&test_config());
        let date = now_stamp();

        let wrong_secret = hmac_request(
            "GET",
            URI,
            &[("date", date.as_str())],
            b"",
            "guess",
            &["host", "date"],
        );
        let a = send(&service, wrong_secret).await.unwrap();

        let headers = [("date", date.as_str())];
        let signed = hmac_request("GET", URI, &headers, b"", "x", &["host", "date"]);
        let raw = signed
            .headers()
            .get(http::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .replace("client-1", "client-9");
        let mut unknown = with_authorization(request("GET", URI, b""), &raw);
        unknown.headers_mut().insert("date", date.parse().unwrap());
        let b = send(&service, unknown).await.unwrap();

        assert_eq!(a.status, StatusCode::UNAUTHORIZED);
        assert_eq!(a.status, b.status);
        assert_eq!(a.json, b.json);
    }

    #[tokio::test]
    async fn test_should_follow_environment_configuration() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AUTH_REQUIRE_SECURE_TRANSPORT", "false"),
            ("AUTH_CREDENTIAL_DELIMITER", ","),
            ("HMAC_SCHEME", "ACME-HMAC"),
            ("HMAC_ALGORITHM", "SHA-512-256"),
            ("HMAC_TIMESTAMP_HEADER", "x-acme-date"),
            ("HMAC_DEFAULT_SIGNED_HEADERS", "host;x-acme-date"),
        ]);
        let config: AuthConfig =
            AuthConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned())).unwrap();

        let resolver = StaticSecretResolver::new(vec![(
            HMAC_CLIENT.0.to_owned(),
            HMAC_CLIENT.1.to_owned(),
        )]);
        let scheme = HmacAuthenticator::new(&config.hmac, Arc::new(resolver)).unwrap();
        let service = AuthService::from_config(Echo, scheme, &config);

        let (parts, body) = http::Request::builder()
            .method("GET")
            .uri("/orders")
            .header("host", "api.example.com")
            .header("x-acme-date", now_stamp())
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .unwrap()
            .into_parts();
        let header = HmacBuilder::from_config(&config.hmac)
            .unwrap()
            .client_id(HMAC_CLIENT.0)
            .credential_scope("orders")
            .sign(HMAC_CLIENT.1, &AuthRequest::new(&parts, b""))
            .unwrap()
            .build()
            .unwrap();
        let compact = header.to_string().replace(", ", ",");
        let request = with_authorization(http::Request::from_parts(parts, body), &compact);

        let reply = send(&service, request).await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.principal(), Some("ACME-HMAC:client-1"));
    }
}
