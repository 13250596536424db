//! Digest authentication through the HTTP middleware.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use reqauth_core::HashAlgorithm;
    use reqauth_digest::{DigestChallenge, NonceIssuer, Qop};

    use crate::{
        DigestClient, digest_service, request, send, test_config, with_authorization,
    };

    const URI: &str = "https://api.example.com/dir/index.html";
    const TARGET: &str = "/dir/index.html";

    #[tokio::test]
    async fn test_should_complete_challenge_response_handshake() {
        let service = digest_service(&test_config());

        let first = send(&service, request("GET", URI, b"")).await.unwrap();
        assert_eq!(first.status, StatusCode::UNAUTHORIZED);
        let challenge = first.digest_challenge();
        assert_eq!(challenge.realm(), "testrealm@host.com");
        assert_eq!(challenge.algorithm(), "SHA-256");
        assert!(!challenge.stale());
        assert!(
            first
                .challenge()
                .unwrap()
                .contains(r#"qop="auth, auth-int""#)
        );

        let mut client = DigestClient::mufasa();
        let raw = client.answer(&challenge, "GET", TARGET, Qop::Auth, b"");
        let reply = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.principal(), Some("Digest:Mufasa"));
    }

    #[tokio::test]
    async fn test_should_protect_body_with_auth_int() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("POST", URI, b""))
            .await
            .unwrap()
            .digest_challenge();
        let mut client = DigestClient::mufasa();

        let raw = client.answer(&challenge, "POST", TARGET, Qop::AuthInt, b"payload");
        let reply = send(
            &service,
            with_authorization(request("POST", URI, b"payload"), &raw),
        )
        .await
        .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["body"], "payload");

        let raw = client.answer(&challenge, "POST", TARGET, Qop::AuthInt, b"payload");
        let tampered = send(
            &service,
            with_authorization(request("POST", URI, b"payloaD"), &raw),
        )
        .await
        .unwrap();
        assert_eq!(tampered.status, StatusCode::UNAUTHORIZED);
        assert!(!tampered.digest_challenge().stale());
    }

    #[tokio::test]
    async fn test_should_answer_replay_with_stale_challenge() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("GET", URI, b""))
            .await
            .unwrap()
            .digest_challenge();
        let mut client = DigestClient::mufasa();
        let raw = client.answer(&challenge, "GET", TARGET, Qop::Auth, b"");

        let first = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(first.status, StatusCode::OK);

        let replay = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
        let fresh = replay.digest_challenge();
        assert!(fresh.stale());
        assert_ne!(fresh.nonce(), challenge.nonce());

        let next = client.answer(&challenge, "GET", TARGET, Qop::Auth, b"");
        let reply = send(&service, with_authorization(request("GET", URI, b""), &next))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_answer_expired_nonce_with_stale_challenge() {
        let config = test_config();
        let service = digest_service(&config);
        let issuer = NonceIssuer::new(
            HashAlgorithm::SHA256,
            config.digest.nonce_secret.clone(),
            config.digest.etag.clone(),
            config.digest.nonce_ttl(),
        );
        let expired = DigestChallenge::new(
            config.digest.realm.clone(),
            issuer.issue_at(chrono::Utc::now() - chrono::Duration::seconds(120)),
            config.digest.opaque.clone(),
            "SHA-256",
        );

        let mut client = DigestClient::mufasa();
        let raw = client.answer(&expired, "GET", TARGET, Qop::Auth, b"");
        let reply = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert!(reply.challenge().unwrap().contains(r#"stale="true""#));
        let fresh = reply.digest_challenge();
        assert!(fresh.stale());
        assert_ne!(fresh.nonce(), expired.nonce());

        let raw = client.answer(&fresh, "GET", TARGET, Qop::Auth, b"");
        let retried = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(retried.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_accept_parallel_replays_exactly_once() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("GET", URI, b""))
            .await
            .unwrap()
            .digest_challenge();
        let raw = DigestClient::mufasa().answer(&challenge, "GET", TARGET, Qop::Auth, b"");

        let attempts = (0..32).map(|_| {
            let service = service.clone();
            let raw = raw.clone();
            tokio::spawn(async move {
                send(&service, with_authorization(request("GET", URI, b""), &raw))
                    .await
                    .unwrap()
                    .status
            })
        });
        let statuses: Vec<StatusCode> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        let accepted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        assert_eq!(accepted, 1, "{statuses:?}");
        assert!(
            statuses
                .iter()
                .all(|s| *s == StatusCode::OK || *s == StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn test_should_not_reveal_whether_user_exists() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("GET", URI, b""))
            .await
            .unwrap()
            .digest_challenge();

        let wrong_password = DigestClient::new("Mufasa", "Circle of Death")
            .answer(&challenge, "GET", TARGET, Qop::Auth, b"");
        let unknown_user = DigestClient::new("Scar", "Circle Of Life")
            .answer(&challenge, "GET", TARGET, Qop::Auth, b"");

        let a = send(
            &service,
            with_authorization(request("GET", URI, b""), &wrong_password),
        )
        .await
        .unwrap();
        let b = send(
            &service,
            with_authorization(request("GET", URI, b""), &unknown_user),
        )
        .await
        .unwrap();

        assert_eq!(a.status, StatusCode::UNAUTHORIZED);
        assert_eq!(a.status, b.status);
        assert_eq!(a.json, b.json);
        assert!(!a.digest_challenge().stale());
    }

    #[tokio::test]
    async fn test_should_reject_nonce_from_other_server() {
        let other = digest_service(&test_config());
        let foreign = send(&other, request("GET", URI, b""))
            .await
            .unwrap()
            .digest_challenge();

        let service = digest_service(&test_config());
        let raw = DigestClient::mufasa().answer(&foreign, "GET", TARGET, Qop::Auth, b"");
        let reply = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_refuse_algorithm_downgrade() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("GET", URI, b""))
            .await
            .unwrap()
            .digest_challenge();
        let raw = DigestClient::mufasa()
            .answer(&challenge, "GET", TARGET, Qop::Auth, b"")
            .replace("algorithm=SHA-256", "algorithm=MD5");

        let reply = send(&service, with_authorization(request("GET", URI, b""), &raw))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_forbid_plain_http_without_challenge() {
        let service = digest_service(&test_config());
        let reply = send(&service, request("GET", "http://api.example.com/", b""))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert!(reply.challenge().is_none());
        assert_eq!(reply.json["error"], "InsecureTransport");
    }

    #[tokio::test]
    async fn test_should_trust_forwarded_proto_when_configured() {
        let mut config = test_config();
        config.trust_forwarded_proto = true;
        let service = digest_service(&config);

        let mut plain = request("GET", TARGET, b"");
        plain.headers_mut().insert(
            "x-forwarded-proto",
            http::HeaderValue::from_static("https"),
        );
        let reply = send(&service, plain).await.unwrap();
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert!(reply.challenge().is_some());
    }

    #[tokio::test]
    async fn test_should_bound_buffered_body() {
        let service = digest_service(&test_config());
        let challenge = send(&service, request("POST", URI, b""))
            .await
            .unwrap()
            .digest_challenge();
        let body: &'static [u8] = &[b'x'; 2048];
        let raw = DigestClient::mufasa().answer(&challenge, "POST", TARGET, Qop::AuthInt, body);

        let reply = send(&service, with_authorization(request("POST", URI, body), &raw))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(reply.json["error"], "PayloadTooLarge");
    }
}
