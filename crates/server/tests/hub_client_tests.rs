//! Hub admin client against a mock hub.

use idp_bridge::config::{Environment, HubConfig};
use idp_bridge::error::HubAdminError;
use idp_bridge::hub::HubAdminClient;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HubAdminClient {
    HubAdminClient::new(
        &HubConfig {
            admin_url: server.uri(),
            verify_tls: true,
            timeout_secs: Some(5),
        },
        Environment::Development,
    )
    .expect("hub client")
}

#[tokio::test]
async fn login_request_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/auth/requests/login"))
        .and(query_param("login_challenge", "C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "challenge": "C1",
            "subject": "",
            "skip": false,
            "request_url": "https://hub.example.org/oauth2/auth?client_id=app",
            "requested_scope": ["openid", "A"],
            "client": {"client_id": "app", "client_name": "The App"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = client_for(&server)
        .get_login_request("C1")
        .await
        .expect("login request");
    assert!(!request.skip);
    assert_eq!(request.requested_scope, vec!["openid", "A"]);
    assert_eq!(
        request.client.map(|c| c.client_name).as_deref(),
        Some("The App")
    );
}

#[tokio::test]
async fn accept_login_sends_subject_and_remember() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/oauth2/auth/requests/login/accept"))
        .and(query_param("login_challenge", "C1"))
        .and(body_json(json!({
            "subject": "user-1",
            "remember": true,
            "remember_for": 604800
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"redirect_to": "https://hub.example.org/next"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let completed = client_for(&server)
        .accept_login_request("C1", "user-1", true, 604_800)
        .await
        .expect("accepted");
    assert_eq!(completed.redirect_to, "https://hub.example.org/next");
}

#[tokio::test]
async fn second_reject_of_a_challenge_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/oauth2/auth/requests/login/reject"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"redirect_to": "https://hub.example.org/error"})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/oauth2/auth/requests/login/reject"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "request_conflict",
            "error_description": "The login request was already handled."
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .reject_login_request("C1", "account_locked", "locked")
        .await
        .expect("first reject");

    let err = client
        .reject_login_request("C1", "account_locked", "locked")
        .await
        .expect_err("second reject");
    match &err {
        HubAdminError::Rejected {
            method,
            endpoint,
            status,
            error,
            ..
        } => {
            assert_eq!(*method, "PUT");
            assert_eq!(endpoint, "/oauth2/auth/requests/login/reject");
            assert_eq!(*status, 409);
            assert_eq!(error, "request_conflict");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_hub_outage());
}

#[tokio::test]
async fn server_errors_count_as_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/auth/requests/consent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_consent_request("C2")
        .await
        .expect_err("503");
    assert!(err.is_hub_outage());
    assert_eq!(err.status(), Some(503));
    match err {
        HubAdminError::Rejected { description, .. } => assert_eq!(description, "upstream down"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unparsable_success_body_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/oauth2/auth/requests/logout/accept"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .accept_logout_request("C3")
        .await
        .expect_err("protocol error");
    assert!(matches!(err, HubAdminError::Protocol { method: "PUT", .. }));
    assert!(!err.is_hub_outage());
}

#[tokio::test]
async fn unreachable_hub_is_unavailable() {
    // Bind and drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let client = HubAdminClient::new(
        &HubConfig {
            admin_url: format!("http://127.0.0.1:{port}"),
            verify_tls: true,
            timeout_secs: Some(2),
        },
        Environment::Production,
    )
    .expect("hub client");

    let err = client
        .get_logout_request("C3")
        .await
        .expect_err("connection refused");
    assert!(matches!(err, HubAdminError::Unavailable { method: "GET", .. }));
    assert!(err.is_hub_outage());
    assert_eq!(err.endpoint(), "/oauth2/auth/requests/logout");
}
