use super::*;
use crate::error::NETWORK_UNAVAILABLE;
use crate::test_support::{AuthMode, BEARER, MockServer, dead_base_url};

#[tokio::test]
async fn rejection_carries_extracted_message() {
    let server = MockServer::start(AuthMode::Bearer).await;
    let transport = Transport::new(server.config()).unwrap();

    let err = transport.send(transport.request(Method::GET, "/auth/me", None)).await.unwrap_err();

    assert_eq!(err, AuthError::Rejected { status: 401, message: "Unauthorized".into() });
}

#[tokio::test]
async fn bearer_header_is_attached() {
    let server = MockServer::start(AuthMode::Bearer).await;
    let transport = Transport::new(server.config()).unwrap();

    let value: serde_json::Value =
        transport.send_json(transport.request(Method::GET, "/auth/me", Some(BEARER))).await.unwrap();

    assert_eq!(value["name"], "Ann");
}

#[tokio::test]
async fn plain_text_error_body_becomes_message() {
    let server = MockServer::start(AuthMode::Bearer).await;
    server.state.fail_logout.store(true, std::sync::atomic::Ordering::SeqCst);
    let transport = Transport::new(server.config()).unwrap();

    let err = transport.send_empty(transport.request(Method::POST, "/auth/logout", None)).await.unwrap_err();

    assert_eq!(err.message(), "boom");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn unknown_route_uses_generic_message() {
    let server = MockServer::start(AuthMode::Bearer).await;
    let transport = Transport::new(server.config()).unwrap();

    let err = transport.send(transport.request(Method::GET, "/nope", None)).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), REQUEST_FAILED);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let config = ClientConfig::new(&dead_base_url().await).unwrap();
    let transport = Transport::new(config).unwrap();

    let err = transport.send(transport.request(Method::GET, "/auth/me", None)).await.unwrap_err();

    assert_eq!(err, AuthError::Transport { message: NETWORK_UNAVAILABLE.into() });
}

#[tokio::test]
async fn undecodable_body_is_transport_error() {
    let server = MockServer::start(AuthMode::Bearer).await;
    let transport = Transport::new(server.config()).unwrap();

    let result: Result<Vec<u32>, AuthError> =
        transport.send_json(transport.request(Method::GET, "/auth/me", Some(BEARER))).await;

    assert!(matches!(result, Err(AuthError::Transport { .. })));
}

#[tokio::test]
async fn cookies_tracked_and_cleared() {
    let server = MockServer::start(AuthMode::Cookie).await;
    let transport = Transport::new(server.config()).unwrap();
    assert!(!transport.has_session_cookie());

    let login = transport
        .request(Method::POST, "/auth/login", None)
        .json(&serde_json::json!({ "email": "a@x.com", "password": "secret" }));
    transport.send_empty(login).await.unwrap();
    assert!(transport.has_session_cookie());

    transport.send_empty(transport.request(Method::GET, "/auth/me", None)).await.unwrap();

    transport.clear_cookies();
    assert!(!transport.has_session_cookie());
    let err = transport.send_empty(transport.request(Method::GET, "/auth/me", None)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}
