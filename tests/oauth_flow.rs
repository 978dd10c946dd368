mod support;

use std::collections::HashMap;

use axum::http::{header::LOCATION, StatusCode};
use calendar_mcp::components::token_store::{CredentialRecord, MemoryTokenStore, TokenStore};
use serde_json::json;
use support::{get, post_mcp, test_app};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_token_grant(google: &MockServer, grant: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant))
        .expect(1)
        .mount(google)
        .await;
}

#[tokio::test]
async fn test_auth_start_redirects_to_consent_page() {
    let google = MockServer::start().await;
    let app = test_app(&google, MemoryTokenStore::new());

    let response = get(&app, "/auth/google?user_id=alice").await;

    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers[LOCATION].to_str().unwrap();
    let url = Url::parse(location).unwrap();
    let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert!(location.starts_with(&format!("{}/o/oauth2/auth?", google.uri())));
    assert_eq!(query["state"], "alice");
    assert_eq!(query["access_type"], "offline");
    assert_eq!(query["prompt"], "consent");
    assert_eq!(query["client_id"], "test-client-id");
    assert_eq!(query["redirect_uri"], "https://mcp.example.com/auth/google/callback");
}

#[tokio::test]
async fn test_auth_start_defaults_user() {
    let google = MockServer::start().await;
    let app = test_app(&google, MemoryTokenStore::new());

    let response = get(&app, "/auth/google").await;

    let location = response.headers[LOCATION].to_str().unwrap();
    assert!(location.contains("state=default"), "{}", location);
}

#[tokio::test]
async fn test_unsupported_provider_is_404() {
    let google = MockServer::start().await;
    let app = test_app(&google, MemoryTokenStore::new());

    assert_eq!(get(&app, "/auth/outlook").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        get(&app, "/auth/outlook/callback?code=x").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_callback_without_code_is_waiting() {
    let google = MockServer::start().await;
    let app = test_app(&google, MemoryTokenStore::new());

    let response = get(&app, "/auth/google/callback?state=alice").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"status": "waiting for google authorization"}));
    assert!(google.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_stores_credentials() {
    let google = MockServer::start().await;
    mount_token_grant(
        &google,
        json!({"access_token": "a1", "refresh_token": "r1", "expires_in": 3599}),
    )
    .await;

    let store = MemoryTokenStore::new();
    let app = test_app(&google, store.clone());
    let response = get(&app, "/auth/google/callback?code=auth-code-1&state=alice").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"status": "calendar connected successfully", "user": "alice"})
    );

    let tokens = store.load().await.unwrap();
    assert_eq!(
        tokens.get("alice"),
        Some(&CredentialRecord::new("a1", Some("r1".to_string())))
    );
}

#[tokio::test]
async fn test_reauthorization_keeps_refresh_token() {
    let google = MockServer::start().await;
    mount_token_grant(&google, json!({"access_token": "a2", "expires_in": 3599})).await;

    let store =
        MemoryTokenStore::with_record("alice", CredentialRecord::new("a1", Some("r1".to_string())));
    let app = test_app(&google, store.clone());
    let response = get(&app, "/auth/google/callback?code=auth-code-1&state=alice").await;

    assert_eq!(response.status, StatusCode::OK);
    let tokens = store.load().await.unwrap();
    assert_eq!(
        tokens.get("alice"),
        Some(&CredentialRecord::new("a2", Some("r1".to_string())))
    );
}

#[tokio::test]
async fn test_callback_without_state_uses_default_user() {
    let google = MockServer::start().await;
    mount_token_grant(&google, json!({"access_token": "a1"})).await;

    let store = MemoryTokenStore::new();
    let app = test_app(&google, store.clone());
    let response = get(&app, "/auth/google/callback?code=auth-code-1").await;

    assert_eq!(response.body["user"], "default");
    assert!(store.load().await.unwrap().contains_key("default"));
}

#[tokio::test]
async fn test_rejected_code_is_reported() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&google)
        .await;

    let store = MemoryTokenStore::new();
    let app = test_app(&google, store.clone());
    let response = get(&app, "/auth/google/callback?code=stale&state=alice").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["status"], "error");
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_consent_is_reported() {
    let google = MockServer::start().await;
    let store = MemoryTokenStore::new();
    let app = test_app(&google, store.clone());

    let response = get(&app, "/auth/google/callback?error=access_denied&state=alice").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["status"], "error");
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("access_denied"));
    assert!(google.received_requests().await.unwrap().is_empty());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connected_user_can_call_tools() {
    let google = MockServer::start().await;
    mount_token_grant(&google, json!({"access_token": "a1", "refresh_token": "r1"})).await;
    Mock::given(method("GET"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&google)
        .await;

    let app = test_app(&google, MemoryTokenStore::new());

    let before = post_mcp(
        &app,
        json!({"method": "tools/call", "id": 1, "meta": {"user_id": "dave"},
               "params": {"name": "calendar.list_events"}}),
    )
    .await;
    assert_eq!(before.body["error"]["code"], 401);

    get(&app, "/auth/google/callback?code=auth-code-1&state=dave").await;

    let after = post_mcp(
        &app,
        json!({"method": "tools/call", "id": 2, "meta": {"user_id": "dave"},
               "params": {"name": "calendar.list_events"}}),
    )
    .await;
    assert!(after.body.get("error").is_none(), "{}", after.body);
    assert_eq!(after.body["result"]["content"][0]["json"], json!([]));

    // Other users are still unauthenticated
    let other = post_mcp(
        &app,
        json!({"method": "tools/call", "id": 3, "params": {"name": "calendar.list_events"}}),
    )
    .await;
    assert_eq!(other.body["error"]["code"], 401);
}
