#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use calendar_mcp::components::token_store::MemoryTokenStore;
use calendar_mcp::config::Config;
use calendar_mcp::server::{self, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

pub const BASE_URL: &str = "https://mcp.example.com";

/// Config pointing every Google endpoint at the mock server
pub fn test_config(google: &MockServer) -> Config {
    let mut config = Config::new("test-client-id", "test-client-secret", BASE_URL);
    config.google_auth_uri = format!("{}/o/oauth2/auth", google.uri());
    config.google_token_uri = format!("{}/token", google.uri());
    config.google_api_base = format!("{}/calendar/v3", google.uri());
    config
}

/// Router wired to the mock Google server and the given store
pub fn test_app(google: &MockServer, store: MemoryTokenStore) -> Router {
    test_app_with_config(test_config(google), store)
}

pub fn test_app_with_config(config: Config, store: MemoryTokenStore) -> Router {
    let state =
        AppState::new(Arc::new(config), Arc::new(store)).expect("failed to build app state");
    server::router(state)
}

/// Response pieces the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not JSON")
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// POST a JSON-RPC envelope to /mcp
pub async fn post_mcp(app: &Router, payload: Value) -> TestResponse {
    post_mcp_raw(app, payload.to_string()).await
}

pub async fn post_mcp_raw(app: &Router, body: String) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("failed to build request");
    send(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request");
    send(app, request).await
}
