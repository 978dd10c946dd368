use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::config::DEFAULT_USER_ID;
use crate::error::Error;
use crate::mcp::{error_codes, JsonRpcResponse};

const SUPPORTED_PROVIDER: &str = "google";

#[derive(Debug, Deserialize)]
pub struct AuthStartQuery {
    pub user_id: Option<String>,
}

/// Liveness probe
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "Calendar MCP running"}))
}

/// Send the user to the provider's consent page
pub async fn auth_start_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<AuthStartQuery>,
) -> Response {
    if provider != SUPPORTED_PROVIDER {
        return unsupported_provider(&provider);
    }

    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    match state.tokens.build_authorization_url(&user_id) {
        Ok(url) => {
            info!("Starting Google authorization for user '{}'", user_id);
            Redirect::temporary(url.as_str()).into_response()
        }
        Err(e) => auth_failure(e),
    }
}

/// OAuth redirect target. Without a code or a provider error it just reports
/// that it is still waiting.
pub async fn auth_callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    if provider != SUPPORTED_PROVIDER {
        return unsupported_provider(&provider);
    }

    let query = query.unwrap_or_default();
    let has_outcome = url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| (key == "code" || key == "error") && !value.is_empty());
    if !has_outcome {
        return Json(json!({"status": "waiting for google authorization"})).into_response();
    }

    let callback_url = format!("{}?{}", state.config.redirect_uri(), query);
    match state.tokens.complete_authorization(&callback_url).await {
        Ok((user_id, _)) => Json(json!({
            "status": "calendar connected successfully",
            "user": user_id,
        }))
        .into_response(),
        Err(e) => auth_failure(e),
    }
}

/// JSON-RPC endpoint
pub async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let response = state.dispatcher.handle_body(&body).await;
    (status_for(&response), Json(response)).into_response()
}

/// HTTP status carrying an RPC response
pub fn status_for(response: &JsonRpcResponse) -> StatusCode {
    match response.error_code() {
        None | Some(error_codes::AUTH_REQUIRED) => StatusCode::OK,
        Some(
            error_codes::METHOD_NOT_FOUND
            | error_codes::INVALID_PARAMS
            | error_codes::INVALID_REQUEST
            | error_codes::PARSE_ERROR,
        ) => StatusCode::BAD_REQUEST,
        Some(error_codes::TIMEOUT) => StatusCode::GATEWAY_TIMEOUT,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn unsupported_provider(provider: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "error": format!("Unsupported provider '{}'", provider),
        })),
    )
        .into_response()
}

fn auth_failure(err: Error) -> Response {
    error!("Google authorization failed: {}", err);
    let status = match &err {
        Error::OAuth(_) => StatusCode::BAD_GATEWAY,
        e if e.is_retryable() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({"status": "error", "error": err.to_string()})),
    )
        .into_response()
}
