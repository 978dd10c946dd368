//! JSON-RPC 2.0 envelope types for the `/mcp` endpoint

use crate::config::DEFAULT_USER_ID;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes plus the ones this server adds
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Application-specific
    pub const TIMEOUT: i64 = -32000;
    pub const AUTH_REQUIRED: i64 = 401;
}

/// Inbound request, already picked apart
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    pub id: Value,
    pub method: Option<String>,
    pub params: Value,
    /// Caller identity from `meta.user_id` (or `params._meta.user_id`)
    pub user_id: String,
}

impl JsonRpcRequest {
    /// Extract the envelope fields. A non-object payload or a malformed
    /// identity is rejected; a missing method is left for the dispatcher.
    pub fn from_value(payload: Value) -> Result<Self, JsonRpcResponse> {
        let Value::Object(mut fields) = payload else {
            return Err(JsonRpcResponse::error(
                Value::Null,
                error_codes::INVALID_REQUEST,
                "Invalid Request",
            ));
        };

        let id = fields.remove("id").unwrap_or(Value::Null);
        let method = fields
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);
        let params = fields.remove("params").unwrap_or(Value::Null);

        // A malformed identity must never fall back to the default user's credentials
        let user_id = match meta_user_id(fields.get("meta")).and_then(|user_id| match user_id {
            Some(user_id) => Ok(Some(user_id)),
            None => meta_user_id(params.get("_meta")),
        }) {
            Ok(user_id) => user_id.unwrap_or(DEFAULT_USER_ID).to_string(),
            Err(message) => {
                return Err(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid Request: {}", message),
                ))
            }
        };

        Ok(Self {
            id,
            method,
            params,
            user_id,
        })
    }
}

/// `user_id` inside a meta object. Absent, null or empty means "not given";
/// any other non-string value is an error.
fn meta_user_id(meta: Option<&Value>) -> Result<Option<&str>, &'static str> {
    let meta = match meta {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(meta)) => meta,
        Some(_) => return Err("meta must be an object"),
    };
    match meta.get("user_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(user_id)) if user_id.is_empty() => Ok(None),
        Some(Value::String(user_id)) => Ok(Some(user_id.as_str())),
        Some(_) => Err("user_id must be a string"),
    }
}

/// JSON-RPC 2.0 response; exactly one of `result` and `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn method_not_found(id: Value) -> Self {
        Self::error(id, error_codes::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}
