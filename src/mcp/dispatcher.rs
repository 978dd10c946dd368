use super::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse};
use super::tools::{self, json_content, text_content, tool_catalog};
use crate::components::google_calendar::{Authorized, GoogleCalendar, DEFAULT_MAX_RESULTS};
use crate::config::{SERVER_NAME, SERVER_VERSION};
use crate::error::{invalid_params_error, Error, McpResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
const DELETED_MESSAGE: &str = "🗑️ Event deleted";

#[derive(Debug, Deserialize)]
struct ListEventsArgs {
    #[serde(default)]
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreateEventArgs {
    summary: String,
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct DeleteEventArgs {
    event_id: String,
}

/// What a `tools/call` came to
enum ToolOutcome {
    Content(Value),
    AuthRequired,
    UnknownTool(String),
}

/// Routes RPC envelopes to calendar operations. Holds no per-request state.
#[derive(Clone)]
pub struct Dispatcher {
    calendar: GoogleCalendar,
}

impl Dispatcher {
    pub fn new(calendar: GoogleCalendar) -> Self {
        Self { calendar }
    }

    /// Handle a raw request body; anything that is not JSON gets a parse error
    pub async fn handle_body(&self, body: &[u8]) -> JsonRpcResponse {
        match serde_json::from_slice::<Value>(body) {
            Ok(payload) => self.dispatch(payload).await,
            Err(e) => {
                warn!("Rejected unparseable MCP request: {}", e);
                JsonRpcResponse::error(Value::Null, error_codes::PARSE_ERROR, "Parse error")
            }
        }
    }

    /// Handle one decoded envelope. Always yields a well-formed response.
    pub async fn dispatch(&self, payload: Value) -> JsonRpcResponse {
        let request = match JsonRpcRequest::from_value(payload) {
            Ok(request) => request,
            Err(response) => return response,
        };

        debug!(
            "MCP request method={:?} id={} user={}",
            request.method, request.id, request.user_id
        );

        match request.method.as_deref() {
            Some("initialize") => {
                JsonRpcResponse::success(request.id.clone(), initialize_result(&request.params))
            }
            Some("tools/list") => JsonRpcResponse::success(request.id.clone(), tool_catalog()),
            Some("tools/call") => self.call_tool(&request).await,
            other => {
                warn!("Unknown MCP method: {:?}", other);
                JsonRpcResponse::method_not_found(request.id.clone())
            }
        }
    }

    async fn call_tool(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.run_tool(request).await {
            Ok(ToolOutcome::Content(result)) => JsonRpcResponse::success(id, result),
            Ok(ToolOutcome::AuthRequired) => self.auth_required(id, &request.user_id),
            Ok(ToolOutcome::UnknownTool(name)) => {
                warn!("Unknown tool: {}", name);
                JsonRpcResponse::method_not_found(id)
            }
            Err(e) => error_response(id, &e),
        }
    }

    async fn run_tool(&self, request: &JsonRpcRequest) -> McpResult<ToolOutcome> {
        let name = request
            .params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params_error("Missing tool name"))?;

        let arguments = match request.params.get("arguments") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => return Err(invalid_params_error("Tool arguments must be an object")),
        };

        let user_id = request.user_id.as_str();
        let outcome = match name {
            tools::LIST_EVENTS => {
                let args: ListEventsArgs = parse_arguments(name, arguments)?;
                let max_results = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
                if max_results == 0 {
                    return Err(invalid_params_error("max_results must be at least 1"));
                }
                self.calendar
                    .list_events(user_id, max_results)
                    .await?
                    .map(|events| json_content(json!(events)))
            }
            tools::CREATE_EVENT => {
                let args: CreateEventArgs = parse_arguments(name, arguments)?;
                self.calendar
                    .create_event(user_id, &args.summary, &args.start, &args.end)
                    .await?
                    .map(|created| json_content(json!(created)))
            }
            tools::DELETE_EVENT => {
                let args: DeleteEventArgs = parse_arguments(name, arguments)?;
                self.calendar
                    .delete_event(user_id, &args.event_id)
                    .await?
                    .map(|()| text_content(DELETED_MESSAGE))
            }
            other => return Ok(ToolOutcome::UnknownTool(other.to_string())),
        };

        Ok(match outcome {
            Authorized::Ready(content) => ToolOutcome::Content(content),
            Authorized::AuthRequired => ToolOutcome::AuthRequired,
        })
    }

    fn auth_required(&self, id: Value, user_id: &str) -> JsonRpcResponse {
        let config = self.calendar.tokens().config();
        JsonRpcResponse::error(
            id,
            error_codes::AUTH_REQUIRED,
            format!(
                "Google Calendar not connected for user '{}'. Visit {}",
                user_id,
                config.auth_start_url(user_id)
            ),
        )
    }
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {"tools": {}},
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
        }
    })
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> McpResult<T> {
    serde_json::from_value(arguments)
        .map_err(|e| invalid_params_error(&format!("Invalid arguments for {}: {}", tool, e)))
}

/// Map an internal error onto the error envelope
fn error_response(id: Value, err: &Error) -> JsonRpcResponse {
    match err {
        Error::InvalidParams(message) => {
            warn!("Rejected tool call: {}", message);
            JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, format!("Invalid params: {}", message))
        }
        e if e.is_retryable() => {
            warn!("Tool call timed out: {}", e);
            JsonRpcResponse::error(id, error_codes::TIMEOUT, format!("{} (retryable)", e))
        }
        e => {
            error!("Tool call failed: {}", e);
            JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::google_calendar::TokenManager;
    use crate::components::token_store::MemoryTokenStore;
    use crate::config::Config;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        let config = Arc::new(Config::new("id", "secret", "https://mcp.example.com"));
        let tokens = TokenManager::new(config, Arc::new(MemoryTokenStore::new()), reqwest::Client::new());
        Dispatcher::new(GoogleCalendar::new(tokens))
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let response = dispatcher()
            .dispatch(json!({"method": "initialize", "id": 1}))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "Multi-User Google Calendar MCP");
        assert_eq!(result["serverInfo"]["version"], "0.1.0");
    }

    #[tokio::test]
    async fn test_tools_list_is_stable() {
        let dispatcher = dispatcher();
        let first = dispatcher.dispatch(json!({"method": "tools/list", "id": 1})).await;
        // Some unrelated traffic in between
        dispatcher
            .dispatch(json!({"method": "tools/call", "id": 2, "params": {"name": "calendar.list_events"}}))
            .await;
        let second = dispatcher.dispatch(json!({"method": "tools/list", "id": 1})).await;

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_method_is_not_found() {
        let response = dispatcher().dispatch(json!({"id": 3})).await;
        assert_eq!(response.error_code(), Some(error_codes::METHOD_NOT_FOUND));
        assert_eq!(response.id, json!(3));
    }

    #[tokio::test]
    async fn test_missing_tool_name_is_invalid_params() {
        let response = dispatcher()
            .dispatch(json!({"method": "tools/call", "id": 4, "params": {}}))
            .await;
        assert_eq!(response.error_code(), Some(error_codes::INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_bad_argument_types_are_invalid_params() {
        let dispatcher = dispatcher();
        for arguments in [json!({"max_results": "ten"}), json!({"max_results": 0}), json!([1])] {
            let response = dispatcher
                .dispatch(json!({
                    "method": "tools/call",
                    "id": 5,
                    "params": {"name": "calendar.list_events", "arguments": arguments}
                }))
                .await;
            assert_eq!(response.error_code(), Some(error_codes::INVALID_PARAMS));
        }
    }

    #[tokio::test]
    async fn test_numeric_user_id_is_rejected_before_any_tool_runs() {
        let response = dispatcher()
            .dispatch(json!({
                "method": "tools/call",
                "id": 8,
                "meta": {"user_id": 42},
                "params": {"name": "calendar.list_events"}
            }))
            .await;
        assert_eq!(response.error_code(), Some(error_codes::INVALID_REQUEST));
        assert_eq!(response.id, json!(8));
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let response = dispatcher()
            .dispatch(json!({"method": "tools/call", "id": 6, "params": {"name": "calendar.nope"}}))
            .await;
        assert_eq!(response.error_code(), Some(error_codes::METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let response = dispatcher().handle_body(b"{not json").await;
        assert_eq!(response.error_code(), Some(error_codes::PARSE_ERROR));
        assert_eq!(response.id, Value::Null);
    }

    #[test]
    fn test_timeout_maps_to_retryable_code() {
        let response = error_response(json!(1), &Error::Timeout("slow".to_string()));
        assert_eq!(response.error_code(), Some(error_codes::TIMEOUT));

        let response = error_response(json!(1), &Error::GoogleCalendar("boom".to_string()));
        assert_eq!(response.error_code(), Some(error_codes::INTERNAL_ERROR));
    }
}
