use serde_json::{json, Value};

pub const LIST_EVENTS: &str = "calendar.list_events";
pub const CREATE_EVENT: &str = "calendar.create_event";
pub const DELETE_EVENT: &str = "calendar.delete_event";

/// Result of `tools/list`. Names and required arguments are a wire contract.
pub fn tool_catalog() -> Value {
    json!({
        "tools": [
            {
                "name": LIST_EVENTS,
                "description": "List upcoming calendar events",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "max_results": {
                            "type": "integer",
                            "default": 10
                        }
                    }
                }
            },
            {
                "name": CREATE_EVENT,
                "description": "Create a calendar event",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "summary": {"type": "string"},
                        "start": {
                            "type": "string",
                            "description": "ISO datetime (2026-01-10T10:00:00)"
                        },
                        "end": {
                            "type": "string",
                            "description": "ISO datetime (2026-01-10T11:00:00)"
                        }
                    },
                    "required": ["summary", "start", "end"]
                }
            },
            {
                "name": DELETE_EVENT,
                "description": "Delete a calendar event by ID",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "event_id": {"type": "string"}
                    },
                    "required": ["event_id"]
                }
            }
        ]
    })
}

/// `tools/call` result carrying structured data
pub fn json_content(value: Value) -> Value {
    json!({"content": [{"type": "json", "json": value}]})
}

/// `tools/call` result carrying a message
pub fn text_content(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}
