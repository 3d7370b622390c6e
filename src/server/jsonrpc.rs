//! JSON-RPC 2.0 message handling shared by the transports
//!
//! One message in, at most one response out. Notifications (no `id`) are
//! processed and never answered.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::AuthMode;
use crate::tools::ToolRegistry;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Routes JSON-RPC methods to the tool registry
pub struct RpcHandler {
    registry: Arc<ToolRegistry>,
}

impl RpcHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one message as received off the wire; invalid UTF-8 is a
    /// parse error like any other unreadable payload.
    pub async fn handle_bytes(&self, raw: &[u8]) -> Option<RpcResponse> {
        match std::str::from_utf8(raw) {
            Ok(raw) => self.handle_message(raw).await,
            Err(e) => {
                debug!("JSON-RPC message is not UTF-8: {}", e);
                Some(RpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"))
            }
        }
    }

    /// Handle one raw message. `None` means nothing is sent back.
    pub async fn handle_message(&self, raw: &str) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable JSON-RPC message: {}", e);
                return Some(RpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"));
            }
        };
        self.handle_value(value).await
    }

    pub async fn handle_value(&self, value: Value) -> Option<RpcResponse> {
        // A present `id`, even null, expects a reply; only a missing one
        // makes a notification
        let raw_id = value.get("id").cloned();

        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                debug!("Invalid JSON-RPC request: {}", e);
                return Some(RpcResponse::failure(
                    raw_id.unwrap_or(Value::Null),
                    INVALID_REQUEST,
                    "Invalid Request",
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::failure(
                raw_id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        let Some(id) = raw_id else {
            self.handle_notification(&request.method);
            return None;
        };

        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err((code, message)) => RpcResponse::failure(id, code, message),
        })
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => debug!("Client initialized"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.definitions() })),
            "tools/call" => self.call_tool(params).await,
            other => {
                debug!(method = other, "Unknown method");
                Err((METHOD_NOT_FOUND, format!("Method not found: {}", other)))
            }
        }
    }

    fn initialize(&self) -> Value {
        let instructions = match self.registry.mode() {
            AuthMode::Explicit => {
                "Personal task list. Every task tool takes the user's password; the same password always reaches the same tasks. Use setup_password to check a password first."
            }
            AuthMode::Cached => {
                "Personal task list. Run activate_account once with the user's password; after that task tools need no password on this device."
            }
        };

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": instructions,
        })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, (i64, String)> {
        let params: CallParams = serde_json::from_value(params).map_err(|_| {
            (
                INVALID_PARAMS,
                "Invalid params: expected {name, arguments}".to_string(),
            )
        })?;

        match self.registry.call(&params.name, params.arguments).await {
            Ok(result) => serde_json::to_value(result).map_err(|e| {
                warn!("Failed to encode tool result: {}", e);
                (-32603, "Internal error".to_string())
            }),
            Err(e) => Err((e.rpc_code(), e.user_message())),
        }
    }
}
