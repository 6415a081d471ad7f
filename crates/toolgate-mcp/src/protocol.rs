//! JSON-RPC 2.0 wire types for the tool gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only JSON-RPC version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// `tools/call` params have the wrong shape.
pub const INVALID_PARAMS: i64 = -32602;
/// Application error: a tool call could not be completed.
pub const TOOL_CALL_FAILED: i64 = -32000;

/// Method listing every namespaced tool.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Method invoking one namespaced tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC response.
///
/// Exactly one of `result` and `error` is set. `id` echoes the request id and
/// is `null` when the request had none or could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i64, message: &str, data: impl Into<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: Some(Value::String(data.into())),
        }
    }

    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, "Parse error", detail)
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request", detail)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found", format!("Unknown method: {method}"))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, "Invalid params", detail)
    }

    pub fn tool_call_failed(reason: impl Into<String>) -> Self {
        Self::new(TOOL_CALL_FAILED, "Tool call failed", reason)
    }
}

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Namespaced name, `<provider>__<tool>`.
    pub name: String,
    /// Description prefixed with the provider's display name.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: Value,
}

/// `tools/list` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<McpTool>,
}

/// `tools/call` params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallToolParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
    /// Per-call credential bag; never logged.
    #[serde(default, rename = "_credentials")]
    pub credentials: Option<Map<String, Value>>,
}
