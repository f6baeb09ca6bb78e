//! MCP protocol types and JSON-RPC 2.0 primitives
//!
//! This module defines the wire types used by the session: the outbound
//! request envelope, the JSON-RPC error object, and the payloads of the three
//! methods the client speaks (`initialize`, `tools/list`, `tools/call`).
//! Struct fields are `camelCase` on the wire via
//! `#[serde(rename_all = "camelCase")]`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol version constants
// ---------------------------------------------------------------------------

/// Protocol revision announced in the `initialize` handshake.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// JSON-RPC version string carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// JSON-RPC method constants
// ---------------------------------------------------------------------------

/// Lifecycle: client sends `initialize` to open a session.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Request the list of available tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Invoke a tool by name.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC internal error code, used when the server sends an `error` value
/// that is not a well-formed error object.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC envelopes
// ---------------------------------------------------------------------------

/// Outbound JSON-RPC 2.0 request envelope.
///
/// # Examples
///
/// ```
/// use snowmcp::mcp::types::JsonRpcRequest;
///
/// let req = JsonRpcRequest::new(0, "tools/list", serde_json::json!({}));
/// let json = serde_json::to_value(&req).unwrap();
/// assert_eq!(json["jsonrpc"], "2.0");
/// assert_eq!(json["id"], 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Request correlation identifier.
    pub id: u64,
    /// The method name to invoke.
    pub method: String,
    /// Method parameters.
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Builds a request envelope for `method` with the given id and params.
    pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code as defined by JSON-RPC 2.0 or the server.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Interprets an arbitrary `error` value from a response envelope.
    ///
    /// Well-formed objects are decoded as-is. Anything else is reported with
    /// [`INTERNAL_ERROR_CODE`] and the raw value as the message.
    ///
    /// # Examples
    ///
    /// ```
    /// use snowmcp::mcp::types::JsonRpcError;
    ///
    /// let e = JsonRpcError::from_value(&serde_json::json!("denied"));
    /// assert_eq!(e.code, -32603);
    /// assert_eq!(e.message, "denied");
    /// ```
    pub fn from_value(value: &serde_json::Value) -> Self {
        match serde_json::from_value::<JsonRpcError>(value.clone()) {
            Ok(e) => e,
            Err(_) => JsonRpcError {
                code: INTERNAL_ERROR_CODE,
                message: match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                },
                data: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// initialize
// ---------------------------------------------------------------------------

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol revision the client speaks.
    pub protocol_version: String,
}

/// Server identity reported by `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server implementation name.
    #[serde(default = "unknown")]
    pub name: String,
    /// Server implementation version.
    #[serde(default = "unknown")]
    pub version: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// The subset of the `initialize` result the client inspects.
///
/// Some servers report their identity under `server_info` instead of the
/// camelCase `serverInfo`; both spellings are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol revision selected by the server, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Server identity, when reported.
    #[serde(
        default,
        alias = "server_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_info: Option<ServerInfo>,
}

// ---------------------------------------------------------------------------
// tools/list and tools/call
// ---------------------------------------------------------------------------

/// A remote operation advertised by the server via `tools/list`.
///
/// # Examples
///
/// ```
/// use snowmcp::mcp::types::Capability;
///
/// let cap: Capability = serde_json::from_value(serde_json::json!({
///     "name": "search",
///     "description": "Search sales data",
///     "inputSchema": { "type": "object" }
/// }))
/// .unwrap();
/// assert_eq!(cap.name, "search");
/// assert!(cap.output_schema.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Unique name of the capability within the server.
    pub name: String,
    /// Human-readable description of the capability's purpose.
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the input arguments.
    #[serde(default)]
    pub input_schema: serde_json::Value,
    /// JSON Schema describing the output, when advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
}

/// Result payload of `tools/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Capabilities in server order.
    #[serde(default)]
    pub tools: Vec<Capability>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the capability to invoke.
    pub name: String,
    /// Arguments matching the capability's input schema.
    pub arguments: serde_json::Value,
}
