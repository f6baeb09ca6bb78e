//! Stateful JSON-RPC session against one MCP server endpoint
//!
//! [`RpcSession`] owns the access token, the request-id counter and the
//! capability registry. Every call is a single HTTP POST carrying one
//! JSON-RPC envelope; requests are never pipelined.
//!
//! # Request-id discipline
//!
//! `next_id` starts at 0 and advances by exactly one after a request/response
//! pair completes, whether the server answered with a `result` or an `error`.
//! A reply carrying neither is a completed pair that fails.
//! Failures before a JSON body is read (network errors, non-2xx statuses,
//! undecodable bodies) leave it unchanged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Result, SnowmcpError};
use crate::mcp::auth::flow::AccessToken;
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::types::{
    CallToolParams, Capability, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    ListToolsResult, ServerInfo, INTERNAL_ERROR_CODE, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};

/// Header naming the kind of credential in `Authorization`.
pub const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Header selecting the role the session acts as.
pub const ROLE_HEADER: &str = "X-Snowflake-Role";

/// Default bound on a single `tools/call` round trip.
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// A JSON-RPC session with an MCP server.
///
/// Methods take `&mut self`: one request is in flight at a time and the
/// counter and registry are never shared.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use url::Url;
/// use snowmcp::mcp::auth::flow::AccessToken;
/// use snowmcp::mcp::session::RpcSession;
/// use snowmcp::mcp::types::DEFAULT_PROTOCOL_VERSION;
///
/// # async fn example() -> snowmcp::error::Result<()> {
/// let mut session = RpcSession::new(
///     Arc::new(reqwest::Client::new()),
///     Url::parse("https://acme.snowflakecomputing.com/api/v2/databases/DB/schemas/S/mcp-servers/M")?,
///     AccessToken::new("tok123", Some(600)),
///     "ANALYST",
/// );
///
/// session.initialize(DEFAULT_PROTOCOL_VERSION).await?;
/// for capability in session.discover_capabilities().await? {
///     println!("{}", capability.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RpcSession {
    http: Arc<reqwest::Client>,
    endpoint: Url,
    token: AccessToken,
    headers: HashMap<String, String>,
    next_id: u64,
    registry: CapabilityRegistry,
    server_info: Option<ServerInfo>,
    default_timeout: Option<Duration>,
    invoke_timeout: Duration,
}

impl RpcSession {
    /// Creates a session for `endpoint` acting as `role`.
    ///
    /// No network I/O happens until [`initialize`](Self::initialize).
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client
    /// * `endpoint` - MCP server URL every request is POSTed to
    /// * `token` - Bearer token from the OAuth flow
    /// * `role` - Value of the role selection header
    pub fn new(
        http: Arc<reqwest::Client>,
        endpoint: Url,
        token: AccessToken,
        role: impl Into<String>,
    ) -> Self {
        let mut headers = HashMap::new();
        headers.insert(TOKEN_TYPE_HEADER.to_string(), "OAUTH".to_string());
        headers.insert(ROLE_HEADER.to_string(), role.into());

        Self {
            http,
            endpoint,
            token,
            headers,
            next_id: 0,
            registry: CapabilityRegistry::default(),
            server_info: None,
            default_timeout: None,
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
        }
    }

    /// Bounds `initialize` and `tools/list`, which are unbounded by default.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Overrides the `tools/call` bound.
    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    /// Adds or replaces a fixed header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The MCP endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The id the next request will carry.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// The bearer token this session presents.
    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    /// Capabilities from the most recent discovery.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Server identity reported by `initialize`, if any.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Performs the `initialize` handshake.
    ///
    /// Records the server identity when the result carries one and returns
    /// the raw result.
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::TransportError`] on a non-2xx status,
    /// [`SnowmcpError::RpcProtocolError`] when the server answers with an
    /// `error` or without a `result`, or [`SnowmcpError::Http`] if the request
    /// cannot be sent.
    pub async fn initialize(&mut self, protocol_version: &str) -> Result<Value> {
        let params = serde_json::to_value(InitializeParams {
            protocol_version: protocol_version.to_string(),
        })
        .map_err(SnowmcpError::Serialization)?;

        let result = self
            .call(METHOD_INITIALIZE, params, self.default_timeout)
            .await?;

        match serde_json::from_value::<InitializeResult>(result.clone()) {
            Ok(InitializeResult {
                server_info: Some(info),
                ..
            }) => {
                tracing::info!(
                    server = %info.name,
                    version = %info.version,
                    "MCP session initialized"
                );
                self.server_info = Some(info);
            }
            Ok(_) => tracing::info!("MCP session initialized"),
            Err(e) => tracing::debug!("Unrecognised initialize result: {}", e),
        }

        Ok(result)
    }

    /// Lists the server's capabilities and replaces the registry with them.
    ///
    /// # Errors
    ///
    /// Same as [`initialize`](Self::initialize), plus
    /// [`SnowmcpError::Serialization`] if the result is not a tool list. A
    /// result that cannot be decoded leaves the previous registry in place.
    pub async fn discover_capabilities(&mut self) -> Result<&[Capability]> {
        let result = self
            .call(METHOD_TOOLS_LIST, serde_json::json!({}), self.default_timeout)
            .await?;

        let list: ListToolsResult =
            serde_json::from_value(result).map_err(SnowmcpError::Serialization)?;

        tracing::info!(count = list.tools.len(), "Discovered capabilities");
        self.registry.replace(list.tools);
        Ok(self.registry.list())
    }

    /// Invokes a capability and returns its result verbatim.
    ///
    /// `arguments` is not checked against the capability's input schema;
    /// the server is authoritative. The call is bounded by the invoke
    /// timeout.
    ///
    /// # Errors
    ///
    /// Same as [`initialize`](Self::initialize). A timeout surfaces as
    /// [`SnowmcpError::Http`] and does not advance the request id.
    pub async fn invoke_capability(&mut self, name: &str, arguments: Value) -> Result<Value> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(SnowmcpError::Serialization)?;

        tracing::info!(capability = name, "Invoking capability");
        self.call(METHOD_TOOLS_CALL, params, Some(self.invoke_timeout))
            .await
    }

    /// Sends one envelope and interprets the reply.
    async fn call(
        &mut self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let id = self.next_id;
        let request = JsonRpcRequest::new(id, method, params);
        tracing::debug!(id, method, "Sending MCP request");

        let mut req = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.token.value())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request);
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::error!(id, method, "MCP request failed: {}", e);
            SnowmcpError::Http(e)
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(SnowmcpError::Http)?;

        if !status.is_success() {
            tracing::error!(id, method, status = status.as_u16(), "MCP request rejected");
            return Err(SnowmcpError::TransportError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let envelope: Value = serde_json::from_str(&body).map_err(SnowmcpError::Serialization)?;

        // The pair is complete from here on, error or not.
        self.next_id += 1;

        let response_id = envelope.get("id").and_then(Value::as_u64);
        if response_id != Some(id) {
            tracing::warn!(
                expected = id,
                received = ?envelope.get("id"),
                "MCP response id does not match request id"
            );
        }

        if let Some(error) = envelope.get("error") {
            let error = JsonRpcError::from_value(error);
            tracing::debug!(id, method, code = error.code, "MCP server returned an error");
            return Err(SnowmcpError::RpcProtocolError {
                code: error.code,
                message: error.message,
            }
            .into());
        }

        match envelope.get("result") {
            Some(result) => Ok(result.clone()),
            None => {
                tracing::warn!(id, method, "MCP response has neither result nor error");
                Err(SnowmcpError::RpcProtocolError {
                    code: INTERNAL_ERROR_CODE,
                    message: "response has neither result nor error".to_string(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> RpcSession {
        RpcSession::new(
            Arc::new(reqwest::Client::new()),
            Url::parse("http://127.0.0.1:9/mcp").unwrap(),
            AccessToken::new("tok", None),
            "ANALYST",
        )
    }

    #[test]
    fn test_new_session_starts_at_zero_and_empty() {
        let session = make_session();
        assert_eq!(session.next_id(), 0);
        assert!(session.capabilities().is_empty());
        assert!(session.server_info().is_none());
        assert_eq!(session.invoke_timeout, DEFAULT_INVOKE_TIMEOUT);
        assert!(session.default_timeout.is_none());
    }

    #[test]
    fn test_new_session_sets_service_headers() {
        let session = make_session();
        assert_eq!(
            session.headers.get(TOKEN_TYPE_HEADER).map(String::as_str),
            Some("OAUTH")
        );
        assert_eq!(
            session.headers.get(ROLE_HEADER).map(String::as_str),
            Some("ANALYST")
        );
    }

    #[test]
    fn test_builders_override_timeouts_and_headers() {
        let session = make_session()
            .with_default_timeout(Duration::from_secs(5))
            .with_invoke_timeout(Duration::from_secs(7))
            .with_header(ROLE_HEADER, "PUBLIC");
        assert_eq!(session.default_timeout, Some(Duration::from_secs(5)));
        assert_eq!(session.invoke_timeout, Duration::from_secs(7));
        assert_eq!(
            session.headers.get(ROLE_HEADER).map(String::as_str),
            Some("PUBLIC")
        );
    }

    #[tokio::test]
    async fn test_network_failure_keeps_next_id() {
        // Port 9 (discard) on loopback is not listening in test environments.
        let mut session = make_session();
        let result = session.initialize("2025-06-18").await;
        assert!(result.is_err());
        assert_eq!(session.next_id(), 0);
    }
}
