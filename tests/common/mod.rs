use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;
use wiremock::MockServer;

use snowmcp::mcp::auth::flow::AccessToken;
use snowmcp::mcp::session::RpcSession;

pub const TEST_TOKEN: &str = "tok123";
pub const TEST_ROLE: &str = "ANALYST";

/// A session pointed at `{server}/mcp` with the test token and role.
#[allow(dead_code)]
pub fn mcp_session(server: &MockServer) -> RpcSession {
    let endpoint = Url::parse(&format!("{}/mcp", server.uri())).expect("valid mock URL");
    RpcSession::new(
        Arc::new(reqwest::Client::new()),
        endpoint,
        AccessToken::new(TEST_TOKEN, Some(600)),
        TEST_ROLE,
    )
}

/// A JSON-RPC success envelope.
#[allow(dead_code)]
pub fn rpc_result(id: u64, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// A JSON-RPC error envelope.
#[allow(dead_code)]
pub fn rpc_error(id: u64, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// A `tools/list` result advertising the given capability names.
#[allow(dead_code)]
pub fn tools_result(names: &[&str]) -> Value {
    let tools: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "description": format!("{name} capability"),
                "inputSchema": { "type": "object" }
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("snowmcp.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
