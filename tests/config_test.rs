//! Configuration layering tests: file, environment, CLI
//!
//! These tests mutate process environment variables and therefore run
//! serially.

mod common;

use clap::Parser;
use serial_test::serial;

use snowmcp::cli::Cli;
use snowmcp::config::Config;

use common::temp_config_file;

const ENV_VARS: &[&str] = &[
    "SNOWFLAKE_ACCOUNT",
    "OAUTH_CLIENT_ID",
    "OAUTH_CLIENT_SECRET",
    "SNOWFLAKE_DATABASE",
    "SNOWFLAKE_SCHEMA",
    "MCP_SERVER_NAME",
    "SNOWFLAKE_ROLE",
    "SNOWMCP_REDIRECT_URI",
    "SNOWMCP_CALLBACK_TIMEOUT_SECONDS",
    "SNOWMCP_INVOKE_TIMEOUT_SECONDS",
    "SNOWMCP_MODEL",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["snowmcp"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("valid CLI")
}

#[test]
#[serial]
fn test_missing_file_uses_defaults_and_fails_validation() {
    clear_env();
    let config = Config::load("/nonexistent/snowmcp.yaml", &cli(&["tools"])).unwrap();

    assert_eq!(config.snowflake.role, "ACCOUNTADMIN");
    let msg = config.validate().unwrap_err().to_string();
    assert!(msg.contains("SNOWFLAKE_ACCOUNT"));
    assert!(msg.contains("OAUTH_CLIENT_ID"));
    assert!(msg.contains("OAUTH_CLIENT_SECRET"));
}

#[test]
#[serial]
fn test_env_vars_fill_required_values() {
    clear_env();
    std::env::set_var("SNOWFLAKE_ACCOUNT", "myorg-acct");
    std::env::set_var("OAUTH_CLIENT_ID", "client");
    std::env::set_var("OAUTH_CLIENT_SECRET", "secret");
    std::env::set_var("SNOWFLAKE_DATABASE", "DB");
    std::env::set_var("SNOWFLAKE_SCHEMA", "S");
    std::env::set_var("MCP_SERVER_NAME", "M");
    std::env::set_var("SNOWMCP_INVOKE_TIMEOUT_SECONDS", "45");

    let config = Config::load("/nonexistent/snowmcp.yaml", &cli(&["tools"])).unwrap();
    clear_env();

    config.validate().unwrap();
    assert_eq!(
        config.mcp_endpoint().unwrap().as_str(),
        "https://myorg-acct.snowflakecomputing.com/api/v2/databases/DB/schemas/S/mcp-servers/M"
    );
    assert_eq!(config.invoke_timeout().as_secs(), 45);
}

#[test]
#[serial]
fn test_invalid_numeric_env_var_keeps_default() {
    clear_env();
    std::env::set_var("SNOWMCP_CALLBACK_TIMEOUT_SECONDS", "soon");

    let config = Config::load("/nonexistent/snowmcp.yaml", &cli(&["tools"])).unwrap();
    clear_env();

    assert_eq!(config.oauth.callback_timeout_seconds, 300);
}

#[test]
#[serial]
fn test_env_overrides_file_and_cli_overrides_env() {
    clear_env();
    let (_dir, path) = temp_config_file(
        r#"
snowflake:
  account: file-acct
  role: FILE_ROLE
oauth:
  client_id: file-client
  client_secret: file-secret
engine:
  model: file-model
"#,
    );
    std::env::set_var("SNOWFLAKE_ACCOUNT", "env-acct");
    std::env::set_var("SNOWFLAKE_ROLE", "ENV_ROLE");
    std::env::set_var("SNOWMCP_MODEL", "env-model");

    let config = Config::load(
        path.to_str().unwrap(),
        &cli(&["--role", "CLI_ROLE", "chat", "--model", "cli-model"]),
    )
    .unwrap();
    clear_env();

    assert_eq!(config.snowflake.account, "env-acct");
    assert_eq!(config.oauth.client_id, "file-client");
    assert_eq!(config.snowflake.role, "CLI_ROLE");
    assert_eq!(config.engine.model, "cli-model");
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_invalid_yaml_is_a_config_error() {
    clear_env();
    let (_dir, path) = temp_config_file("snowflake: [not, a, map");

    let err = Config::load(path.to_str().unwrap(), &cli(&["tools"])).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
#[serial]
fn test_file_endpoint_overrides() {
    clear_env();
    let (_dir, path) = temp_config_file(
        r#"
snowflake:
  account: acme
oauth:
  client_id: c
  client_secret: s
  authorize_endpoint: http://127.0.0.1:9000/authorize
  token_endpoint: http://127.0.0.1:9000/token
mcp:
  endpoint: http://127.0.0.1:9000/mcp
"#,
    );

    let config = Config::load(path.to_str().unwrap(), &cli(&["tools"])).unwrap();
    config.validate().unwrap();

    let flow = config.oauth_flow_config().unwrap();
    assert_eq!(flow.authorize_endpoint.as_str(), "http://127.0.0.1:9000/authorize");
    assert_eq!(flow.token_endpoint.as_str(), "http://127.0.0.1:9000/token");
    assert_eq!(config.mcp_endpoint().unwrap().as_str(), "http://127.0.0.1:9000/mcp");
}
