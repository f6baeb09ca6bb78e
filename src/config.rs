//! Configuration management for snowmcp
//!
//! Configuration is layered: an optional YAML file, then environment
//! variables (a `.env` file is loaded into the environment first by the
//! binary), then CLI overrides. [`Config::validate`] runs last and reports
//! every missing required variable at once.
//!
//! Snowflake endpoints are derived from the account identifier unless the
//! file overrides them.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::{Cli, Commands};
use crate::error::{Result, SnowmcpError};
use crate::mcp::auth::flow::OAuthFlowConfig;
use crate::mcp::types::DEFAULT_PROTOCOL_VERSION;

/// Main configuration structure for snowmcp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account and MCP server selection
    #[serde(default)]
    pub snowflake: SnowflakeConfig,

    /// OAuth client settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// MCP session settings
    #[serde(default)]
    pub mcp: McpConfig,

    /// Reasoning engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Account and MCP server selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    /// Account identifier, e.g. `myorg-myaccount` (`SNOWFLAKE_ACCOUNT`)
    #[serde(default)]
    pub account: String,

    /// Database holding the MCP server (`SNOWFLAKE_DATABASE`)
    #[serde(default = "default_database")]
    pub database: String,

    /// Schema holding the MCP server (`SNOWFLAKE_SCHEMA`)
    #[serde(default = "default_schema")]
    pub schema: String,

    /// MCP server object name (`MCP_SERVER_NAME`)
    #[serde(default = "default_mcp_server_name")]
    pub mcp_server_name: String,

    /// Role sent with every request (`SNOWFLAKE_ROLE`)
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_database() -> String {
    "SALES_INTELLIGENCE".to_string()
}

fn default_schema() -> String {
    "DATA".to_string()
}

fn default_mcp_server_name() -> String {
    "SALES_INTELLIGENCE_MCP".to_string()
}

fn default_role() -> String {
    "ACCOUNTADMIN".to_string()
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            database: default_database(),
            schema: default_schema(),
            mcp_server_name: default_mcp_server_name(),
            role: default_role(),
        }
    }
}

/// OAuth client settings
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Client identifier (`OAUTH_CLIENT_ID`)
    #[serde(default)]
    pub client_id: String,

    /// Client secret (`OAUTH_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: String,

    /// Registered redirect URI (`SNOWMCP_REDIRECT_URI`)
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Optional scope string
    #[serde(default)]
    pub scope: Option<String>,

    /// Wait for the browser redirect (`SNOWMCP_CALLBACK_TIMEOUT_SECONDS`)
    #[serde(default = "default_callback_timeout_seconds")]
    pub callback_timeout_seconds: u64,

    /// Authorization endpoint override
    #[serde(default)]
    pub authorize_endpoint: Option<String>,

    /// Token endpoint override
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/oauth/callback".to_string()
}

fn default_callback_timeout_seconds() -> u64 {
    300
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            scope: None,
            callback_timeout_seconds: default_callback_timeout_seconds(),
            authorize_endpoint: None,
            token_endpoint: None,
        }
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("callback_timeout_seconds", &self.callback_timeout_seconds)
            .field("authorize_endpoint", &self.authorize_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

/// MCP session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// MCP endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Protocol revision sent with `initialize`
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Bound for `initialize` and `tools/list`; unbounded when unset
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// Bound for `tools/call` (`SNOWMCP_INVOKE_TIMEOUT_SECONDS`)
    #[serde(default = "default_invoke_timeout_seconds")]
    pub invoke_timeout_seconds: u64,
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

fn default_invoke_timeout_seconds() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            protocol_version: default_protocol_version(),
            request_timeout_seconds: None,
            invoke_timeout_seconds: default_invoke_timeout_seconds(),
        }
    }
}

/// Reasoning engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cortex model (`SNOWMCP_MODEL`)
    #[serde(default = "default_model")]
    pub model: String,

    /// Cortex base URL override (without `/chat/completions`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// System prompt override
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Capability invocations allowed in one user turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_model() -> String {
    crate::agent::cortex::DEFAULT_MODEL.to_string()
}

fn default_max_tool_rounds() -> usize {
    crate::agent::chat::DEFAULT_MAX_TOOL_ROUNDS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            system_prompt: None,
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SnowmcpError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SnowmcpError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(account) = std::env::var("SNOWFLAKE_ACCOUNT") {
            self.snowflake.account = account;
        }

        if let Ok(database) = std::env::var("SNOWFLAKE_DATABASE") {
            self.snowflake.database = database;
        }

        if let Ok(schema) = std::env::var("SNOWFLAKE_SCHEMA") {
            self.snowflake.schema = schema;
        }

        if let Ok(server) = std::env::var("MCP_SERVER_NAME") {
            self.snowflake.mcp_server_name = server;
        }

        if let Ok(role) = std::env::var("SNOWFLAKE_ROLE") {
            self.snowflake.role = role;
        }

        if let Ok(client_id) = std::env::var("OAUTH_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }

        if let Ok(redirect_uri) = std::env::var("SNOWMCP_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }

        if let Ok(timeout) = std::env::var("SNOWMCP_CALLBACK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.oauth.callback_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid SNOWMCP_CALLBACK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("SNOWMCP_INVOKE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.mcp.invoke_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid SNOWMCP_INVOKE_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(model) = std::env::var("SNOWMCP_MODEL") {
            self.engine.model = model;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(role) = &cli.role {
            self.snowflake.role = role.clone();
        }

        if let Commands::Chat {
            model: Some(model), ..
        } = &cli.command
        {
            self.engine.model = model.clone();
        }

        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::Config`] naming every missing required
    /// variable, or the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.snowflake.account.trim().is_empty() {
            missing.push("SNOWFLAKE_ACCOUNT");
        }
        if self.oauth.client_id.trim().is_empty() {
            missing.push("OAUTH_CLIENT_ID");
        }
        if self.oauth.client_secret.trim().is_empty() {
            missing.push("OAUTH_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(SnowmcpError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            ))
            .into());
        }

        for (name, value) in [
            ("snowflake.database", &self.snowflake.database),
            ("snowflake.schema", &self.snowflake.schema),
            ("snowflake.mcp_server_name", &self.snowflake.mcp_server_name),
            ("snowflake.role", &self.snowflake.role),
            ("engine.model", &self.engine.model),
        ] {
            if value.trim().is_empty() {
                return Err(SnowmcpError::Config(format!("{} cannot be empty", name)).into());
            }
        }

        let redirect = self.redirect_uri()?;
        if redirect.host_str().is_none() {
            return Err(SnowmcpError::Config(format!(
                "redirect URI {} has no host",
                self.oauth.redirect_uri
            ))
            .into());
        }

        if self.oauth.callback_timeout_seconds == 0 {
            return Err(SnowmcpError::Config(
                "oauth.callback_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.mcp.invoke_timeout_seconds == 0 {
            return Err(SnowmcpError::Config(
                "mcp.invoke_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.mcp.request_timeout_seconds == Some(0) {
            return Err(SnowmcpError::Config(
                "mcp.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.engine.max_tool_rounds == 0 {
            return Err(SnowmcpError::Config(
                "engine.max_tool_rounds must be greater than 0".to_string(),
            )
            .into());
        }

        self.authorize_endpoint()?;
        self.token_endpoint()?;
        self.mcp_endpoint()?;

        Ok(())
    }

    /// `https://{account}.snowflakecomputing.com`
    pub fn account_base_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com", self.snowflake.account)
    }

    /// The OAuth authorization endpoint.
    pub fn authorize_endpoint(&self) -> Result<Url> {
        let raw = match &self.oauth.authorize_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/oauth/authorize", self.account_base_url()),
        };
        parse_url("authorize endpoint", &raw)
    }

    /// The OAuth token endpoint.
    pub fn token_endpoint(&self) -> Result<Url> {
        let raw = match &self.oauth.token_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/oauth/token-request", self.account_base_url()),
        };
        parse_url("token endpoint", &raw)
    }

    /// The MCP server endpoint.
    pub fn mcp_endpoint(&self) -> Result<Url> {
        let raw = match &self.mcp.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}/api/v2/databases/{}/schemas/{}/mcp-servers/{}",
                self.account_base_url(),
                self.snowflake.database,
                self.snowflake.schema,
                self.snowflake.mcp_server_name
            ),
        };
        parse_url("MCP endpoint", &raw)
    }

    /// The Cortex OpenAI-compatible base URL.
    pub fn cortex_base_url(&self) -> String {
        match &self.engine.base_url {
            Some(base) => base.clone(),
            None => format!("{}/api/v2/cortex/v1", self.account_base_url()),
        }
    }

    /// The configured redirect URI.
    pub fn redirect_uri(&self) -> Result<Url> {
        parse_url("redirect URI", &self.oauth.redirect_uri)
    }

    /// Bound for `initialize` and `tools/list`, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.mcp.request_timeout_seconds.map(Duration::from_secs)
    }

    /// Bound for `tools/call`.
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.mcp.invoke_timeout_seconds)
    }

    /// Builds the OAuth flow settings.
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::Config`] if an endpoint is not a valid URL.
    pub fn oauth_flow_config(&self) -> Result<OAuthFlowConfig> {
        Ok(OAuthFlowConfig {
            authorize_endpoint: self.authorize_endpoint()?,
            token_endpoint: self.token_endpoint()?,
            client_id: self.oauth.client_id.clone(),
            client_secret: self.oauth.client_secret.clone(),
            redirect_uri: self.redirect_uri()?,
            scope: self.oauth.scope.clone(),
            callback_timeout: Duration::from_secs(self.oauth.callback_timeout_seconds),
        })
    }
}

fn parse_url(what: &str, raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| SnowmcpError::Config(format!("Invalid {} '{}': {}", what, raw, e)).into())
}
