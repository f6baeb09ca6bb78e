//! snowmcp - Snowflake managed MCP client library
//!
//! This library authorizes against a Snowflake account with the OAuth 2.0
//! authorization code grant and drives a JSON-RPC MCP session with the
//! resulting bearer token.
//!
//! # Architecture
//!
//! - `mcp`: OAuth flow, redirect listener, JSON-RPC session and capability
//!   registry
//! - `agent`: reasoning engine contract, Cortex engine and chat loop
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snowmcp::mcp::auth::OAuthFlow;
//! use snowmcp::mcp::RpcSession;
//! use snowmcp::Config;
//!
//! # async fn example(config: Config) -> snowmcp::Result<()> {
//! let http = Arc::new(reqwest::Client::new());
//! let token = OAuthFlow::new(Arc::clone(&http), config.oauth_flow_config()?)
//!     .authenticate()
//!     .await?;
//!
//! let mut session = RpcSession::new(http, config.mcp_endpoint()?, token, "ANALYST");
//! session.initialize(&config.mcp.protocol_version).await?;
//! let capabilities = session.discover_capabilities().await?;
//! println!("{} capabilities", capabilities.len());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod mcp;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SnowmcpError};
