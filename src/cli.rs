//! Command-line interface definition for snowmcp
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, capability listing and
//! one-shot capability invocation.

use clap::{Parser, Subcommand};

/// snowmcp - Snowflake managed MCP client with OAuth 2.0
///
/// Authorizes in the browser, opens an MCP session against the configured
/// server and lets you chat with Cortex using the server's capabilities.
#[derive(Parser, Debug, Clone)]
#[command(name = "snowmcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/snowmcp.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the role sent with every request
    #[arg(short, long)]
    pub role: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for snowmcp
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat backed by the MCP server's capabilities
    Chat {
        /// Override the Cortex model from config
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the capabilities advertised by the MCP server
    Tools,

    /// Invoke a single capability and print its result
    Call {
        /// Capability name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat() {
        let cli = Cli::try_parse_from(["snowmcp", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { model: None }));
        assert_eq!(cli.config.as_deref(), Some("config/snowmcp.yaml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_chat_with_model() {
        let cli = Cli::try_parse_from(["snowmcp", "chat", "--model", "claude-4-sonnet"]).unwrap();
        match cli.command {
            Commands::Chat { model } => assert_eq!(model.as_deref(), Some("claude-4-sonnet")),
            other => panic!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_tools_with_globals() {
        let cli = Cli::try_parse_from([
            "snowmcp",
            "--config",
            "custom.yaml",
            "--verbose",
            "--role",
            "ANALYST",
            "tools",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Tools));
        assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
        assert!(cli.verbose);
        assert_eq!(cli.role.as_deref(), Some("ANALYST"));
    }

    #[test]
    fn test_cli_parse_call_defaults_args() {
        let cli = Cli::try_parse_from(["snowmcp", "call", "search"]).unwrap();
        match cli.command {
            Commands::Call { name, args } => {
                assert_eq!(name, "search");
                assert_eq!(args, "{}");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_call_with_args() {
        let cli =
            Cli::try_parse_from(["snowmcp", "call", "search", "--args", r#"{"q":"x"}"#]).unwrap();
        match cli.command {
            Commands::Call { args, .. } => assert_eq!(args, r#"{"q":"x"}"#),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["snowmcp"]).is_err());
    }
}
