//! snowmcp - Snowflake managed MCP client
//!
#![doc = "snowmcp - Snowflake managed MCP client"]
#![doc = "Main entry point for the snowmcp application."]

use std::process::ExitCode;

use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snowmcp::cli::{Cli, Commands};
use snowmcp::commands;
use snowmcp::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env: {}", e);
        }
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/snowmcp.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { .. } => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Tools => {
            tracing::info!("Listing MCP capabilities");
            commands::tools::run_tools(config).await?;
            Ok(())
        }
        Commands::Call { name, args } => {
            tracing::info!("Invoking capability {}", name);
            commands::call::run_call(config, name, args).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "snowmcp=debug"
    } else {
        "snowmcp=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
