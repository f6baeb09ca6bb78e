/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive chat backed by Cortex and the MCP server
- `tools`: List the server's capabilities
- `call`: Invoke one capability and print its result

Every handler starts with [`connect`]: browser authorization, MCP
`initialize`, and capability discovery.
*/

use std::sync::Arc;

use colored::Colorize;

use crate::config::Config;
use crate::error::{Result, SnowmcpError};
use crate::mcp::auth::flow::OAuthFlow;
use crate::mcp::session::RpcSession;

/// Descriptions longer than this are cut when listing capabilities.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 300;

/// Authorizes, opens the MCP session and discovers capabilities.
///
/// Prints the connection details the user needs to follow along. Returns
/// the shared HTTP client so later components reuse its connection pool.
///
/// # Errors
///
/// Any authorization or session failure is returned unchanged.
pub async fn connect(config: &Config) -> Result<(Arc<reqwest::Client>, RpcSession)> {
    let http = Arc::new(reqwest::Client::new());
    let mcp_endpoint = config.mcp_endpoint()?;

    println!("{}", "=".repeat(60));
    println!("{}", "Snowflake MCP Client with OAuth 2.0".bold());
    println!("{}", "=".repeat(60));
    println!("MCP server:   {}", mcp_endpoint);
    println!("Client id:    {}", config.oauth.client_id);
    println!("Redirect URI: {}", config.oauth.redirect_uri);
    println!("Role:         {}\n", config.snowflake.role);

    let flow = OAuthFlow::new(Arc::clone(&http), config.oauth_flow_config()?);
    let token = flow.authenticate().await?;
    match token.expires_in() {
        Some(secs) => println!("{}", format!("Authorized; token expires in {secs}s").green()),
        None => println!("{}", "Authorized".green()),
    }

    let mut session = RpcSession::new(
        Arc::clone(&http),
        mcp_endpoint,
        token,
        config.snowflake.role.clone(),
    )
    .with_invoke_timeout(config.invoke_timeout());
    if let Some(timeout) = config.request_timeout() {
        session = session.with_default_timeout(timeout);
    }

    session.initialize(&config.mcp.protocol_version).await?;
    if let Some(info) = session.server_info() {
        println!("Connected to {} (version {})", info.name, info.version);
    }

    session.discover_capabilities().await?;
    println!(
        "Discovered {} capabilities\n",
        session.capabilities().len()
    );

    Ok((http, session))
}

/// Shortens `description` to at most `max_chars` characters.
///
/// # Examples
///
/// ```
/// use snowmcp::commands::truncate_description;
///
/// assert_eq!(truncate_description("abcdef", 3), "abc...");
/// assert_eq!(truncate_description("abc", 3), "abc");
/// ```
pub fn truncate_description(description: &str, max_chars: usize) -> String {
    if description.chars().count() <= max_chars {
        return description.to_string();
    }
    let cut: String = description.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Returns `true` for the words that end the chat loop.
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Builds a [`CortexEngine`] on the session's token and runs a
    //! readline loop. A failed turn is printed and the loop continues; the
    //! conversation is dumped when the loop ends.

    use super::*;
    use crate::agent::{ChatSession, Conversation, CortexEngine};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Errors
    ///
    /// Returns an error if connecting fails or the line editor cannot start.
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let (http, session) = connect(&config).await?;

        let mut engine = CortexEngine::new(
            http,
            config.cortex_base_url(),
            session.access_token().clone(),
            config.snowflake.role.clone(),
        )
        .with_model(config.engine.model.clone());
        if let Some(prompt) = &config.engine.system_prompt {
            engine = engine.with_system_prompt(prompt.clone());
        }

        let mut chat = ChatSession::new(Box::new(engine), session, config.engine.max_tool_rounds)?;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&config.engine.model);

        loop {
            match rl.readline("You: ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if is_exit_command(trimmed) {
                        println!("\nGoodbye!");
                        break;
                    }

                    rl.add_history_entry(trimmed)?;

                    println!("{}", "Agent processing...".dimmed());
                    match chat.handle_turn(trimmed).await {
                        Ok(answer) => println!("\n{} {}\n", "Agent:".green().bold(), answer),
                        Err(e) => eprintln!("\n{} {}\n", "Error:".red().bold(), e),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("\nGoodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        print_conversation(chat.conversation());
        Ok(())
    }

    fn print_welcome_banner(model: &str) {
        println!("{}", "=".repeat(60));
        println!("{}", "Snowflake MCP Agent Ready!".bold());
        println!("{}", "=".repeat(60));
        println!("Model: {}", model.cyan());
        println!("\nCommands:");
        println!("    'exit' - Quit the session");
        println!("\nType your question or command:\n");
    }

    fn print_conversation(conversation: &Conversation) {
        if conversation.is_empty() {
            return;
        }
        println!("\n{}", "Conversation History:".bold());
        for line in conversation.transcript() {
            println!("{}", line);
        }
    }
}

// Capability listing handler
pub mod tools {
    //! Lists the capabilities discovered on connect.

    use super::*;

    /// Print every capability with a shortened description
    pub async fn run_tools(config: Config) -> Result<()> {
        let (_http, session) = connect(&config).await?;

        for capability in session.capabilities() {
            println!("  - {}", capability.name.cyan().bold());
            if !capability.description.is_empty() {
                println!(
                    "    {}",
                    truncate_description(&capability.description, DESCRIPTION_PREVIEW_CHARS)
                );
            }
        }

        Ok(())
    }
}

// One-shot invocation handler
pub mod call {
    //! Invokes a single capability from the command line.

    use super::*;

    /// Invoke `name` with the JSON `args` and print the pretty-printed result
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::Config`] if `args` is not valid JSON (checked
    /// before the browser opens), or any session failure.
    pub async fn run_call(config: Config, name: String, args: String) -> Result<()> {
        let arguments: serde_json::Value = serde_json::from_str(&args).map_err(|e| {
            SnowmcpError::Config(format!("--args is not valid JSON: {}", e))
        })?;

        let (_http, mut session) = connect(&config).await?;

        if session.capabilities().get(&name).is_none() {
            tracing::warn!("'{}' was not advertised by the server; calling anyway", name);
        }

        println!("Calling {} with {}", name.cyan(), arguments);
        let result = session.invoke_capability(&name, arguments).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&result).map_err(SnowmcpError::Serialization)?
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_description_short_is_unchanged() {
        assert_eq!(truncate_description("short", 300), "short");
    }

    #[test]
    fn test_truncate_description_cuts_on_char_boundary() {
        let text = "é".repeat(301);
        let cut = truncate_description(&text, 300);
        assert_eq!(cut.chars().count(), 303);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_is_exit_command() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command("q"));
        assert!(!is_exit_command("question"));
    }
}
