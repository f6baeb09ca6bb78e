//! Chat loop tying a reasoning engine to an MCP session
//!
//! One user turn may take several engine rounds: every
//! [`EngineReply::Invoke`] is executed against the session and its outcome
//! is appended to the conversation before the engine is asked again. A
//! failed invocation is reported to the engine as a failed result; it does
//! not end the turn or the session.

use tracing::{debug, info, warn};

use crate::agent::conversation::Conversation;
use crate::agent::engine::{EngineReply, ReasoningEngine};
use crate::error::{Result, SnowmcpError};
use crate::mcp::session::RpcSession;

/// Default bound on capability invocations within one user turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// An interactive conversation backed by an engine and an MCP session.
///
/// # Examples
///
/// ```no_run
/// # use snowmcp::agent::{ChatSession, ReasoningEngine};
/// # use snowmcp::mcp::session::RpcSession;
/// # async fn example(engine: Box<dyn ReasoningEngine>, session: RpcSession) -> snowmcp::error::Result<()> {
/// let mut chat = ChatSession::new(engine, session, 8)?;
/// let answer = chat.handle_turn("What were sales last quarter?").await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct ChatSession {
    engine: Box<dyn ReasoningEngine>,
    session: RpcSession,
    conversation: Conversation,
    max_tool_rounds: usize,
}

impl ChatSession {
    /// Creates a chat session.
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::Config`] if `max_tool_rounds` is zero.
    pub fn new(
        engine: Box<dyn ReasoningEngine>,
        session: RpcSession,
        max_tool_rounds: usize,
    ) -> Result<Self> {
        if max_tool_rounds == 0 {
            return Err(
                SnowmcpError::Config("max_tool_rounds must be greater than 0".to_string()).into(),
            );
        }

        Ok(Self {
            engine,
            session,
            conversation: Conversation::new(),
            max_tool_rounds,
        })
    }

    /// Runs one user turn to completion and returns the engine's answer.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if it cannot reply, or
    /// [`SnowmcpError::Engine`] when the turn needs more than
    /// `max_tool_rounds` invocations. Invocation failures are not errors.
    pub async fn handle_turn(&mut self, user_input: &str) -> Result<String> {
        self.conversation.add_user_message(user_input);
        let mut invocations = 0;

        loop {
            let reply = self
                .engine
                .respond(
                    self.conversation.messages(),
                    self.session.capabilities().list(),
                )
                .await?;

            let invocation = match reply {
                EngineReply::Text(text) => {
                    self.conversation.add_assistant_message(text.clone());
                    debug!("Turn completed after {} invocations", invocations);
                    return Ok(text);
                }
                EngineReply::Invoke(invocation) => invocation,
            };

            if invocations >= self.max_tool_rounds {
                warn!("Maximum capability invocations ({}) exceeded", self.max_tool_rounds);
                return Err(SnowmcpError::Engine(format!(
                    "exceeded {} capability invocations in one turn",
                    self.max_tool_rounds
                ))
                .into());
            }
            invocations += 1;

            self.conversation.add_invocation(&invocation);
            let outcome = self.invoke(&invocation.name, invocation.arguments.clone()).await;
            self.conversation.add_tool_result(&invocation.id, outcome);
        }
    }

    /// Invokes a capability and renders the outcome for the engine.
    async fn invoke(&mut self, name: &str, arguments: serde_json::Value) -> String {
        if self.session.capabilities().get(name).is_none() {
            warn!("Engine requested unknown capability '{}'", name);
            return format!("Capability '{}' failed: not offered by the server", name);
        }

        match self.session.invoke_capability(name, arguments).await {
            Ok(result) => {
                info!(capability = name, "Capability returned");
                render_result(&result)
            }
            Err(e) => {
                warn!("Capability '{}' failed: {}", name, e);
                format!("Capability '{}' failed: {}", name, e)
            }
        }
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The underlying MCP session.
    pub fn session(&self) -> &RpcSession {
        &self.session
    }
}

/// Flattens a `tools/call` result into text for the engine.
///
/// Text content blocks are joined with newlines; anything else is passed as
/// JSON. Results flagged `isError` are prefixed so the engine sees the
/// failure.
pub fn render_result(result: &serde_json::Value) -> String {
    let texts: Option<Vec<&str>> = result
        .get("content")
        .and_then(|c| c.as_array())
        .filter(|blocks| !blocks.is_empty())
        .and_then(|blocks| {
            blocks
                .iter()
                .map(|b| match b.get("type").and_then(|t| t.as_str()) {
                    Some("text") => b.get("text").and_then(|t| t.as_str()),
                    _ => None,
                })
                .collect()
        });

    let body = match texts {
        Some(texts) => texts.join("\n"),
        None => result.to_string(),
    };

    if result.get("isError").and_then(|v| v.as_bool()) == Some(true) {
        format!("Capability reported an error: {}", body)
    } else {
        body
    }
}
