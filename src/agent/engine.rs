//! Reasoning engine contract and conversation message types
//!
//! A reasoning engine receives the conversation so far and the capabilities
//! the MCP session discovered, and answers with either plain text or a
//! request to invoke one capability. The chat loop never depends on how the
//! decision is made, only on [`ReasoningEngine::respond`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mcp::types::Capability;

/// Message structure for conversation
///
/// Messages can be from the user, assistant, system, or capability results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Capability calls requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call id this message answers (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use snowmcp::agent::Message;
    ///
    /// let msg = Message::user("What were Q3 sales?");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a capability result message answering `tool_call_id`
    ///
    /// # Examples
    ///
    /// ```
    /// use snowmcp::agent::Message;
    ///
    /// let msg = Message::tool_result("call_1", "42 rows");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message that requests capability calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }
}

/// Function call information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the capability to call
    pub name: String,
    /// Arguments for the capability (as JSON string)
    pub arguments: String,
}

/// A capability call recorded in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

/// A structured request to invoke one discovered capability.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityInvocation {
    /// Engine-assigned id that the result message must echo.
    pub id: String,
    /// Capability name, as advertised by `tools/list`.
    pub name: String,
    /// Arguments for the capability's input schema.
    pub arguments: serde_json::Value,
}

impl CapabilityInvocation {
    /// The conversation record of this invocation.
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            function: FunctionCall {
                name: self.name.clone(),
                arguments: self.arguments.to_string(),
            },
        }
    }
}

/// What the engine decided to do with the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// A final answer for the user.
    Text(String),
    /// Invoke a capability and call the engine again with its result.
    Invoke(CapabilityInvocation),
}

/// A pluggable decision maker for the chat loop.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use snowmcp::agent::{EngineReply, Message, ReasoningEngine};
/// use snowmcp::error::Result;
/// use snowmcp::mcp::types::Capability;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ReasoningEngine for Echo {
///     async fn respond(
///         &self,
///         conversation: &[Message],
///         _capabilities: &[Capability],
///     ) -> Result<EngineReply> {
///         let last = conversation
///             .last()
///             .and_then(|m| m.content.clone())
///             .unwrap_or_default();
///         Ok(EngineReply::Text(last))
///     }
/// }
/// ```
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Decides the next step for `conversation` given `capabilities`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot produce a reply; the chat loop
    /// reports it and keeps the session open.
    async fn respond(
        &self,
        conversation: &[Message],
        capabilities: &[Capability],
    ) -> Result<EngineReply>;
}
