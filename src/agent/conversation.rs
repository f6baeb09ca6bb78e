//! Conversation history for one chat session
//!
//! History is kept in full for the lifetime of the session and is dumped
//! when the interactive loop exits.

use crate::agent::engine::{CapabilityInvocation, Message};

/// Ordered conversation history.
///
/// # Examples
///
/// ```
/// use snowmcp::agent::Conversation;
///
/// let mut conversation = Conversation::new();
/// conversation.add_user_message("hello");
/// conversation.add_assistant_message("hi there");
/// assert_eq!(conversation.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends an assistant answer.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Records the assistant's request to invoke a capability.
    pub fn add_invocation(&mut self, invocation: &CapabilityInvocation) {
        self.messages
            .push(Message::assistant_with_tools(vec![invocation.to_tool_call()]));
    }

    /// Appends the result of an invocation.
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::tool_result(tool_call_id, content));
    }

    /// All messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Renders one line per message, `role: content`.
    ///
    /// Invocation requests are shown as `name(arguments)`.
    pub fn transcript(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| {
                let body = match (&m.content, &m.tool_calls) {
                    (Some(content), _) => content.clone(),
                    (None, Some(calls)) => calls
                        .iter()
                        .map(|c| format!("{}({})", c.function.name, c.function.arguments))
                        .collect::<Vec<_>>()
                        .join(", "),
                    (None, None) => String::new(),
                };
                format!("{}: {}", m.role, body)
            })
            .collect()
    }
}
