//! Conversational layer on top of the MCP session
//!
//! - `engine`       -- the [`ReasoningEngine`] contract and message types
//! - `cortex`       -- engine backed by Snowflake Cortex chat completions
//! - `conversation` -- conversation history
//! - `chat`         -- the turn loop that executes capability invocations

pub mod chat;
pub mod conversation;
pub mod cortex;
pub mod engine;

pub use chat::ChatSession;
pub use conversation::Conversation;
pub use cortex::CortexEngine;
pub use engine::{
    CapabilityInvocation, EngineReply, FunctionCall, Message, ReasoningEngine, ToolCall,
};
