//! MCP (Model Context Protocol) client over HTTP JSON-RPC
//!
//! # Module Layout
//!
//! - `auth`     -- OAuth authorization code flow and redirect listener
//! - `types`    -- JSON-RPC envelopes and MCP payload types
//! - `session`  -- stateful session: initialize, discover, invoke
//! - `registry` -- capabilities discovered by the session

pub mod auth;
pub mod registry;
pub mod session;
pub mod types;

pub use registry::CapabilityRegistry;
pub use session::RpcSession;
pub use types::Capability;
