//! OAuth authorization for the MCP endpoint
//!
//! # Module Layout
//!
//! - [`callback`] -- single-use local listener that captures the browser
//!   redirect
//! - [`flow`]     -- authorization code flow and token exchange

pub mod callback;
pub mod flow;

pub use callback::AuthorizationCode;
pub use flow::{AccessToken, OAuthFlow, OAuthFlowConfig};
