//! Error types for snowmcp
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling. Every stage of the
//! authorization and session flow fails fast with one of these variants;
//! callers recover the typed variant with `anyhow::Error::downcast_ref`.

use thiserror::Error;

/// Main error type for snowmcp operations
///
/// The first group of variants covers the OAuth authorization-code flow,
/// the second the MCP JSON-RPC session, and the remainder wraps ambient
/// failures (configuration, I/O, serialization, HTTP).
#[derive(Error, Debug)]
pub enum SnowmcpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The local redirect listener could not bind its address
    #[error("Failed to bind OAuth callback listener on {addr}: {source}")]
    ListenerBindFailed {
        /// The `host:port` the listener attempted to bind
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// The redirect arrived without an authorization code
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// No redirect arrived before the callback timeout elapsed
    #[error("Timed out after {seconds}s waiting for the authorization redirect")]
    AuthorizationTimeout {
        /// The configured wait, in seconds
        seconds: u64,
    },

    /// The redirect carried an empty authorization code
    #[error("Authorization code not received")]
    AuthorizationCodeMissing,

    /// The token endpoint answered with a non-success status
    #[error("Token exchange failed: {status} - {body}")]
    TokenExchangeFailed {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The token endpoint answered 2xx but the body is unusable
    #[error("Malformed token response: {0}")]
    TokenResponseMalformed(String),

    /// The MCP endpoint answered with a non-success status
    #[error("MCP transport error: {status} - {body}")]
    TransportError {
        /// HTTP status code returned by the MCP endpoint
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The MCP endpoint returned a JSON-RPC error object
    #[error("MCP error {code}: {message}")]
    RpcProtocolError {
        /// JSON-RPC error code
        code: i64,
        /// Human-readable error message
        message: String,
    },

    /// Reasoning engine failures (completion requests, malformed replies)
    #[error("Reasoning engine error: {0}")]
    Engine(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for snowmcp operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
