//! Cortex reasoning engine
//!
//! Talks to the account's OpenAI-compatible Cortex endpoint
//! (`{base}/chat/completions`) with the same OAuth token and service headers
//! as the MCP session. Discovered capabilities are offered as function tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::engine::{CapabilityInvocation, EngineReply, Message, ReasoningEngine};
use crate::error::{Result, SnowmcpError};
use crate::mcp::auth::flow::AccessToken;
use crate::mcp::session::{ROLE_HEADER, TOKEN_TYPE_HEADER};
use crate::mcp::types::Capability;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "openai-gpt-5";

/// Instruction prepended to every request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant who can answer generic questions.";

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct CortexRequest {
    model: String,
    messages: Vec<CortexMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<CortexTool>,
    stream: bool,
}

/// Message structure for the chat completions API
#[derive(Debug, Serialize, Deserialize)]
struct CortexMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<CortexToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool definition offered to the model
#[derive(Debug, Serialize)]
struct CortexTool {
    r#type: String,
    function: CortexFunction,
}

#[derive(Debug, Serialize)]
struct CortexFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Tool call in chat completions format
#[derive(Debug, Serialize, Deserialize)]
struct CortexToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: CortexFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct CortexFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct CortexResponse {
    #[serde(default)]
    choices: Vec<CortexChoice>,
}

#[derive(Debug, Deserialize)]
struct CortexChoice {
    message: CortexMessage,
}

/// Reasoning engine backed by Snowflake Cortex.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use snowmcp::agent::cortex::CortexEngine;
/// use snowmcp::mcp::auth::flow::AccessToken;
///
/// let engine = CortexEngine::new(
///     Arc::new(reqwest::Client::new()),
///     "https://acme.snowflakecomputing.com/api/v2/cortex/v1",
///     AccessToken::new("tok", None),
///     "ANALYST",
/// )
/// .with_model("openai-gpt-5");
/// assert_eq!(engine.model(), "openai-gpt-5");
/// ```
pub struct CortexEngine {
    http: Arc<reqwest::Client>,
    base_url: String,
    token: AccessToken,
    role: String,
    model: String,
    system_prompt: String,
}

impl CortexEngine {
    /// Creates an engine for the Cortex base URL (without `/chat/completions`).
    pub fn new(
        http: Arc<reqwest::Client>,
        base_url: impl Into<String>,
        token: AccessToken,
        role: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token,
            role: role.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Selects the completion model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replaces the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// The completion model in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Convert conversation messages to chat completions format
    fn convert_messages(&self, messages: &[Message]) -> Vec<CortexMessage> {
        let mut converted = Vec::with_capacity(messages.len() + 1);
        converted.push(CortexMessage {
            role: "system".to_string(),
            content: Some(self.system_prompt.clone()),
            tool_calls: None,
            tool_call_id: None,
        });

        converted.extend(messages.iter().map(|m| CortexMessage {
            role: m.role.clone(),
            content: m.content.clone(),
            tool_calls: m.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| CortexToolCall {
                        id: tc.id.clone(),
                        r#type: function_type(),
                        function: CortexFunctionCall {
                            name: tc.function.name.clone(),
                            arguments: tc.function.arguments.clone(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: m.tool_call_id.clone(),
        }));

        converted
    }

    /// Convert discovered capabilities to function tools
    fn convert_tools(&self, capabilities: &[Capability]) -> Vec<CortexTool> {
        capabilities
            .iter()
            .map(|c| {
                // Function parameters must be an object schema.
                let parameters = match c.input_schema.as_object() {
                    Some(schema) if !schema.is_empty() => c.input_schema.clone(),
                    _ => serde_json::json!({ "type": "object", "properties": {} }),
                };
                CortexTool {
                    r#type: function_type(),
                    function: CortexFunction {
                        name: c.name.clone(),
                        description: c.description.clone(),
                        parameters,
                    },
                }
            })
            .collect()
    }

    /// Convert the model's message into an engine reply
    fn convert_response_message(&self, message: CortexMessage) -> Result<EngineReply> {
        if let Some(mut calls) = message.tool_calls.filter(|c| !c.is_empty()) {
            if calls.len() > 1 {
                tracing::debug!(
                    "Model requested {} calls; invoking the first only",
                    calls.len()
                );
            }
            let call = calls.remove(0);
            let arguments = if call.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    SnowmcpError::Engine(format!(
                        "Invalid arguments for '{}': {}",
                        call.function.name, e
                    ))
                })?
            };
            return Ok(EngineReply::Invoke(CapabilityInvocation {
                id: call.id,
                name: call.function.name,
                arguments,
            }));
        }

        match message.content {
            Some(content) => Ok(EngineReply::Text(content)),
            None => Err(SnowmcpError::Engine(
                "Model returned neither content nor tool calls".to_string(),
            )
            .into()),
        }
    }
}

#[async_trait]
impl ReasoningEngine for CortexEngine {
    async fn respond(
        &self,
        conversation: &[Message],
        capabilities: &[Capability],
    ) -> Result<EngineReply> {
        let request = CortexRequest {
            model: self.model.clone(),
            messages: self.convert_messages(conversation),
            tools: self.convert_tools(capabilities),
            stream: false,
        };

        tracing::debug!(
            "Sending Cortex request: {} messages, {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.token.value())
            .header(TOKEN_TYPE_HEADER, "OAUTH")
            .header(ROLE_HEADER, self.role.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cortex request failed: {}", e);
                SnowmcpError::Engine(format!("Cortex request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Cortex returned error {}: {}", status, error_text);
            return Err(SnowmcpError::Engine(format!(
                "Cortex returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: CortexResponse = response.json().await.map_err(|e| {
            SnowmcpError::Engine(format!("Failed to parse Cortex response: {}", e))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            SnowmcpError::Engine("Cortex response contained no choices".to_string())
        })?;

        self.convert_response_message(choice.message)
    }
}
