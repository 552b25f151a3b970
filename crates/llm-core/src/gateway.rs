//! Model gateway contract
//!
//! The agent loop only ever talks to a language model through
//! [`ModelGateway`]. Retries and timeouts are the gateway's business.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Generation parameters for a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Tools offered for native function calling. Empty disables it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            tools: Vec::new(),
        }
    }
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// Tool description handed to backends that support function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameters object
    pub parameters: Value,
}

/// A structured tool call emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// What a gateway returns for one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Text produced by the model (may be empty when only tool calls came back)
    pub content: String,
    /// Structured tool calls, in the order the model emitted them
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.tool_calls.push(ToolCallRequest {
            name: name.into(),
            arguments,
        });
        self
    }
}

/// A text-generation backend
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generate the next assistant turn for the given history
    async fn generate(&self, messages: &[Message], config: &GenerationConfig) -> Result<ModelResponse>;

    /// Human-readable backend/model label for logs
    fn describe(&self) -> String {
        "model-gateway".to_string()
    }
}
