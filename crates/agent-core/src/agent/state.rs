//! Agent configuration, per-call state and responses

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::memory::MemoryConfig;

/// Configuration for the agent loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum counted rounds before the loop forces a conclusion
    pub max_rounds: usize,
    /// Sampling temperature passed to the gateway
    pub temperature: f32,
    /// Generation cap passed to the gateway
    pub max_tokens: u32,
    /// Offer tool specs to the gateway for structured tool calls
    pub native_tools: bool,
    /// Text placed before the generated tool catalogue in the system prompt
    pub system_preamble: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            temperature: 0.7,
            max_tokens: 2048,
            native_tools: true,
            system_preamble: None,
        }
    }
}

impl AgentConfig {
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_native_tools(mut self, enabled: bool) -> Self {
        self.native_tools = enabled;
        self
    }

    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = Some(preamble.into());
        self
    }
}

/// Everything needed to build an agent with [`super::create_agent`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub agent: AgentConfig,
    pub memory: MemoryConfig,
}

/// Transient state of one `process` call
#[derive(Debug, Default)]
pub(crate) struct RunState {
    /// Counted rounds so far
    pub round: usize,
    /// Tools that completed successfully, in call order
    pub tools_used: Vec<String>,
}

/// Terminal output of the agent loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub content: String,
    pub success: bool,
    pub rounds: usize,
    pub tools_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    pub(crate) fn completed(content: String, run: RunState) -> Self {
        Self {
            content,
            success: true,
            rounds: run.round,
            tools_used: run.tools_used,
            error: None,
        }
    }

    pub(crate) fn exhausted(content: String, run: RunState, max_rounds: usize, final_error: Option<String>) -> Self {
        let mut error = format!("Reached the maximum of {} rounds without a final answer", max_rounds);
        if let Some(final_error) = final_error {
            error.push_str(&format!("; concluding call failed: {}", final_error));
        }
        Self {
            content,
            success: false,
            rounds: run.round,
            tools_used: run.tools_used,
            error: Some(error),
        }
    }

    pub(crate) fn failed(error: &AgentError, run: RunState) -> Self {
        let message = error.to_string();
        Self {
            content: message.clone(),
            success: false,
            rounds: run.round,
            tools_used: run.tools_used,
            error: Some(message),
        }
    }
}
