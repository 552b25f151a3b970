//! Ollama API client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::gateway::{GenerationConfig, ModelGateway, ModelResponse, ToolCallRequest};
use crate::message::{Message, Role};

/// Ollama service status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OllamaStatus {
    /// Service is running and ready
    Running,
    /// Service is not reachable
    Stopped,
}

/// Model information from Ollama API
#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl Model {
    /// Get human-readable size
    pub fn size_human(&self) -> String {
        let gb = self.size as f64 / (1024.0 * 1024.0 * 1024.0);
        format!("{:.1} GB", gb)
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<Model>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: WireOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: ToolCallRequest,
}

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for `model` served at `base_url`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Switch the model used for subsequent calls
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Check if Ollama is running
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get current status
    pub async fn status(&self) -> OllamaStatus {
        if self.health_check().await.unwrap_or(false) {
            OllamaStatus::Running
        } else {
            OllamaStatus::Stopped
        }
    }

    /// List all available models
    pub async fn list_models(&self) -> Result<Vec<Model>> {
        let url = format!("{}/api/tags", self.base_url);

        let resp: TagsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to Ollama")?
            .json()
            .await
            .context("Failed to parse models response")?;

        Ok(resp.models)
    }

    fn build_request<'a>(&'a self, messages: &'a [Message], config: &'a GenerationConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
            options: WireOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
            tools: config
                .tools
                .iter()
                .map(|t| WireTool {
                    tool_type: "function",
                    function: WireFunction {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ModelGateway for OllamaClient {
    #[instrument(skip(self, messages, config), fields(model = %self.model, messages = messages.len()))]
    async fn generate(&self, messages: &[Message], config: &GenerationConfig) -> Result<ModelResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.build_request(messages, config);

        let resp: ChatResponse = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to Ollama")?
            .error_for_status()
            .context("Ollama chat request failed")?
            .json()
            .await
            .context("Failed to parse chat response")?;

        debug!(
            content_len = resp.message.content.len(),
            tool_calls = resp.message.tool_calls.len(),
            "Received chat response"
        );

        Ok(ModelResponse {
            content: resp.message.content,
            tool_calls: resp
                .message
                .tool_calls
                .into_iter()
                .map(|c| c.function)
                .collect(),
        })
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ToolSpec;
    use crate::message::NewMessage;
    use serde_json::json;

    fn client() -> OllamaClient {
        OllamaClient::new("http://127.0.0.1:11434/", "llama3.2", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_build_request_shape() {
        let client = client();
        let messages = vec![
            Message::from_new(NewMessage::system("be brief")),
            Message::from_new(NewMessage::user("hi")),
        ];
        let config = GenerationConfig::default()
            .with_temperature(0.2)
            .with_max_tokens(128)
            .with_tools(vec![ToolSpec {
                name: "calculator".to_string(),
                description: "math".to_string(),
                parameters: json!({"type": "object"}),
            }]);

        let value = serde_json::to_value(client.build_request(&messages, &config)).unwrap();
        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["options"]["num_predict"], 128);
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "calculator");
    }

    #[test]
    fn test_tools_omitted_when_empty() {
        let client = client();
        let messages = vec![Message::from_new(NewMessage::user("hi"))];
        let config = GenerationConfig::default();
        let value = serde_json::to_value(client.build_request(&messages, &config)).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_parse_chat_response_with_tool_calls() {
        let body = json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "calculator", "arguments": {"expression": "1+1"}}}
                ]
            },
            "done": true
        });
        let resp: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.message.tool_calls.len(), 1);
        assert_eq!(resp.message.tool_calls[0].function.name, "calculator");
        assert_eq!(resp.message.tool_calls[0].function.arguments["expression"], "1+1");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_stopped() {
        let client = OllamaClient::new("http://127.0.0.1:9", "llama3.2", Duration::from_secs(1)).unwrap();
        assert!(!client.health_check().await.unwrap());
        assert_eq!(client.status().await, OllamaStatus::Stopped);

        let messages = vec![Message::from_new(NewMessage::user("hi"))];
        let err = client.generate(&messages, &GenerationConfig::default()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Ollama"));
    }
}
