//! Test doubles for the model gateway

use std::collections::VecDeque;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use llm_core::{GenerationConfig, Message, ModelGateway, ModelResponse};
use parking_lot::Mutex;

/// Gateway that replays a fixed script of responses
pub(crate) struct ScriptedGateway {
    script: Mutex<VecDeque<Result<ModelResponse, String>>>,
    /// Returned once the script runs out
    fallback: Option<ModelResponse>,
    calls: Mutex<Vec<(Vec<Message>, GenerationConfig)>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same response
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn then_error(self, message: &str) -> Self {
        self.script.lock().push_back(Err(message.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// History and config of the nth call
    pub fn call(&self, index: usize) -> (Vec<Message>, GenerationConfig) {
        self.calls.lock()[index].clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(&self, messages: &[Message], config: &GenerationConfig) -> Result<ModelResponse> {
        self.calls.lock().push((messages.to_vec(), config.clone()));
        match self.script.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| anyhow!("script exhausted")),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Gateway that panics on every call
pub(crate) struct PanickingGateway;

#[async_trait]
impl ModelGateway for PanickingGateway {
    async fn generate(&self, _messages: &[Message], _config: &GenerationConfig) -> Result<ModelResponse> {
        panic!("gateway blew up")
    }
}
