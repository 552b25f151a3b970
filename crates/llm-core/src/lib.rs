//! llm-core: language model plumbing for ollama-agent
//!
//! Provides:
//! - Conversation message types
//! - The `ModelGateway` contract
//! - Ollama chat client implementing the gateway
//! - Configuration loading (llm.toml)

pub mod config;
pub mod gateway;
pub mod message;
pub mod ollama;

pub use config::Config;
pub use gateway::{GenerationConfig, ModelGateway, ModelResponse, ToolCallRequest, ToolSpec};
pub use message::{Message, NewMessage, Role};
pub use ollama::{Model, OllamaClient, OllamaStatus};
