//! agent-core: tool-using conversational agent
//!
//! Provides:
//! - Conversation memory with bounded history
//! - Tool trait, schema validation and registry
//! - Built-in tools
//! - The agent loop and its `create_agent` factory

pub mod agent;
pub mod error;
pub mod memory;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{create_agent, AgentConfig, AgentLoop, AgentResponse, AgentSettings};
pub use error::AgentError;
pub use memory::{ConversationMemory, MemoryConfig, NewToolCall, ToolCallRecord};
pub use tools::{
    FailureKind, ParamType, ParameterProperty, ParameterSchema, RegistryError, Tool, ToolCall, ToolOutput,
    ToolRegistry, ToolResult,
};
