//! Error types for the agent loop
//!
//! These never escape [`crate::agent::AgentLoop::process`]; they are folded
//! into an unsuccessful [`crate::agent::AgentResponse`] at the boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The loop was used before a gateway, memory and tool registry were bound
    #[error("agent is not ready: missing {0}")]
    NotReady(&'static str),

    /// The model call failed; not retried at this layer
    #[error("model gateway error: {0:#}")]
    Gateway(anyhow::Error),

    /// Anything else that went wrong inside a processing cycle
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
