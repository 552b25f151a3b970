//! Agent loop
//!
//! Drives a conversation through repeated model calls, dispatching at most
//! one tool per round until the model answers or the round budget runs out.

mod agent_loop;
pub mod directive;
pub mod prompt;
mod state;

pub use agent_loop::{create_agent, AgentLoop, CONCLUDE_PROMPT};
pub use directive::{extract_tool_call, format_directive, parse_directive};
pub use prompt::build_system_prompt;
pub use state::{AgentConfig, AgentResponse, AgentSettings};
