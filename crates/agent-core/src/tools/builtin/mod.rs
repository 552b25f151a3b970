//! Built-in tools for the agent framework

mod calculator;
mod clock;
mod json;
mod statistics;
mod system_info;
mod text;

use std::sync::Arc;

pub use calculator::{evaluate, CalculatorTool};
pub use clock::ClockTool;
pub use json::JsonTool;
pub use statistics::StatisticsTool;
pub use system_info::SystemInfoTool;
pub use text::TextTool;

use super::registry::ToolRegistry;
use super::Tool;

/// All built-in tools
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CalculatorTool),
        Arc::new(StatisticsTool),
        Arc::new(ClockTool),
        Arc::new(SystemInfoTool),
        Arc::new(JsonTool),
        Arc::new(TextTool),
    ]
}

/// Create a registry with all default tools
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_multiple(default_tools());
    registry
}
