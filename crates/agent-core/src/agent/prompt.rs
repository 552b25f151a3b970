//! System prompt construction

use crate::tools::ToolRegistry;

use super::directive::DIRECTIVE_MARKER;

const DEFAULT_PREAMBLE: &str = "You are a helpful assistant with access to tools. \
Use them when they help you answer accurately; otherwise answer directly.";

/// Build the system prompt from the registry's current tool catalogue
pub fn build_system_prompt(registry: &ToolRegistry, preamble: Option<&str>) -> String {
    let mut prompt = String::new();

    prompt.push_str(preamble.unwrap_or(DEFAULT_PREAMBLE));
    prompt.push_str("\n\n");

    prompt.push_str("## Available Tools\n");
    if registry.is_empty() {
        prompt.push_str("(no tools are currently available)\n");
    } else {
        prompt.push_str(&format_tool_list(registry));
    }
    prompt.push('\n');

    prompt.push_str(&format!(
        r#"## Using Tools
To call a tool, reply with a single line in exactly this form:
**{marker}: tool_name({{"parameter": "value"}})**

For example:
**{marker}: calculator({{"expression": "2+3*4"}})**

Call one tool per reply. The tool result will be sent back to you as the next message.
When you have everything you need, reply with your final answer and no tool call."#,
        marker = DIRECTIVE_MARKER
    ));

    prompt
}

fn format_tool_list(registry: &ToolRegistry) -> String {
    let mut out = String::new();
    for tool in registry.get_all() {
        out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));

        let schema = tool.parameters_schema();
        for (name, prop) in &schema.properties {
            let required = if schema.required.contains(name) {
                ", required"
            } else {
                ""
            };
            out.push_str(&format!("    - {} ({}{}): {}", name, prop.param_type, required, prop.description));
            if let Some(values) = &prop.enum_values {
                out.push_str(&format!(" [one of: {}]", values.join(", ")));
            }
            out.push('\n');
        }
    }
    out
}
