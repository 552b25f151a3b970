//! Tool-call extraction from model output
//!
//! Structured tool calls reported by the gateway take precedence. Models
//! without function calling fall back to the textual directive
//! `**USE_TOOL: name({"arg": "value"})**`.

use llm_core::{ModelResponse, ToolCallRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::tools::ToolCall;

/// Marker phrase that introduces a textual tool directive
pub const DIRECTIVE_MARKER: &str = "USE_TOOL";

static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*USE_TOOL:\s*([A-Za-z_][A-Za-z0-9_\-]*)\((.*?)\)\*\*").unwrap()
});

/// Pick the single tool call to honor this round, if any
pub fn extract_tool_call(response: &ModelResponse) -> Option<ToolCall> {
    if let Some(first) = response.tool_calls.first() {
        if response.tool_calls.len() > 1 {
            debug!(
                ignored = response.tool_calls.len() - 1,
                "Model returned several tool calls; honoring the first"
            );
        }
        return Some(from_structured(first));
    }
    parse_directive(&response.content)
}

/// Parse the first `**USE_TOOL: name(args)**` directive in `content`
pub fn parse_directive(content: &str) -> Option<ToolCall> {
    let captures = DIRECTIVE_RE.captures(content)?;
    let name = captures.get(1)?.as_str();
    let blob = captures
        .get(2)
        .map_or("", |m| widen_arguments(content, m.start(), m.end()));
    Some(ToolCall::new(name, parse_arguments(name, blob)))
}

/// The lazy match ends at the first `)**`, which may sit inside a JSON
/// string. Move to a later `)**` on the same line if that yields valid JSON.
fn widen_arguments(content: &str, start: usize, end: usize) -> &str {
    let blob = &content[start..end];
    if blob.trim().is_empty() || serde_json::from_str::<Value>(blob).is_ok() {
        return blob;
    }

    let line_end = content[end..].find('\n').map_or(content.len(), |i| end + i);
    let mut search = end + 1;
    while let Some(offset) = content[search..line_end].find(")**") {
        let candidate = &content[start..search + offset];
        if serde_json::from_str::<Value>(candidate).is_ok() {
            return candidate;
        }
        search += offset + 1;
    }
    blob
}

/// Render a call in directive form
pub fn format_directive(name: &str, args: &Map<String, Value>) -> String {
    if args.is_empty() {
        format!("**{}: {}()**", DIRECTIVE_MARKER, name)
    } else {
        format!("**{}: {}({})**", DIRECTIVE_MARKER, name, Value::Object(args.clone()))
    }
}

fn from_structured(request: &ToolCallRequest) -> ToolCall {
    let arguments = match &request.arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        // Some backends send the arguments object JSON-encoded
        Value::String(blob) => parse_arguments(&request.name, blob),
        other => {
            warn!(tool = %request.name, arguments = %other, "Ignoring non-object tool arguments");
            Map::new()
        }
    };
    ToolCall::new(request.name.clone(), arguments)
}

/// Parse an argument blob; anything but a JSON object yields empty arguments
fn parse_arguments(tool: &str, blob: &str) -> Map<String, Value> {
    let blob = blob.trim();
    if blob.is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(blob) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(%tool, arguments = %other, "Tool arguments are not an object; using empty arguments");
            Map::new()
        }
        Err(e) => {
            warn!(%tool, error = %e, "Failed to parse tool arguments; using empty arguments");
            Map::new()
        }
    }
}
