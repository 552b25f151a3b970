//! Text transformation and analysis tool

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

pub struct TextTool;

#[async_trait]
impl Tool for TextTool {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Analyze or transform text: count characters/words/lines, change case, reverse, \
         or count occurrences of a substring."
    }

    fn category(&self) -> Option<&str> {
        Some("text")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required(
                "operation",
                ParameterProperty::string("Operation to perform")
                    .with_enum(&["stats", "uppercase", "lowercase", "reverse", "count"]),
            )
            .with_required("text", ParameterProperty::string("Input text"))
            .with_property("pattern", ParameterProperty::string("Substring to count for the 'count' operation"))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let operation = args
            .get("operation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: operation"))?;
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: text"))?;

        let output = match operation {
            "stats" => ToolOutput::Data(json!({
                "characters": text.chars().count(),
                "bytes": text.len(),
                "words": text.split_whitespace().count(),
                "lines": text.lines().count(),
            })),
            "uppercase" => ToolOutput::Text(text.to_uppercase()),
            "lowercase" => ToolOutput::Text(text.to_lowercase()),
            "reverse" => ToolOutput::Text(text.chars().rev().collect()),
            "count" => {
                let pattern = args
                    .get("pattern")
                    .and_then(|v| v.as_str())
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| anyhow!("'count' needs a non-empty 'pattern'"))?;
                ToolOutput::Data(json!({
                    "pattern": pattern,
                    "occurrences": text.matches(pattern).count(),
                }))
            }
            other => bail!("Unknown operation '{}'", other),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(args: Value) -> Result<ToolOutput> {
        TextTool.execute(args.as_object().unwrap()).await
    }

    #[tokio::test]
    async fn test_stats() {
        let out = run(json!({"operation": "stats", "text": "héllo world\nbye"})).await.unwrap();
        assert_eq!(
            out,
            ToolOutput::Data(json!({"characters": 15, "bytes": 16, "words": 3, "lines": 2}))
        );
    }

    #[tokio::test]
    async fn test_reverse_is_char_aware() {
        let out = run(json!({"operation": "reverse", "text": "añb"})).await.unwrap();
        assert_eq!(out.to_string(), "bña");
    }

    #[tokio::test]
    async fn test_count_requires_pattern() {
        assert!(run(json!({"operation": "count", "text": "aaa"})).await.is_err());
        let out = run(json!({"operation": "count", "text": "banana", "pattern": "an"}))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::Data(json!({"pattern": "an", "occurrences": 2})));
    }
}
