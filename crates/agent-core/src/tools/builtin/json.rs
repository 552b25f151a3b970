//! JSON inspection and formatting tool

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

/// Tool for validating, formatting and querying JSON documents
pub struct JsonTool;

#[async_trait]
impl Tool for JsonTool {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Work with JSON text: validate it, pretty-print it, minify it, list its keys, \
         or extract a value with a JSON pointer such as '/items/0/name'."
    }

    fn category(&self) -> Option<&str> {
        Some("data")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required(
                "operation",
                ParameterProperty::string("Operation to perform")
                    .with_enum(&["validate", "format", "minify", "keys", "get"]),
            )
            .with_required("input", ParameterProperty::string("JSON document as text"))
            .with_property("path", ParameterProperty::string("JSON pointer for the 'get' operation"))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let operation = args
            .get("operation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: operation"))?;
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: input"))?;

        if operation == "validate" {
            return Ok(match serde_json::from_str::<Value>(input) {
                Ok(_) => ToolOutput::Data(json!({"valid": true})),
                Err(e) => ToolOutput::Data(json!({
                    "valid": false,
                    "error": e.to_string(),
                    "line": e.line(),
                    "column": e.column(),
                })),
            });
        }

        let document: Value =
            serde_json::from_str(input).map_err(|e| anyhow!("Input is not valid JSON: {}", e))?;

        match operation {
            "format" => Ok(ToolOutput::Text(serde_json::to_string_pretty(&document)?)),
            "minify" => Ok(ToolOutput::Text(serde_json::to_string(&document)?)),
            "keys" => match &document {
                Value::Object(map) => Ok(ToolOutput::Data(json!(map.keys().collect::<Vec<_>>()))),
                other => bail!("'keys' needs a JSON object, got {}", kind(other)),
            },
            "get" => {
                let path = args.get("path").and_then(|v| v.as_str()).unwrap_or("");
                document
                    .pointer(path)
                    .cloned()
                    .map(ToolOutput::Data)
                    .ok_or_else(|| anyhow!("Nothing found at path '{}'", path))
            }
            other => bail!("Unknown operation '{}'", other),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(args: Value) -> Result<ToolOutput> {
        JsonTool.execute(args.as_object().unwrap()).await
    }

    #[tokio::test]
    async fn test_validate_reports_position() {
        let out = run(json!({"operation": "validate", "input": "{\"a\": }"})).await.unwrap();
        let ToolOutput::Data(value) = out else { panic!() };
        assert_eq!(value["valid"], false);
        assert_eq!(value["line"], 1);
    }

    #[tokio::test]
    async fn test_minify() {
        let out = run(json!({"operation": "minify", "input": "{ \"a\" : [1, 2] }"})).await.unwrap();
        assert_eq!(out.to_string(), "{\"a\":[1,2]}");
    }

    #[tokio::test]
    async fn test_get_pointer() {
        let input = r#"{"items": [{"name": "first"}, {"name": "second"}]}"#;
        let out = run(json!({"operation": "get", "input": input, "path": "/items/1/name"}))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::Data(json!("second")));

        let err = run(json!({"operation": "get", "input": input, "path": "/missing"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Nothing found"));
    }

    #[tokio::test]
    async fn test_keys_requires_object() {
        let err = run(json!({"operation": "keys", "input": "[1]"})).await.unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
