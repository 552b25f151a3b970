//! Tool framework for agent-based execution
//!
//! A tool is a named capability with a declared parameter schema. The
//! registry validates arguments against that schema before dispatching.

pub mod builtin;
pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use llm_core::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use registry::{RegistryError, ToolRegistry};

/// Primitive parameter types understood by argument validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Whether `value` has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Name of a JSON value's type, for error messages
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema for a tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ParameterProperty {
    pub fn new(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            enum_values: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParamType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(ParamType::Number, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(ParamType::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(ParamType::Boolean, description)
    }

    pub fn array(description: impl Into<String>) -> Self {
        Self::new(ParamType::Array, description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new(ParamType::Object, description)
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Schema describing tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Type is always "object"
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, ParameterProperty>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, prop: ParameterProperty) -> Self {
        self.properties.insert(name.into(), prop);
        self
    }

    pub fn with_required(mut self, name: impl Into<String>, prop: ParameterProperty) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), prop);
        self.required.push(name);
        self
    }

    /// Check the schema itself is coherent (run at registration time)
    pub fn check_definition(&self) -> std::result::Result<(), String> {
        let undeclared: Vec<&str> = self
            .required
            .iter()
            .filter(|name| !self.properties.contains_key(name.as_str()))
            .map(|s| s.as_str())
            .collect();

        if undeclared.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "required parameters not declared in properties: {}",
                undeclared.join(", ")
            ))
        }
    }

    /// Validate call arguments: required presence, then primitive types.
    ///
    /// Unknown arguments are accepted and passed through.
    pub fn validate(&self, args: &Map<String, Value>) -> std::result::Result<(), String> {
        let mut problems = Vec::new();

        for name in &self.required {
            match args.get(name) {
                None | Some(Value::Null) => problems.push(format!("missing required parameter '{}'", name)),
                Some(_) => {}
            }
        }

        for (name, value) in args {
            let Some(prop) = self.properties.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if !prop.param_type.matches(value) {
                problems.push(format!(
                    "parameter '{}' must be {}, got {}",
                    name,
                    prop.param_type,
                    value_type_name(value)
                ));
                continue;
            }
            if let (Some(allowed), Some(s)) = (&prop.enum_values, value.as_str()) {
                if !allowed.iter().any(|a| a == s) {
                    problems.push(format!(
                        "parameter '{}' must be one of [{}], got '{}'",
                        name,
                        allowed.join(", "),
                        s
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    /// Render as a JSON schema value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Value produced by a successful tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Data(Value),
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOutput::Text(text) => f.write_str(text),
            ToolOutput::Data(value) => {
                let rendered = serde_json::to_string_pretty(value).map_err(|_| std::fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Data(value)
    }
}

/// Why a tool call did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    InvalidArguments,
    ExecutionFailed,
}

/// Outcome of dispatching a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        output: ToolOutput,
    },
    Failure {
        kind: FailureKind,
        error: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        metadata: Map<String, Value>,
    },
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<ToolOutput>) -> Self {
        ToolResult::Success {
            output: output.into(),
        }
    }

    /// Create a failed result
    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        ToolResult::Failure {
            kind,
            error: error.into(),
            metadata: Map::new(),
        }
    }

    /// Attach metadata to a failure; successes are returned unchanged
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let ToolResult::Failure { metadata, .. } = &mut self {
            metadata.insert(key.into(), value.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            ToolResult::Success { output } => Some(output),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { metadata, .. } => Some(metadata),
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// What the tool does, shown to the model
    fn description(&self) -> &str;

    /// Optional grouping used for categorized lookup
    fn category(&self) -> Option<&str> {
        None
    }

    /// Declared parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Execute with already-validated arguments
    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput>;

    /// Describe the tool for native function calling
    fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema().to_json(),
        }
    }
}
