//! Tool registry for managing and dispatching tools

use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use llm_core::ToolSpec;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{FailureKind, Tool, ToolResult};

/// Errors from the strict registration path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
    #[error("tool '{name}' has an invalid schema: {reason}")]
    InvalidSchema { name: String, reason: String },
}

/// Registry of available tools, indexed by name and category
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    categories: HashMap<String, BTreeSet<String>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            categories: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    ///
    /// Returns the replaced tool, if there was one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Option<Arc<dyn Tool>> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool, replacing any tool with the same name
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();

        if let Err(reason) = tool.parameters_schema().check_definition() {
            warn!(tool = %name, %reason, "Registering tool with inconsistent schema");
        }

        let previous = self.remove_entry(&name);
        if previous.is_some() {
            warn!(tool = %name, "Replacing previously registered tool");
        } else {
            debug!(tool = %name, "Registering tool");
        }

        if let Some(category) = tool.category() {
            self.categories
                .entry(category.to_string())
                .or_default()
                .insert(name.clone());
        }
        self.tools.insert(name, tool);

        previous
    }

    /// Register a tool, refusing duplicates and inconsistent schemas
    pub fn try_register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tool.parameters_schema()
            .check_definition()
            .map_err(|reason| RegistryError::InvalidSchema {
                name: name.clone(),
                reason,
            })?;
        self.register(tool);
        Ok(())
    }

    /// Register several tools in order; later entries win on name collisions
    pub fn register_multiple(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.register_arc(tool);
        }
    }

    /// Remove a tool; returns whether it existed
    pub fn unregister(&mut self, name: &str) -> bool {
        let existed = self.remove_entry(name).is_some();
        if existed {
            info!(tool = %name, "Unregistered tool");
        }
        existed
    }

    fn remove_entry(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let tool = self.tools.remove(name)?;
        if let Some(category) = tool.category() {
            if let Some(names) = self.categories.get_mut(category) {
                names.remove(name);
                if names.is_empty() {
                    self.categories.remove(category);
                }
            }
        }
        Some(tool)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tool names, sorted
    pub fn get_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// All tools, sorted by name
    pub fn get_all(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Tools in a category, sorted by name
    pub fn get_by_category(&self, category: &str) -> Vec<Arc<dyn Tool>> {
        self.categories
            .get(category)
            .map(|names| names.iter().filter_map(|n| self.tools.get(n).cloned()).collect())
            .unwrap_or_default()
    }

    /// Known categories, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.categories.keys().cloned().collect();
        categories.sort();
        categories
    }

    /// Tool specs for backends with native function calling
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.get_all().iter().map(|t| t.to_spec()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run a tool.
    ///
    /// Never fails: unknown tools, invalid arguments, execution errors and
    /// panics all come back as [`ToolResult::Failure`].
    #[instrument(skip(self, args), fields(tool = %name))]
    pub async fn execute(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!("Tool not found");
            let available: Vec<Value> = self.get_names().into_iter().map(Value::String).collect();
            return ToolResult::failure(FailureKind::NotFound, format!("Tool '{}' not found", name))
                .with_metadata("availableTools", Value::Array(available));
        };

        if let Err(reason) = tool.parameters_schema().validate(args) {
            warn!(%reason, "Tool arguments rejected");
            return ToolResult::failure(
                FailureKind::InvalidArguments,
                format!("invalid arguments: {}", reason),
            );
        }

        debug!("Executing tool");
        match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(Ok(output)) => {
                info!("Tool executed successfully");
                ToolResult::success(output)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Tool execution failed");
                ToolResult::failure(FailureKind::ExecutionFailed, e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(%reason, "Tool panicked");
                ToolResult::failure(
                    FailureKind::ExecutionFailed,
                    format!("panicked: {}", reason),
                )
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.get_names())
            .field("categories", &self.categories())
            .finish()
    }
}
