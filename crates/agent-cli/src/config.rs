//! User configuration for the agent CLI
//!
//! Configuration file: ~/.config/ollama-agent/config.toml (or platform equivalent)

use agent_core::{AgentConfig, AgentSettings, MemoryConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// User configuration for the agent CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation memory bounds
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Model selection
    #[serde(default)]
    pub model: ModelConfig,

    /// Aliases for models
    #[serde(default)]
    pub aliases: AliasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    /// Default model (falls back to llm.toml, then the first installed model)
    #[serde(default)]
    pub default_model: Option<String>,
}

/// Model aliases
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AliasConfig {
    /// Model aliases (e.g., "fast" -> "qwen2.5:3b")
    #[serde(default)]
    pub models: HashMap<String, String>,
}

const DEFAULT_CONFIG: &str = r#"# ollama-agent configuration
# Location: ~/.config/ollama-agent/config.toml

[agent]
# Maximum model calls per question before the agent is asked to conclude
max_rounds = 10

# Sampling temperature (0.0-2.0)
temperature = 0.7

# Maximum tokens generated per model call
max_tokens = 2048

# Offer tools through the model's native function calling when supported
native_tools = true

# Text placed before the tool list in the system prompt
# system_preamble = "You are a concise assistant."

[memory]
# Messages kept in a conversation, system prompt included
max_messages = 50

# Tool calls kept in the session log
max_tool_calls = 100

[model]
# Default model (uses llm.toml [ollama] model if not set)
# default_model = "llama3.2:3b"

[aliases.models]
# Model aliases for quick access
# fast = "qwen2.5:3b"
# smart = "llama3.1:8b"
"#;

impl UserConfig {
    /// Load user configuration from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ollama-agent").join("config.toml"))
    }

    /// Create a default configuration file with comments
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::create_default_at(&path)?;
        Ok(path)
    }

    pub fn create_default_at(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Resolve a model name (check aliases first)
    pub fn resolve_model(&self, name: &str) -> String {
        self.aliases
            .models
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Settings for building the agent
    pub fn settings(&self) -> AgentSettings {
        AgentSettings {
            agent: self.agent.clone(),
            memory: self.memory.clone(),
        }
    }
}
