//! Configuration management for llm.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ollama::OllamaClient;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Model used when neither the CLI nor the user config picks one
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    11434
}

fn default_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Load configuration from llm.toml
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_path()?)
    }

    /// Try to load configuration, returning None if not found
    pub fn try_load() -> Option<Self> {
        Self::load().ok()
    }

    /// Create a minimal default configuration for when llm.toml is missing
    pub fn default_minimal() -> Self {
        Self {
            ollama: OllamaConfig {
                host: default_host(),
                port: default_port(),
                model: None,
                timeout_secs: default_timeout_secs(),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find llm.toml by searching current directory and parents
    pub fn find_config_path() -> Result<PathBuf> {
        let mut current = std::env::current_dir()?;

        for _ in 0..10 {
            let candidate = current.join("llm.toml");
            if candidate.exists() {
                return Ok(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        anyhow::bail!("llm.toml not found in current directory or parents")
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        if self.ollama.host.starts_with("http://") || self.ollama.host.starts_with("https://") {
            format!("{}:{}", self.ollama.host.trim_end_matches('/'), self.ollama.port)
        } else {
            format!("http://{}:{}", self.ollama.host, self.ollama.port)
        }
    }

    /// Point at `host`, which may carry a scheme and a port (as `OLLAMA_HOST` does)
    pub fn set_host(&mut self, host: &str) {
        let host = host.trim().trim_end_matches('/');
        let start = host.find("://").map_or(0, |i| i + 3);
        if let Some((name, port)) = host[start..].rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                self.ollama.host = format!("{}{}", &host[..start], name);
                self.ollama.port = port;
                return;
            }
        }
        self.ollama.host = host.to_string();
    }

    /// Build a gateway client for `model`
    pub fn client(&self, model: impl Into<String>) -> Result<OllamaClient> {
        OllamaClient::new(
            self.ollama_url(),
            model,
            Duration::from_secs(self.ollama.timeout_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[ollama]
host = "10.0.0.5"
port = 11500
model = "qwen2.5:7b"
timeout_secs = 30
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.ollama.port, 11500);
        assert_eq!(config.ollama.model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(config.ollama_url(), "http://10.0.0.5:11500");
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = toml::from_str("[ollama]\n").unwrap();
        assert_eq!(config.ollama.host, "127.0.0.1");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.ollama.timeout_secs, 120);
        assert!(config.ollama.model.is_none());
    }

    #[test]
    fn test_url_with_scheme() {
        let mut config = Config::default_minimal();
        config.ollama.host = "https://llm.internal/".to_string();
        assert_eq!(config.ollama_url(), "https://llm.internal:11434");
    }

    #[test]
    fn test_set_host_accepts_port_and_scheme() {
        let mut config = Config::default_minimal();
        config.set_host("0.0.0.0:11500");
        assert_eq!(config.ollama_url(), "http://0.0.0.0:11500");

        config.set_host("http://gpu-box:8080/");
        assert_eq!(config.ollama_url(), "http://gpu-box:8080");

        config.set_host("localhost");
        assert_eq!(config.ollama_url(), "http://localhost:8080");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.toml");
        std::fs::write(&path, "[ollama]\nmodel = \"llama3.2\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ollama.model.as_deref(), Some("llama3.2"));
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let err = Config::load_from("/nonexistent/llm.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
