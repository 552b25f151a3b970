//! Host system information tool

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

/// Tool describing the machine the agent runs on
pub struct SystemInfoTool;

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "system_info"
    }

    fn description(&self) -> &str {
        "Get information about the host system: operating system, architecture, CPU count and process details."
    }

    fn category(&self) -> Option<&str> {
        Some("system")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new().with_property(
            "section",
            ParameterProperty::string("Limit output to one section").with_enum(&["os", "cpu", "process"]),
        )
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let os = json!({
            "name": std::env::consts::OS,
            "family": std::env::consts::FAMILY,
            "arch": std::env::consts::ARCH,
        });
        let cpu = json!({
            "logical_cores": std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        });
        let process = json!({
            "pid": std::process::id(),
            "working_dir": std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "agent_version": env!("CARGO_PKG_VERSION"),
        });

        let value = match args.get("section").and_then(|v| v.as_str()) {
            Some("os") => os,
            Some("cpu") => cpu,
            Some("process") => process,
            _ => json!({ "os": os, "cpu": cpu, "process": process }),
        };

        Ok(ToolOutput::Data(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_report() {
        let ToolOutput::Data(value) = SystemInfoTool.execute(&Map::new()).await.unwrap() else {
            panic!("expected data output");
        };
        assert_eq!(value["os"]["name"], std::env::consts::OS);
        assert!(value["cpu"]["logical_cores"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_single_section() {
        let args = json!({"section": "process"}).as_object().cloned().unwrap();
        let ToolOutput::Data(value) = SystemInfoTool.execute(&args).await.unwrap() else {
            panic!("expected data output");
        };
        assert_eq!(value["pid"], std::process::id());
        assert!(value.get("os").is_none());
    }
}
