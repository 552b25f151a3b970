//! Current date/time tool

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::fmt::Write;

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

/// Tool reporting the current date and time
pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time, in UTC or the local timezone, optionally with a strftime format."
    }

    fn category(&self) -> Option<&str> {
        Some("time")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_property(
                "timezone",
                ParameterProperty::string("Timezone to report (default: utc)").with_enum(&["utc", "local"]),
            )
            .with_property("format", ParameterProperty::string("strftime format, e.g. '%Y-%m-%d %H:%M'"))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let local = args.get("timezone").and_then(|v| v.as_str()) == Some("local");
        let format = args.get("format").and_then(|v| v.as_str());

        let (iso, formatted, timezone) = if local {
            let now = Local::now();
            (now.to_rfc3339(), format.map(|f| render(&now, f)).transpose()?, "local")
        } else {
            let now = Utc::now();
            (now.to_rfc3339(), format.map(|f| render(&now, f)).transpose()?, "utc")
        };

        let mut value = json!({
            "iso8601": iso,
            "timezone": timezone,
            "unix": Utc::now().timestamp(),
        });
        if let Some(formatted) = formatted {
            value["formatted"] = Value::String(formatted);
        }

        Ok(ToolOutput::Data(value))
    }
}

/// Format without panicking on bad strftime specifiers
fn render<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> Result<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", now.format(format)).map_err(|_| anyhow!("Invalid format string '{}'", format))?;
    Ok(out)
}
