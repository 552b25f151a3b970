//! Descriptive statistics tool

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

/// Tool computing summary statistics over a list of numbers
pub struct StatisticsTool;

#[async_trait]
impl Tool for StatisticsTool {
    fn name(&self) -> &str {
        "statistics"
    }

    fn description(&self) -> &str {
        "Compute summary statistics (count, sum, mean, median, min, max, population standard deviation) for a list of numbers."
    }

    fn category(&self) -> Option<&str> {
        Some("math")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new().with_required("numbers", ParameterProperty::array("Numbers to summarize"))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let raw = args
            .get("numbers")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Missing required parameter: numbers"))?;

        let numbers = raw
            .iter()
            .enumerate()
            .map(|(i, v)| v.as_f64().ok_or_else(|| anyhow!("Element {} is not a number: {}", i, v)))
            .collect::<Result<Vec<f64>>>()?;

        Ok(ToolOutput::Data(summarize(&numbers)?))
    }
}

fn summarize(numbers: &[f64]) -> Result<Value> {
    if numbers.is_empty() {
        bail!("Cannot summarize an empty list");
    }

    let count = numbers.len() as f64;
    let sum: f64 = numbers.iter().sum();
    let mean = sum / count;
    let variance = numbers.iter().map(|n| (n - mean).powi(2)).sum::<f64>() / count;

    let mut sorted = numbers.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(json!({
        "count": numbers.len(),
        "sum": sum,
        "mean": mean,
        "median": median,
        "min": sorted[0],
        "max": sorted[sorted.len() - 1],
        "std_dev": variance.sqrt(),
    }))
}
