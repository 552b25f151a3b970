//! Command implementations

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use agent_core::tools::builtin::create_default_registry;
use agent_core::{create_agent, AgentLoop, ToolRegistry};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use llm_core::{Config, OllamaClient};
use tracing::{debug, info, warn};

use crate::config::UserConfig;

// ANSI colors
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Values given on the command line, taking precedence over config files
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub host: Option<String>,
    pub max_rounds: Option<usize>,
}

/// A connected agent and the model it talks to
pub struct Session {
    pub agent: AgentLoop,
    pub model: String,
    pub base_url: String,
}

/// Connect to Ollama and build an agent from config files plus overrides
pub async fn connect(overrides: &Overrides) -> Result<Session> {
    let mut config = match Config::try_load() {
        Some(cfg) => cfg,
        None => {
            debug!("llm.toml not found, using defaults");
            Config::default_minimal()
        }
    };
    if let Some(host) = &overrides.host {
        config.set_host(host);
    }

    let user_config = UserConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable user config");
        UserConfig::default()
    });

    let mut client = config.client(String::new())?;
    if !client.health_check().await? {
        anyhow::bail!(
            "Ollama is not reachable at {}.\nStart it with: ollama serve",
            client.base_url()
        );
    }

    let model = match pick_model(overrides.model.as_deref(), &user_config, &config) {
        Some(model) => model,
        None => first_installed_model(&client).await?,
    };
    client.set_model(model.clone());
    info!(%model, url = %client.base_url(), "Connected to Ollama");

    let mut settings = user_config.settings();
    if let Some(max_rounds) = overrides.max_rounds {
        settings.agent.max_rounds = max_rounds;
    }

    let base_url = client.base_url().to_string();
    Ok(Session {
        agent: create_agent(Arc::new(client), settings),
        model,
        base_url,
    })
}

/// Model precedence: CLI flag > user config > llm.toml; aliases resolved
fn pick_model(cli: Option<&str>, user_config: &UserConfig, config: &Config) -> Option<String> {
    cli.map(str::to_string)
        .or_else(|| user_config.model.default_model.clone())
        .or_else(|| config.ollama.model.clone())
        .map(|name| user_config.resolve_model(&name))
}

async fn first_installed_model(client: &OllamaClient) -> Result<String> {
    let models = client.list_models().await?;
    let first = models
        .into_iter()
        .next()
        .context("No models installed. Pull one with: ollama pull <name>")?;
    eprintln!("{}Info:{} No default model configured, using: {}", DIM, RESET, first.name);
    Ok(first.name)
}

/// Spinner shown while the agent works
pub fn thinking_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// One-shot question
pub async fn ask(prompt: &str, stdin: bool, json_output: bool, overrides: &Overrides) -> Result<()> {
    let mut input = String::new();
    if stdin {
        let mut piped = String::new();
        io::stdin().read_to_string(&mut piped).context("Failed to read stdin")?;
        if !piped.trim().is_empty() {
            input.push_str("```\n");
            input.push_str(piped.trim_end());
            input.push_str("\n```\n\n");
        }
    }
    input.push_str(prompt);

    if input.trim().is_empty() {
        anyhow::bail!("Nothing to ask. Pass a prompt or use --stdin");
    }

    let mut session = connect(overrides).await?;

    let response = if json_output {
        session.agent.process(&input).await
    } else {
        let spinner = thinking_spinner()?;
        let response = session.agent.process(&input).await;
        spinner.finish_and_clear();
        response
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if !response.content.is_empty() && response.error.as_deref() != Some(response.content.as_str()) {
        println!("{}", response.content);
    }
    if !response.tools_used.is_empty() {
        eprintln!(
            "{}[{} rounds, tools: {}]{}",
            DIM,
            response.rounds,
            response.tools_used.join(", "),
            RESET
        );
    }

    match response.error {
        Some(error) if !response.success => anyhow::bail!(error),
        _ => Ok(()),
    }
}

/// List built-in tools
pub fn tools(json_output: bool) -> Result<()> {
    let registry = create_default_registry();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&registry.tool_specs())?);
        return Ok(());
    }

    print_tools(&registry);
    Ok(())
}

/// Print tools grouped by category
pub fn print_tools(registry: &ToolRegistry) {
    println!("{}Available tools:{}", BOLD, RESET);
    for category in registry.categories() {
        println!();
        println!("  {}{}{}", YELLOW, category, RESET);
        for tool in registry.get_by_category(&category) {
            println!("    {}{:<14}{} {}", CYAN, tool.name(), RESET, tool.description());
        }
    }

    let uncategorized: Vec<_> = registry
        .get_all()
        .into_iter()
        .filter(|t| t.category().is_none())
        .collect();
    if !uncategorized.is_empty() {
        println!();
        println!("  {}other{}", YELLOW, RESET);
        for tool in uncategorized {
            println!("    {}{:<14}{} {}", CYAN, tool.name(), RESET, tool.description());
        }
    }
    println!();
}

/// Write a commented default user config
pub fn config_init() -> Result<()> {
    let path = UserConfig::create_default()?;
    println!("{}✓{} Created {}", GREEN, RESET, path.display());
    Ok(())
}

pub fn config_path() -> Result<()> {
    let path = UserConfig::config_path()?;
    let note = if path.exists() { "" } else { " (not created yet)" };
    println!("{}{}", path.display(), note);
    Ok(())
}
