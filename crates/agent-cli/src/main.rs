//! agent: tool-using assistant for local LLMs
//!
//! Chats with a model served by Ollama and lets it call built-in tools.

mod commands;
mod config;
mod repl;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use commands::Overrides;

#[derive(Debug, Parser)]
#[command(name = "agent")]
#[command(about = "Tool-using assistant for local LLMs", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model to use (overrides config; aliases allowed)
    #[arg(short, long, global = true, env = "AGENT_MODEL")]
    model: Option<String>,

    /// Ollama host (overrides llm.toml)
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Maximum tool rounds per question
    #[arg(long, global = true)]
    max_rounds: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start interactive chat REPL
    Chat,

    /// One-shot question (non-interactive)
    Ask {
        /// The prompt to send
        prompt: Vec<String>,

        /// Read additional input from stdin
        #[arg(long)]
        stdin: bool,

        /// Output the full agent response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in tools
    Tools {
        /// Output tool specs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the user config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Write a commented default config file
    Init,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides = Overrides {
        model: cli.model,
        host: cli.host,
        max_rounds: cli.max_rounds,
    };

    match cli.command {
        Some(Commands::Chat) | None => repl::run(&overrides).await,
        Some(Commands::Ask { prompt, stdin, json }) => {
            commands::ask(&prompt.join(" "), stdin, json, &overrides).await
        }
        Some(Commands::Tools { json }) => commands::tools(json),
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => commands::config_init(),
            ConfigAction::Path => commands::config_path(),
        },
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "agent", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from(["agent", "ask", "what", "is", "2+2", "--json", "--max-rounds", "3"]).unwrap();
        assert_eq!(cli.max_rounds, Some(3));
        match cli.command {
            Some(Commands::Ask { prompt, json, stdin }) => {
                assert_eq!(prompt.join(" "), "what is 2+2");
                assert!(json);
                assert!(!stdin);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
