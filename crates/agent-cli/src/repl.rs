//! Interactive REPL for chatting with the agent
//!
//! Readline-style input with history, plus slash commands for in-session
//! control.

use anyhow::Result;
use llm_core::Role;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands::{self, Overrides, Session};

// ANSI colors
const GREEN: &str = "\x1b[92m";
const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub async fn run(overrides: &Overrides) -> Result<()> {
    let mut session = commands::connect(overrides).await?;
    let mut rl = DefaultEditor::new()?;

    print_welcome(&session);

    loop {
        let prompt = format!("{}agent>{} ", CYAN, RESET);

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line.starts_with('/') {
                    if handle_slash_command(&mut session, line) {
                        break;
                    }
                    continue;
                }

                if let Err(e) = send_message(&mut session, line).await {
                    eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                break;
            }
        }
    }

    Ok(())
}

fn print_welcome(session: &Session) {
    let tool_count = session.agent.tools().map_or(0, |t| t.len());
    println!();
    println!("{}ollama-agent{} {}({}){}", BOLD, RESET, DIM, session.base_url, RESET);
    println!("  Model: {}{}{}", BLUE, session.model, RESET);
    println!("  Tools: {} loaded, max {} rounds per question", tool_count, session.agent.config().max_rounds);
    println!("  Type {}/help{} for commands", CYAN, RESET);
    println!();
}

/// Handle a slash command; returns true when the REPL should exit
fn handle_slash_command(session: &mut Session, input: &str) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input).to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => print_help(),
        "/exit" | "/quit" | "/q" => {
            println!("{}Goodbye!{}", DIM, RESET);
            return true;
        }
        "/reset" | "/clear" => {
            session.agent.reset();
            println!("{}Conversation reset{}", DIM, RESET);
        }
        "/tools" => {
            if let Some(registry) = session.agent.tools() {
                commands::print_tools(registry);
            }
        }
        "/history" | "/hist" => print_history(session),
        _ => {
            println!("{}Unknown command:{} {}", YELLOW, RESET, cmd);
            println!("Type {}/help{} for available commands", CYAN, RESET);
        }
    }
    false
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/help{}, /h, /?      Show this help", CYAN, RESET);
    println!("  {}/reset{}, /clear     Start a new conversation", CYAN, RESET);
    println!("  {}/tools{}             List available tools", CYAN, RESET);
    println!("  {}/history{}           Show conversation history", CYAN, RESET);
    println!("  {}/exit{}, /quit, /q   Exit the REPL", CYAN, RESET);
    println!();
    println!("{}Tips:{}", DIM, RESET);
    println!("  - Press Ctrl+C to cancel current input");
    println!("  - Press Ctrl+D to exit");
    println!();
}

fn print_history(session: &Session) {
    let Some(memory) = session.agent.memory() else {
        return;
    };

    let messages: Vec<_> = memory
        .get_messages(None)
        .into_iter()
        .filter(|m| !m.is_system())
        .collect();
    if messages.is_empty() {
        println!("No messages in conversation");
        return;
    }

    println!("{}Conversation History:{}", BOLD, RESET);
    for (i, msg) in messages.iter().enumerate() {
        let role_color = match msg.role {
            Role::User if msg.metadata.contains_key("tool") => BLUE,
            Role::User => CYAN,
            Role::Assistant => GREEN,
            Role::System => YELLOW,
        };
        println!(
            "  {}[{}]{} {}{}:{} {}",
            DIM,
            i + 1,
            RESET,
            role_color,
            msg.role,
            RESET,
            preview(&msg.content, 60)
        );
    }

    let calls = memory.get_tool_calls(None);
    if !calls.is_empty() {
        println!("  {}{} tool call(s) this session{}", DIM, calls.len(), RESET);
    }
}

/// First `max` characters on one line
fn preview(content: &str, max: usize) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

async fn send_message(session: &mut Session, input: &str) -> Result<()> {
    let spinner = commands::thinking_spinner()?;
    let response = session.agent.process(input).await;
    spinner.finish_and_clear();

    if !response.tools_used.is_empty() {
        println!("{}[tools: {}]{}", DIM, response.tools_used.join(", "), RESET);
    }
    // Failed cycles echo the error as content
    if !response.content.is_empty() && response.error.as_deref() != Some(response.content.as_str()) {
        println!("{}", response.content);
    }
    if !response.success {
        if let Some(error) = &response.error {
            eprintln!("{}Warning:{} {}", YELLOW, RESET, error);
        }
    }
    println!();
    Ok(())
}
