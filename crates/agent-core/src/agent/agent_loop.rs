//! Agent loop implementation

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use llm_core::{GenerationConfig, ModelGateway, NewMessage};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AgentError, Result};
use crate::memory::{ConversationMemory, NewToolCall};
use crate::tools::builtin::create_default_registry;
use crate::tools::registry::panic_message;
use crate::tools::{FailureKind, ToolRegistry, ToolResult};

use super::directive::{extract_tool_call, format_directive};
use super::prompt::build_system_prompt;
use super::state::{AgentConfig, AgentResponse, AgentSettings, RunState};

/// Sent when the round budget runs out
pub const CONCLUDE_PROMPT: &str = "You have reached the maximum number of tool rounds. \
Please provide your final answer now based on the information gathered so far, \
without using any more tools.";

/// How a processing cycle ended, short of an error
enum Outcome {
    Answered(String),
    Exhausted {
        content: String,
        final_error: Option<String>,
    },
}

/// The reasoning/acting loop for one conversation
pub struct AgentLoop {
    gateway: Option<Arc<dyn ModelGateway>>,
    memory: Option<ConversationMemory>,
    tools: Option<ToolRegistry>,
    config: AgentConfig,
    /// System prompt installed for the current session
    initialized: bool,
}

impl AgentLoop {
    /// Create an unbound loop; bind collaborators with the `with_*` methods
    pub fn new(config: AgentConfig) -> Self {
        Self {
            gateway: None,
            memory: None,
            tools: None,
            config,
            initialized: false,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = Some(memory);
        self.initialized = false;
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// True once gateway, memory and tools are all bound
    pub fn is_ready(&self) -> bool {
        self.gateway.is_some() && self.memory.is_some() && self.tools.is_some()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn memory(&self) -> Option<&ConversationMemory> {
        self.memory.as_ref()
    }

    pub fn tools(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref()
    }

    /// Mutable access to the registry. Tools added here show up in the
    /// system prompt after the next [`reset`](Self::reset).
    pub fn tools_mut(&mut self) -> Option<&mut ToolRegistry> {
        self.tools.as_mut()
    }

    /// Start a fresh session; the system prompt is rebuilt on the next call
    pub fn reset(&mut self) {
        if let Some(memory) = self.memory.as_mut() {
            memory.clear();
        }
        self.initialized = false;
        info!("Agent session reset");
    }

    /// Run one user turn to completion.
    ///
    /// Never fails: gateway errors, readiness problems and panics inside the
    /// cycle all come back as an unsuccessful [`AgentResponse`].
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub async fn process(&mut self, input: &str) -> AgentResponse {
        let mut run = RunState::default();
        let outcome = AssertUnwindSafe(self.run_cycle(input, &mut run))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(Outcome::Answered(content))) => {
                info!(rounds = run.round, tools = run.tools_used.len(), "Agent produced a final answer");
                AgentResponse::completed(content, run)
            }
            Ok(Ok(Outcome::Exhausted { content, final_error })) => {
                warn!(rounds = run.round, "Agent stopped at the round limit");
                AgentResponse::exhausted(content, run, self.config.max_rounds, final_error)
            }
            Ok(Err(e)) => {
                error!(error = %e, rounds = run.round, "Agent cycle failed");
                AgentResponse::failed(&e, run)
            }
            Err(panic) => {
                let e = AgentError::Unexpected(format!("panic during processing: {}", panic_message(panic.as_ref())));
                error!(error = %e, rounds = run.round, "Agent cycle panicked");
                AgentResponse::failed(&e, run)
            }
        }
    }

    async fn run_cycle(&mut self, input: &str, run: &mut RunState) -> Result<Outcome> {
        let gateway = self.gateway.clone().ok_or(AgentError::NotReady("model gateway"))?;
        let tools = self.tools.as_ref().ok_or(AgentError::NotReady("tool registry"))?;
        let memory = self.memory.as_mut().ok_or(AgentError::NotReady("conversation memory"))?;

        if !self.initialized {
            let prompt = build_system_prompt(tools, self.config.system_preamble.as_deref());
            memory.set_system_message(prompt);
            self.initialized = true;
            debug!(session = %memory.session_id(), tools = tools.len(), "Installed system prompt");
        }

        memory.add_message(NewMessage::user(input));

        let generation = generation_config(&self.config, tools);
        let max_rounds = self.config.max_rounds;

        while run.round < max_rounds {
            run.round += 1;
            let history = memory.get_messages(None);
            debug!(
                round = run.round,
                messages = history.len(),
                gateway = %gateway.describe(),
                "Requesting model response"
            );

            let response = gateway
                .generate(&history, &generation)
                .await
                .map_err(AgentError::Gateway)?;

            let Some(call) = extract_tool_call(&response) else {
                memory.add_message(NewMessage::assistant(response.content.clone()));
                return Ok(Outcome::Answered(response.content));
            };

            // Keep the request visible in history even when it came back structured
            let request = if response.content.trim().is_empty() {
                format_directive(&call.name, &call.arguments)
            } else {
                response.content
            };
            memory.add_message(NewMessage::assistant(request));

            info!(round = run.round, tool = %call.name, "Dispatching tool call");
            let result = tools.execute(&call.name, &call.arguments).await;
            let feedback = tool_feedback(&call.name, &result);
            let succeeded = result.is_success();

            memory.add_tool_call(NewToolCall::new(call.name.clone(), call.arguments, result));
            memory.add_message(
                NewMessage::user(feedback)
                    .with_metadata("kind", "tool_result")
                    .with_metadata("tool", call.name.clone())
                    .with_metadata("success", succeeded),
            );

            if succeeded {
                run.tools_used.push(call.name);
            }
        }

        warn!(max_rounds, "Round budget exhausted, asking the model to conclude");
        memory.add_message(NewMessage::user(CONCLUDE_PROMPT).with_metadata("kind", "conclude"));

        let history = memory.get_messages(None);
        let final_config = generation.with_tools(Vec::new());
        match gateway.generate(&history, &final_config).await {
            Ok(response) => {
                memory.add_message(NewMessage::assistant(response.content.clone()));
                Ok(Outcome::Exhausted {
                    content: response.content,
                    final_error: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "Concluding model call failed");
                Ok(Outcome::Exhausted {
                    content: String::new(),
                    final_error: Some(format!("{:#}", e)),
                })
            }
        }
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("gateway", &self.gateway.as_ref().map(|g| g.describe()))
            .field("memory", &self.memory.as_ref().map(|m| m.len()))
            .field("tools", &self.tools.as_ref().map(|t| t.get_names()))
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Build a ready agent with the built-in tools and a fresh memory
pub fn create_agent(gateway: Arc<dyn ModelGateway>, settings: AgentSettings) -> AgentLoop {
    AgentLoop::new(settings.agent)
        .with_gateway(gateway)
        .with_memory(ConversationMemory::new(settings.memory))
        .with_tools(create_default_registry())
}

fn generation_config(config: &AgentConfig, tools: &ToolRegistry) -> GenerationConfig {
    let specs = if config.native_tools {
        tools.tool_specs()
    } else {
        Vec::new()
    };
    GenerationConfig::default()
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_tools(specs)
}

/// Message fed back to the model after a tool ran
fn tool_feedback(name: &str, result: &ToolResult) -> String {
    match result {
        ToolResult::Success { output } => format!("Tool '{}' returned:\n{}", name, output),
        ToolResult::Failure {
            kind: FailureKind::NotFound,
            error,
            metadata,
        } => {
            let available: Vec<&str> = metadata
                .get("availableTools")
                .and_then(|v| v.as_array())
                .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
                .unwrap_or_default();
            if available.is_empty() {
                format!("{}.", error)
            } else {
                format!("{}. Available tools: {}", error, available.join(", "))
            }
        }
        ToolResult::Failure { error, .. } => format!("Tool '{}' failed: {}", name, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PanickingGateway, ScriptedGateway};
    use llm_core::{ModelResponse, Role};
    use serde_json::json;

    fn agent_with(gateway: Arc<ScriptedGateway>, max_rounds: usize) -> AgentLoop {
        let settings = AgentSettings {
            agent: AgentConfig::default().with_max_rounds(max_rounds),
            ..Default::default()
        };
        create_agent(gateway, settings)
    }

    #[tokio::test]
    async fn test_plain_answer_takes_one_round() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelResponse::text("Hello there!")]));
        let mut agent = agent_with(gateway.clone(), 10);

        let response = agent.process("hi").await;

        assert!(response.success);
        assert_eq!(response.content, "Hello there!");
        assert_eq!(response.rounds, 1);
        assert!(response.tools_used.is_empty());
        assert!(response.error.is_none());
        assert_eq!(gateway.call_count(), 1);

        let messages = agent.memory().unwrap().get_messages(None);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_directive_runs_tool_then_answers() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::text(r#"**USE_TOOL: calculator({"expression":"2+3*4"})**"#),
            ModelResponse::text("The answer is 14."),
        ]));
        let mut agent = agent_with(gateway.clone(), 10);

        let response = agent.process("What is 2+3*4?").await;

        assert!(response.success);
        assert_eq!(response.rounds, 2);
        assert_eq!(response.tools_used, vec!["calculator"]);
        assert_eq!(response.content, "The answer is 14.");

        let memory = agent.memory().unwrap();
        let calls = memory.get_tool_calls(None);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].result.as_ref().unwrap().is_success());

        // Second call saw the tool output
        let (history, _) = gateway.call(1);
        let feedback = &history[history.len() - 1];
        assert_eq!(feedback.role, Role::User);
        assert!(feedback.content.starts_with("Tool 'calculator' returned:\n"));
        assert!(feedback.content.contains("14"));
        assert_eq!(feedback.metadata["tool"], "calculator");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_and_loop_continues() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::text("**USE_TOOL: teleport()**"),
            ModelResponse::text("I cannot do that."),
        ]));
        let mut agent = agent_with(gateway.clone(), 10);

        let response = agent.process("beam me up").await;

        assert!(response.success);
        assert_eq!(response.rounds, 2);
        assert!(response.tools_used.is_empty());

        let (history, _) = gateway.call(1);
        let feedback = history.last().unwrap();
        assert!(feedback.content.starts_with("Tool 'teleport' not found. Available tools: calculator"));
        assert_eq!(feedback.content.matches("teleport").count(), 1);
    }

    #[tokio::test]
    async fn test_runaway_expression_comes_back_as_tool_failure() {
        let expression = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::default().with_tool_call("calculator", json!({ "expression": expression })),
            ModelResponse::text("done"),
        ]));
        let mut agent = agent_with(gateway, 10);

        let response = agent.process("nest").await;

        assert!(response.success);
        assert_eq!(response.content, "done");
        assert!(response.tools_used.is_empty());
        let calls = agent.memory().unwrap().get_tool_calls(None);
        assert_eq!(calls[0].result.as_ref().unwrap().failure_kind(), Some(FailureKind::ExecutionFailed));
    }

    #[tokio::test]
    async fn test_failure_feedback_names_tool_once() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::text("**USE_TOOL: calculator({})**"),
            ModelResponse::text(r#"**USE_TOOL: calculator({"expression":"1/0"})**"#),
            ModelResponse::text("Sorry."),
        ]));
        let mut agent = agent_with(gateway.clone(), 10);

        agent.process("divide").await;

        let (history, _) = gateway.call(1);
        let invalid = &history.last().unwrap().content;
        assert!(invalid.starts_with("Tool 'calculator' failed: invalid arguments: missing required parameter"));
        assert_eq!(invalid.matches("calculator").count(), 1);

        let (history, _) = gateway.call(2);
        assert_eq!(history.last().unwrap().content, "Tool 'calculator' failed: Division by zero");
    }

    #[tokio::test]
    async fn test_round_budget_forces_conclusion() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::text(r#"**USE_TOOL: calculator({"expression":"1+1"})**"#),
            ModelResponse::text("It is 2."),
        ]));
        let mut agent = agent_with(gateway.clone(), 1);

        let response = agent.process("1+1?").await;

        assert!(!response.success);
        assert_eq!(response.rounds, 1);
        assert_eq!(response.content, "It is 2.");
        assert_eq!(response.tools_used, vec!["calculator"]);
        assert!(response.error.unwrap().contains("maximum of 1 rounds"));
        assert_eq!(gateway.call_count(), 2);

        let (history, config) = gateway.call(1);
        assert_eq!(history.last().unwrap().content, CONCLUDE_PROMPT);
        assert!(config.tools.is_empty());
    }

    #[tokio::test]
    async fn test_model_calls_are_bounded() {
        let gateway = Arc::new(ScriptedGateway::repeating(ModelResponse::text(
            "**USE_TOOL: current_time()**",
        )));
        let mut agent = agent_with(gateway.clone(), 3);

        let response = agent.process("what time is it?").await;

        assert!(!response.success);
        assert_eq!(response.rounds, 3);
        assert_eq!(gateway.call_count(), 4);
        // The forced reply is kept as-is, directive and all
        assert_eq!(response.content, "**USE_TOOL: current_time()**");
    }

    #[tokio::test]
    async fn test_failed_conclusion_leaves_empty_content() {
        let gateway = Arc::new(
            ScriptedGateway::new(vec![ModelResponse::text("**USE_TOOL: current_time()**")])
                .then_error("connection reset"),
        );
        let mut agent = agent_with(gateway, 1);

        let response = agent.process("time?").await;

        assert!(!response.success);
        assert!(response.content.is_empty());
        let error = response.error.unwrap();
        assert!(error.contains("concluding call failed: connection reset"));
        let last = agent.memory().unwrap().get_messages(None).pop().unwrap();
        assert_eq!(last.content, CONCLUDE_PROMPT);
    }

    #[tokio::test]
    async fn test_gateway_error_aborts() {
        let gateway = Arc::new(ScriptedGateway::new(Vec::new()).then_error("model not loaded"));
        let mut agent = agent_with(gateway.clone(), 10);

        let response = agent.process("hi").await;

        assert!(!response.success);
        assert_eq!(response.rounds, 1);
        assert_eq!(gateway.call_count(), 1);
        let error = response.error.unwrap();
        assert!(error.contains("model not loaded"));
        assert_eq!(response.content, error);
    }

    #[tokio::test]
    async fn test_not_ready_mutates_nothing() {
        let mut agent = AgentLoop::new(AgentConfig::default()).with_memory(ConversationMemory::default());
        assert!(!agent.is_ready());

        let response = agent.process("hi").await;

        assert!(!response.success);
        assert_eq!(response.rounds, 0);
        assert!(response.error.unwrap().contains("not ready"));
        assert!(agent.memory().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut agent = create_agent(Arc::new(PanickingGateway), AgentSettings::default());

        let response = agent.process("hi").await;

        assert!(!response.success);
        assert_eq!(response.rounds, 1);
        assert!(response.error.unwrap().contains("gateway blew up"));
    }

    #[tokio::test]
    async fn test_structured_call_is_preferred() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelResponse::default().with_tool_call("calculator", json!({"expression": "6*7"})),
            ModelResponse::text("42"),
        ]));
        let mut agent = agent_with(gateway.clone(), 10);

        let response = agent.process("6*7?").await;

        assert!(response.success);
        assert_eq!(response.tools_used, vec!["calculator"]);

        // Structured requests are recorded in directive form
        let messages = agent.memory().unwrap().get_messages(None);
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(messages[2].content.starts_with("**USE_TOOL: calculator("));

        let (_, config) = gateway.call(0);
        assert_eq!(config.tools.len(), agent.tools().unwrap().len());
    }

    #[tokio::test]
    async fn test_native_tools_can_be_disabled() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelResponse::text("ok")]));
        let settings = AgentSettings {
            agent: AgentConfig::default().with_native_tools(false),
            ..Default::default()
        };
        let mut agent = create_agent(gateway.clone(), settings);

        agent.process("hi").await;

        let (_, config) = gateway.call(0);
        assert!(config.tools.is_empty());
    }

    #[tokio::test]
    async fn test_system_prompt_installed_once_and_after_reset() {
        let gateway = Arc::new(ScriptedGateway::repeating(ModelResponse::text("ok")));
        let mut agent = agent_with(gateway, 10);

        agent.process("one").await;
        agent.process("two").await;
        let memory = agent.memory().unwrap();
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.get_messages(None).iter().filter(|m| m.is_system()).count(), 1);

        agent.reset();
        assert_eq!(agent.memory().unwrap().len(), 1);

        assert!(agent.tools_mut().unwrap().unregister("calculator"));
        agent.process("three").await;
        let messages = agent.memory().unwrap().get_messages(None);
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_system());
        assert!(!messages[0].content.contains("- calculator:"));
        assert!(messages[0].content.contains("- statistics:"));
    }
}
