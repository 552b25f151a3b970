//! Conversation memory
//!
//! Session-scoped message log plus a bounded log of tool calls. The system
//! message, when present, always sits at index 0 and survives trimming and
//! clearing.

use chrono::{DateTime, Utc};
use llm_core::{Message, NewMessage, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::tools::ToolResult;

/// Size bounds for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum messages kept, system message included
    pub max_messages: usize,
    /// Maximum tool-call records kept
    pub max_tool_calls: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_tool_calls: 100,
        }
    }
}

/// A dispatched tool call and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub args: Map<String, Value>,
    pub result: Option<ToolResult>,
    pub timestamp: DateTime<Utc>,
}

/// A tool call record that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewToolCall {
    pub name: String,
    pub args: Map<String, Value>,
    pub result: Option<ToolResult>,
}

impl NewToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>, result: ToolResult) -> Self {
        Self {
            name: name.into(),
            args,
            result: Some(result),
        }
    }
}

/// State of one conversational session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            tool_calls: Vec::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-process, ephemeral conversation memory
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    session: Session,
    config: MemoryConfig,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            session: Session::new(),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// Store a message, then trim to the configured bound.
    ///
    /// A system-role message replaces the current system message instead of
    /// being appended.
    pub fn add_message(&mut self, message: NewMessage) -> Message {
        if message.role == Role::System {
            return self.install_system(message);
        }

        let message = Message::from_new(message);
        self.session.messages.push(message.clone());
        self.trim_messages();
        self.touch();
        message
    }

    /// Store a tool call record, then trim the tool-call log
    pub fn add_tool_call(&mut self, call: NewToolCall) -> ToolCallRecord {
        let record = ToolCallRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: call.name,
            args: call.args,
            result: call.result,
            timestamp: Utc::now(),
        };
        self.session.tool_calls.push(record.clone());

        let max = self.config.max_tool_calls;
        let len = self.session.tool_calls.len();
        if len > max {
            self.session.tool_calls.drain(..len - max);
        }
        self.touch();
        record
    }

    /// The most recent `limit` messages (or all), oldest first
    pub fn get_messages(&self, limit: Option<usize>) -> Vec<Message> {
        let messages = &self.session.messages;
        let start = limit.map_or(0, |n| messages.len().saturating_sub(n));
        messages[start..].to_vec()
    }

    /// The most recent `limit` tool call records (or all), oldest first
    pub fn get_tool_calls(&self, limit: Option<usize>) -> Vec<ToolCallRecord> {
        let calls = &self.session.tool_calls;
        let start = limit.map_or(0, |n| calls.len().saturating_sub(n));
        calls[start..].to_vec()
    }

    /// Replace the system message, keeping it first
    pub fn set_system_message(&mut self, content: impl Into<String>) -> Message {
        self.install_system(NewMessage::system(content))
    }

    fn install_system(&mut self, message: NewMessage) -> Message {
        let message = Message::from_new(message);
        self.session.messages.retain(|m| !m.is_system());
        self.session.messages.insert(0, message.clone());
        self.trim_messages();
        self.touch();
        message
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.session.messages.first().filter(|m| m.is_system())
    }

    /// Drop everything except the system message
    pub fn clear(&mut self) {
        self.session.messages.retain(|m| m.is_system());
        self.session.tool_calls.clear();
        self.touch();
        debug!(session = %self.session.session_id, "Cleared conversation memory");
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.session.metadata.insert(key.into(), value.into());
        self.touch();
    }

    /// Number of stored messages, system message included
    pub fn len(&self) -> usize {
        self.session.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.messages.is_empty()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.session.updated_at
    }

    fn trim_messages(&mut self) {
        let len = self.session.messages.len();
        let max = self.config.max_messages;
        if len <= max {
            return;
        }

        let start = usize::from(self.system_message().is_some());
        let dropped = (len - max).min(len - start);
        self.session.messages.drain(start..start + dropped);
        debug!(dropped, kept = self.session.messages.len(), "Trimmed conversation history");
    }

    fn touch(&mut self) {
        self.session.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FailureKind;

    fn memory(max_messages: usize, max_tool_calls: usize) -> ConversationMemory {
        ConversationMemory::new(MemoryConfig {
            max_messages,
            max_tool_calls,
        })
    }

    #[test]
    fn test_add_message_assigns_identity() {
        let mut memory = ConversationMemory::default();
        let stored = memory.add_message(NewMessage::user("hello"));
        assert!(!stored.id.is_empty());
        assert_eq!(memory.get_messages(None), vec![stored]);
    }

    #[test]
    fn test_trim_keeps_system_first() {
        let mut memory = memory(5, 10);
        memory.set_system_message("you are helpful");
        for i in 0..12 {
            memory.add_message(NewMessage::user(format!("msg {}", i)));
        }

        let messages = memory.get_messages(None);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, Role::System);
        let contents: Vec<&str> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 8", "msg 9", "msg 10", "msg 11"]);
    }

    #[test]
    fn test_trim_without_system_is_fifo() {
        let mut memory = memory(3, 10);
        for i in 0..5 {
            memory.add_message(NewMessage::assistant(format!("{}", i)));
        }
        let contents: Vec<String> = memory.get_messages(None).into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_get_messages_limit() {
        let mut memory = ConversationMemory::default();
        memory.set_system_message("sys");
        memory.add_message(NewMessage::user("a"));
        memory.add_message(NewMessage::assistant("b"));

        let recent = memory.get_messages(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "a");
        assert_eq!(recent[1].content, "b");
        assert_eq!(memory.get_messages(Some(10)).len(), 3);
    }

    #[test]
    fn test_get_messages_is_a_snapshot() {
        let mut memory = ConversationMemory::default();
        memory.add_message(NewMessage::user("a"));
        let snapshot = memory.get_messages(None);
        memory.add_message(NewMessage::user("b"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_set_system_message_replaces() {
        let mut memory = ConversationMemory::default();
        memory.add_message(NewMessage::user("first"));
        memory.set_system_message("old");
        memory.set_system_message("new");

        let messages = memory.get_messages(None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "new");
        assert_eq!(messages.iter().filter(|m| m.is_system()).count(), 1);
    }

    #[test]
    fn test_system_role_through_add_message_is_installed_first() {
        let mut memory = ConversationMemory::default();
        memory.add_message(NewMessage::user("hi"));
        memory.add_message(NewMessage::system("rules"));

        assert_eq!(memory.system_message().unwrap().content, "rules");
        assert_eq!(memory.get_messages(None)[1].content, "hi");
    }

    #[test]
    fn test_clear_keeps_system_message() {
        let mut memory = ConversationMemory::default();
        memory.set_system_message("sys");
        memory.add_message(NewMessage::user("a"));
        memory.add_tool_call(NewToolCall::new("calculator", Map::new(), ToolResult::success("1")));

        let before = memory.updated_at();
        memory.clear();

        assert_eq!(memory.len(), 1);
        assert!(memory.system_message().is_some());
        assert!(memory.get_tool_calls(None).is_empty());
        assert!(memory.updated_at() >= before);
    }

    #[test]
    fn test_tool_call_log_is_fifo() {
        let mut memory = memory(10, 2);
        for name in ["a", "b", "c"] {
            memory.add_tool_call(NewToolCall::new(
                name,
                Map::new(),
                ToolResult::failure(FailureKind::NotFound, "missing"),
            ));
        }
        let names: Vec<String> = memory.get_tool_calls(None).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_updated_at_bumped_on_mutation() {
        let mut memory = ConversationMemory::default();
        let created = memory.session().created_at;
        memory.add_message(NewMessage::user("x"));
        assert!(memory.updated_at() >= created);
        memory.set_metadata("channel", "cli");
        assert_eq!(memory.session().metadata["channel"], "cli");
    }
}
