//! Conversation message types shared by the gateway and agent memory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message stored in a conversation
///
/// Messages are immutable once created. Identity and timestamp are assigned
/// by the memory that stores them, see [`NewMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Author role
    pub role: Role,
    /// Text content
    pub content: String,
    /// When the message was stored
    pub timestamp: DateTime<Utc>,
    /// Free-form annotations (tool name, message kind, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Message {
    /// Stamp a new message with a fresh id and the current time
    pub fn from_new(new: NewMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: new.role,
            content: new.content,
            timestamp: Utc::now(),
            metadata: new.metadata,
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A message that has not been stored yet (no id, no timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
