//! Conversation and message domain types.
//!
//! Two representations coexist on purpose:
//!
//! - [`StoredMessage`] / [`Conversation`] — the durable records kept by
//!   the conversation store. Append-only; a message is never mutated
//!   after creation.
//! - [`ContextMessage`] — the ephemeral, bounded representation fed to a
//!   model call. Tool-role history is excluded here (it belongs to a
//!   prior tool-calling exchange, not a fresh model call) and a synthetic
//!   system-role summary may be injected at position 0.

use crate::agent::AgentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single persisted message.
///
/// Invariant: an assistant message always carries the agent type that
/// produced it; a user message never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,

    pub conversation_id: String,

    pub role: Role,

    pub content: String,

    /// Set only on assistant messages produced by a specific agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<AgentType>,

    /// Opaque record of tool calls made while producing this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,

    /// Opaque transport/provider metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

/// A persisted conversation, including its ordered messages when loaded
/// through [`crate::store::ConversationStore::get_conversation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,

    pub user_id: String,

    pub title: Option<String>,

    pub status: String,

    /// The agent that produced the most recent assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_agent_type: Option<AgentType>,

    /// The rolling compacted summary of everything compacted so far.
    /// Monotonically replaced, never appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_summary: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Ordered by creation time, ascending.
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Roles allowed in a model-facing context sequence. Tool history is
/// deliberately unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    System,
    User,
    Assistant,
}

/// One entry of the bounded context sequence fed to a model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: ContextRole,
    pub content: String,
}

impl ContextMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Assistant,
            content: content.into(),
        }
    }

    /// Translate a persisted message, dropping tool-role entries.
    pub fn from_stored(message: &StoredMessage) -> Option<Self> {
        let role = match message.role {
            Role::User => ContextRole::User,
            Role::Assistant => ContextRole::Assistant,
            Role::System => ContextRole::System,
            Role::Tool => return None,
        };
        Some(Self {
            role,
            content: message.content.clone(),
        })
    }
}

impl ContextRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ContextRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
