//! LanguageModel trait — the abstraction over LLM backends.
//!
//! A model backend supports three call shapes:
//!
//! 1. [`generate_object`](LanguageModel::generate_object) — a structured
//!    response constrained to a JSON schema (used by the intent
//!    classifier).
//! 2. [`generate_text`](LanguageModel::generate_text) — a plain free-text
//!    completion (used for titles and summaries).
//! 3. [`stream_step`](LanguageModel::stream_step) — one tool-augmented
//!    model step, streamed. The tool-calling loop drives this repeatedly,
//!    feeding tool results back between steps.
//!
//! The loop calls these without knowing which backend is in use — pure
//! polymorphism.

use crate::error::ProviderError;
use crate::message::{ContextMessage, ContextRole, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// The model's call id; echoed back on the result message.
    pub id: String,

    pub name: String,

    /// Arguments as a JSON string (assembled from streamed deltas).
    pub arguments: String,
}

/// One message of a model request, including tool-exchange entries that
/// accumulate across loop steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,

    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// For tool-role messages: which call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A tool result fed back into the exchange.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

impl From<&ContextMessage> for PromptMessage {
    fn from(msg: &ContextMessage) -> Self {
        let role = match msg.role {
            ContextRole::System => Role::System,
            ContextRole::User => Role::User,
            ContextRole::Assistant => Role::Assistant,
        };
        Self {
            role,
            content: msg.content.clone(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A tool-augmented chat request for one model step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System prompt, kept out of `messages` so backends can map it to
    /// their native system slot.
    pub system: String,

    pub messages: Vec<PromptMessage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta.
    #[serde(default)]
    pub content: Option<String>,

    /// Complete tool invocations, present on the final chunk of a step
    /// in which the model requested tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Whether this is the final chunk of the step.
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only on the final chunk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core LanguageModel trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai").
    fn name(&self) -> &str;

    /// Request a structured object conforming to `schema`.
    async fn generate_object(
        &self,
        system: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ProviderError>;

    /// Request a plain free-text completion.
    async fn generate_text(
        &self,
        system: &str,
        prompt: &str,
    ) -> std::result::Result<String, ProviderError>;

    /// Run one tool-augmented model step, streamed.
    ///
    /// The receiver yields text deltas as they arrive; the final chunk
    /// carries any complete tool invocations the model requested.
    async fn stream_step(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    >;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_message_converts_to_prompt_message() {
        let ctx = ContextMessage::assistant("Your order shipped yesterday.");
        let prompt = PromptMessage::from(&ctx);
        assert_eq!(prompt.role, Role::Assistant);
        assert_eq!(prompt.content, "Your order shipped yesterday.");
        assert!(prompt.tool_calls.is_empty());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = PromptMessage::tool_result("call_1", "{\"error\":null,\"data\":[]}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn chat_request_serialization_skips_empty_tools() {
        let req = ChatRequest {
            system: "You are helpful".into(),
            messages: vec![PromptMessage::user("Hi")],
            tools: vec![],
            temperature: 0.7,
            max_tokens: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"tools\""));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "get_order_details".into(),
            description: "Fetch an order by order number".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "order_number": { "type": "string" }
                },
                "required": ["order_number"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("get_order_details"));
        assert!(json.contains("order_number"));
    }
}
