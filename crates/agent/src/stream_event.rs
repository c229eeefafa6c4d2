//! Agent-level streaming events.
//!
//! `AgentStreamEvent` wraps the tool-calling loop's progress into events
//! the gateway forwards to clients over SSE:
//!
//! - `chunk`       — partial text token from the model
//! - `tool_call`   — the agent is invoking a tool
//! - `tool_result` — tool execution completed
//! - `done`        — the exchange is complete
//! - `error`       — an error occurred mid-stream

use helpdesk_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted by the tool-calling loop during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the model.
    Chunk { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed. `success` is false when the outcome
    /// carried an error — the exchange continues either way.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The exchange is complete — final metadata.
    Done {
        steps: usize,
        tool_calls_made: usize,
        usage: Option<Usage>,
    },

    /// An error occurred mid-stream.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = AgentStreamEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_tool_call() {
        let event = AgentStreamEvent::ToolCall {
            id: "call_1".into(),
            name: "get_order_details".into(),
            input: serde_json::json!({"order_number": "ORD-001"}),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_call""#));
        assert!(json.contains(r#""name":"get_order_details""#));
    }

    #[test]
    fn event_serialization_done() {
        let event = AgentStreamEvent::Done {
            steps: 2,
            tool_calls_made: 1,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            }),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""steps":2"#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            AgentStreamEvent::Chunk { content: "x".into() }.event_type(),
            "chunk"
        );
        assert_eq!(
            AgentStreamEvent::Error { message: "x".into() }.event_type(),
            "error"
        );
        assert_eq!(
            AgentStreamEvent::Done {
                steps: 0,
                tool_calls_made: 0,
                usage: None
            }
            .event_type(),
            "done"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"chunk","content":"hi"}"#;
        let event: AgentStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentStreamEvent::Chunk { content } => assert_eq!(content, "hi"),
            _ => panic!("Wrong variant"),
        }
    }
}
