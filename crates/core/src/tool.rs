//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are narrow, schema-typed lookups the model may invoke
//! mid-exchange: fetch an order, list invoices, search the FAQ.
//!
//! Tool execution is data, not exceptions: every call produces a
//! [`ToolOutcome`] with an error channel, and the outcome — including a
//! failed one — is fed back to the model as input for the next step. The
//! model narrates lookup misses to the user; they never crash the
//! exchange.

use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The model's call id (echoed back on the result).
    pub id: String,

    pub name: String,

    /// Arguments as a JSON value.
    pub arguments: serde_json::Value,
}

/// The discriminated result of a tool execution.
///
/// Exactly one of `error`/`data` is meaningful: `{error: string, data:
/// null}` on failure, `{error: null, data: <payload>}` on success. An
/// optional `message` gives the model a human-readable note when the
/// result set is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub error: Option<String>,

    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolOutcome {
    /// A successful outcome carrying a payload.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            error: None,
            data,
            message: None,
        }
    }

    /// A successful outcome with an empty result set and a note for the
    /// model to relay.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            error: None,
            data: serde_json::Value::Array(Vec::new()),
            message: Some(message.into()),
        }
    }

    /// A failed outcome. The error text is shown to the model verbatim.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            data: serde_json::Value::Null,
            message: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize for feeding back into the model exchange.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // Outcome values are built from already-valid JSON; this arm
            // exists only to keep the tool contract panic-free.
            "{\"error\":\"Failed to serialize tool result.\",\"data\":null}".into()
        })
    }
}

/// The core Tool trait.
///
/// Each domain tool (order lookup, invoice listing, FAQ search, ...)
/// implements this. Tools are registered per agent in a [`ToolRegistry`]
/// scoped to the requesting user.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_order_details").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. Infallible by contract — failures are encoded in
    /// the outcome's error channel.
    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of the tools available to one agent invocation.
///
/// Built per dispatch: tools that read per-user data are constructed with
/// the requesting user's id baked in, so cross-user access is
/// structurally impossible.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        // HashMap order is nondeterministic; keep requests reproducible.
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call. Never fails: an unknown tool name becomes a
    /// failed outcome the model can react to.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        match self.tools.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => ToolOutcome::fail(format!("Unknown tool \"{}\".", call.name)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
            match arguments["text"].as_str() {
                Some(text) => ToolOutcome::ok(serde_json::json!({ "text": text })),
                None => ToolOutcome::fail("Missing 'text' argument."),
            }
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let outcome = registry.execute(&call).await;
        assert!(!outcome.is_error());
        assert_eq!(outcome.data["text"], "hello world");
    }

    #[tokio::test]
    async fn unknown_tool_becomes_failed_outcome() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let outcome = registry.execute(&call).await;
        assert!(outcome.is_error());
        assert!(outcome.error.unwrap().contains("nonexistent"));
    }

    #[tokio::test]
    async fn bad_arguments_become_failed_outcome() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({}),
        };
        let outcome = registry.execute(&call).await;
        assert!(outcome.is_error());
    }

    #[test]
    fn outcome_render_has_error_channel() {
        let outcome = ToolOutcome::fail("Order \"ORD-999\" not found.");
        let rendered = outcome.render();
        assert!(rendered.contains("\"error\":\"Order \\\"ORD-999\\\" not found.\""));
        assert!(rendered.contains("\"data\":null"));
    }

    #[test]
    fn empty_outcome_carries_message() {
        let outcome = ToolOutcome::empty("No refund requests found.");
        assert!(!outcome.is_error());
        assert_eq!(outcome.data, serde_json::json!([]));
        let rendered = outcome.render();
        assert!(rendered.contains("No refund requests found."));
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        struct Named(&'static str);
        #[async_trait]
        impl Tool for Named {
            fn name(&self) -> &str {
                self.0
            }
            fn description(&self) -> &str {
                "test"
            }
            fn parameters_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object", "properties": {}})
            }
            async fn execute(&self, _arguments: serde_json::Value) -> ToolOutcome {
                ToolOutcome::ok(serde_json::Value::Null)
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Named("zeta")));
        registry.register(Box::new(Named("alpha")));
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "alpha");
        assert_eq!(defs[1].name, "zeta");
    }
}
