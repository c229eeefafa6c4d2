//! The bounded tool-calling loop.
//!
//! One runner drives one agent invocation: the model either answers with
//! text (ending the exchange) or requests tool calls, which execute and
//! feed back as input for the next step. A hard step ceiling backstops
//! runaway tool-call cycles.
//!
//! The loop runs in a spawned task. Callers get an
//! [`AgentStreamHandle`]: an event receiver for live progress and a
//! oneshot that resolves with the full response text once the exchange
//! completes — the handle's two halves let streaming and persistence
//! proceed independently. The full-text channel is dropped (never
//! resolved) if the exchange dies on a provider error, so a persistence
//! task awaiting it simply observes a closed channel.

use crate::stream_event::AgentStreamEvent;
use helpdesk_core::agent::AgentType;
use helpdesk_core::event::{DomainEvent, EventBus};
use helpdesk_core::message::ContextMessage;
use helpdesk_core::provider::{ChatRequest, LanguageModel, PromptMessage, Usage};
use helpdesk_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default step ceiling, matching the configured default.
pub const DEFAULT_MAX_STEPS: u32 = 5;

/// Canned reply when the step ceiling is hit without a text response.
const MAX_STEPS_REPLY: &str =
    "I wasn't able to complete this request within the allowed number of lookup steps. Could you rephrase or narrow down what you need?";

/// The streaming handle returned to the caller.
#[derive(Debug)]
pub struct AgentStreamHandle {
    /// Live events: text chunks, tool invocations, completion.
    pub events: mpsc::Receiver<AgentStreamEvent>,

    /// Resolves with the full response text after the exchange completes
    /// successfully. Closed without a value on mid-stream failure.
    pub full_text: oneshot::Receiver<String>,
}

/// Drives one bounded exchange between an agent and the model.
pub struct AgentRunner {
    model: Arc<dyn LanguageModel>,
    agent: AgentType,
    system_prompt: String,
    tools: ToolRegistry,
    max_steps: u32,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Arc<EventBus>,
}

impl AgentRunner {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        agent: AgentType,
        system_prompt: impl Into<String>,
        tools: ToolRegistry,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            model,
            agent,
            system_prompt: system_prompt.into(),
            tools,
            max_steps: DEFAULT_MAX_STEPS,
            temperature: 0.7,
            max_tokens: None,
            event_bus,
        }
    }

    /// Set the step ceiling.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Start the exchange over the given bounded context. Consumes the
    /// runner; the loop runs to completion in a background task
    /// regardless of whether the caller keeps listening.
    pub fn start(self, conversation_id: impl Into<String>, context: Vec<ContextMessage>) -> AgentStreamHandle {
        let (event_tx, event_rx) = mpsc::channel(128);
        let (text_tx, text_rx) = oneshot::channel();
        let conversation_id = conversation_id.into();

        tokio::spawn(self.run(conversation_id, context, event_tx, text_tx));

        AgentStreamHandle {
            events: event_rx,
            full_text: text_rx,
        }
    }

    async fn run(
        self,
        conversation_id: String,
        context: Vec<ContextMessage>,
        events: mpsc::Sender<AgentStreamEvent>,
        full_text: oneshot::Sender<String>,
    ) {
        let mut messages: Vec<PromptMessage> = context.iter().map(PromptMessage::from).collect();
        let tool_definitions = self.tools.definitions();

        let mut answer = String::new();
        let mut steps = 0usize;
        let mut total_tool_calls = 0usize;
        let mut last_usage: Option<Usage> = None;

        info!(
            conversation_id = %conversation_id,
            agent = %self.agent,
            context_messages = messages.len(),
            "Agent exchange starting"
        );

        loop {
            if steps >= self.max_steps as usize {
                // Backstop, not a normal termination path.
                warn!(
                    conversation_id = %conversation_id,
                    agent = %self.agent,
                    steps,
                    "Step ceiling reached, ending exchange"
                );
                let _ = events
                    .send(AgentStreamEvent::Chunk {
                        content: MAX_STEPS_REPLY.into(),
                    })
                    .await;
                let _ = events
                    .send(AgentStreamEvent::Done {
                        steps,
                        tool_calls_made: total_tool_calls,
                        usage: last_usage,
                    })
                    .await;
                let _ = full_text.send(MAX_STEPS_REPLY.into());
                return;
            }
            steps += 1;

            debug!(conversation_id = %conversation_id, step = steps, "Agent loop step");

            let request = ChatRequest {
                system: self.system_prompt.clone(),
                messages: messages.clone(),
                tools: tool_definitions.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let mut stream = match self.model.stream_step(request).await {
                Ok(rx) => rx,
                Err(e) => {
                    self.report_error(&conversation_id, &events, &e.to_string()).await;
                    return;
                }
            };

            let mut step_text = String::new();
            let mut requested_calls = Vec::new();

            while let Some(chunk_result) = stream.recv().await {
                match chunk_result {
                    Ok(chunk) => {
                        if let Some(text) = &chunk.content {
                            if !text.is_empty() {
                                step_text.push_str(text);
                                answer.push_str(text);
                                let _ = events
                                    .send(AgentStreamEvent::Chunk {
                                        content: text.clone(),
                                    })
                                    .await;
                            }
                        }
                        if !chunk.tool_calls.is_empty() {
                            requested_calls.extend(chunk.tool_calls);
                        }
                        if let Some(usage) = chunk.usage {
                            last_usage = Some(usage);
                        }
                    }
                    Err(e) => {
                        self.report_error(&conversation_id, &events, &e.to_string()).await;
                        return;
                    }
                }
            }

            if requested_calls.is_empty() {
                // Terminal text response.
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    conversation_id: conversation_id.clone(),
                    agent: self.agent,
                    steps,
                    timestamp: chrono::Utc::now(),
                });

                info!(
                    conversation_id = %conversation_id,
                    agent = %self.agent,
                    steps,
                    tool_calls = total_tool_calls,
                    "Agent exchange completed"
                );

                let _ = events
                    .send(AgentStreamEvent::Done {
                        steps,
                        tool_calls_made: total_tool_calls,
                        usage: last_usage,
                    })
                    .await;
                let _ = full_text.send(answer);
                return;
            }

            // The model requested tools — record its message, execute each
            // call, and feed the outcomes back for the next step.
            let mut assistant = PromptMessage::assistant(step_text);
            assistant.tool_calls = requested_calls.clone();
            messages.push(assistant);

            for invocation in requested_calls {
                total_tool_calls += 1;

                let arguments: serde_json::Value =
                    serde_json::from_str(&invocation.arguments).unwrap_or_default();

                let _ = events
                    .send(AgentStreamEvent::ToolCall {
                        id: invocation.id.clone(),
                        name: invocation.name.clone(),
                        input: arguments.clone(),
                    })
                    .await;

                let call = ToolCall {
                    id: invocation.id.clone(),
                    name: invocation.name.clone(),
                    arguments,
                };

                let started = std::time::Instant::now();
                let outcome = self.tools.execute(&call).await;
                let duration_ms = started.elapsed().as_millis() as u64;

                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: invocation.name.clone(),
                    success: !outcome.is_error(),
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });

                let rendered = outcome.render();
                let _ = events
                    .send(AgentStreamEvent::ToolResult {
                        id: invocation.id.clone(),
                        name: invocation.name.clone(),
                        output: rendered.clone(),
                        success: !outcome.is_error(),
                    })
                    .await;

                messages.push(PromptMessage::tool_result(invocation.id, rendered));
            }
        }
    }

    async fn report_error(
        &self,
        conversation_id: &str,
        events: &mpsc::Sender<AgentStreamEvent>,
        message: &str,
    ) {
        warn!(conversation_id, agent = %self.agent, error = message, "Agent exchange failed");
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: format!("agent loop ({})", self.agent),
            error_message: message.to_string(),
            timestamp: chrono::Utc::now(),
        });
        let _ = events
            .send(AgentStreamEvent::Error {
                message: message.to_string(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, make_tool_invocation};
    use async_trait::async_trait;
    use helpdesk_core::error::ProviderError;
    use helpdesk_core::tool::{Tool, ToolOutcome};

    /// A lookup tool with one known key, used to exercise the feedback
    /// path without a real store.
    struct OrderStub;

    #[async_trait]
    impl Tool for OrderStub {
        fn name(&self) -> &str {
            "get_order_details"
        }
        fn description(&self) -> &str {
            "Fetch an order by order number"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "order_number": { "type": "string" } },
                "required": ["order_number"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
            match arguments["order_number"].as_str() {
                Some("ORD-001") => ToolOutcome::ok(serde_json::json!({
                    "order_number": "ORD-001",
                    "status": "delivered"
                })),
                Some(other) => ToolOutcome::fail(format!("Order \"{other}\" not found.")),
                None => ToolOutcome::fail("Missing 'order_number' argument."),
            }
        }
    }

    fn runner_with(model: ScriptedModel, tools: ToolRegistry) -> AgentRunner {
        AgentRunner::new(
            Arc::new(model),
            AgentType::Order,
            "You are an order agent.\n\nCurrent user ID: user-001",
            tools,
            Arc::new(EventBus::default()),
        )
    }

    async fn collect(mut handle: AgentStreamHandle) -> (Vec<AgentStreamEvent>, Option<String>) {
        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }
        let text = handle.full_text.await.ok();
        (events, text)
    }

    #[tokio::test]
    async fn simple_text_response() {
        let model = ScriptedModel::new().push_step_text("Hello! How can I help with your order?");
        let handle = runner_with(model, ToolRegistry::new())
            .start("conv-1", vec![ContextMessage::user("Hi")]);

        let (events, text) = collect(handle).await;

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                AgentStreamEvent::Chunk { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, "Hello! How can I help with your order?");
        assert_eq!(text.as_deref(), Some("Hello! How can I help with your order?"));

        match events.last().unwrap() {
            AgentStreamEvent::Done {
                steps,
                tool_calls_made,
                ..
            } => {
                assert_eq!(*steps, 1);
                assert_eq!(*tool_calls_made, 0);
            }
            other => panic!("Expected Done, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_call_round_trip() {
        let model = ScriptedModel::new()
            .push_step_tool_calls(
                "",
                vec![make_tool_invocation(
                    "get_order_details",
                    serde_json::json!({"order_number": "ORD-001"}),
                )],
            )
            .push_step_text("Your order ORD-001 was delivered.");

        let mut tools = ToolRegistry::new();
        tools.register(Box::new(OrderStub));

        let shared = model.clone();
        let handle = runner_with(model, tools)
            .start("conv-1", vec![ContextMessage::user("Where is ORD-001?")]);
        let (events, text) = collect(handle).await;

        assert!(events.iter().any(|e| matches!(
            e,
            AgentStreamEvent::ToolCall { name, .. } if name == "get_order_details"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentStreamEvent::ToolResult { success: true, .. }
        )));
        assert_eq!(text.as_deref(), Some("Your order ORD-001 was delivered."));

        // The second step's request must carry the tool result message.
        let requests = shared.recorded_step_requests();
        assert_eq!(requests.len(), 2);
        let fed_back = &requests[1].messages;
        assert!(fed_back.iter().any(|m| {
            m.tool_call_id.as_deref() == Some("call_get_order_details")
                && m.content.contains("\"status\":\"delivered\"")
        }));
    }

    #[tokio::test]
    async fn failed_lookup_feeds_back_instead_of_terminating() {
        let model = ScriptedModel::new()
            .push_step_tool_calls(
                "",
                vec![make_tool_invocation(
                    "get_order_details",
                    serde_json::json!({"order_number": "ORD-999"}),
                )],
            )
            .push_step_text("I couldn't find order ORD-999. Could you double-check the number?");

        let mut tools = ToolRegistry::new();
        tools.register(Box::new(OrderStub));

        let shared = model.clone();
        let handle = runner_with(model, tools)
            .start("conv-1", vec![ContextMessage::user("Where is ORD-999?")]);
        let (events, text) = collect(handle).await;

        // The miss surfaces as an unsuccessful tool result, not a stream error.
        assert!(events.iter().any(|e| matches!(
            e,
            AgentStreamEvent::ToolResult { success: false, output, .. }
                if output.contains("Order \\\"ORD-999\\\" not found.")
        )));
        assert!(!events.iter().any(|e| matches!(e, AgentStreamEvent::Error { .. })));
        assert!(text.unwrap().contains("ORD-999"));

        // The error outcome was fed back as model input for the next step.
        let requests = shared.recorded_step_requests();
        let fed_back = &requests[1].messages;
        assert!(fed_back.iter().any(|m| {
            m.content.contains("Order \\\"ORD-999\\\" not found.") && m.content.contains("\"data\":null")
        }));
    }

    #[tokio::test]
    async fn step_ceiling_ends_the_exchange() {
        // The model keeps asking for tools and never answers.
        let mut model = ScriptedModel::new();
        for _ in 0..10 {
            model = model.push_step_tool_calls(
                "",
                vec![make_tool_invocation(
                    "get_order_details",
                    serde_json::json!({"order_number": "ORD-001"}),
                )],
            );
        }

        let mut tools = ToolRegistry::new();
        tools.register(Box::new(OrderStub));

        let handle = runner_with(model, tools)
            .with_max_steps(3)
            .start("conv-1", vec![ContextMessage::user("loop forever")]);
        let (events, text) = collect(handle).await;

        match events.last().unwrap() {
            AgentStreamEvent::Done {
                steps,
                tool_calls_made,
                ..
            } => {
                assert_eq!(*steps, 3);
                assert_eq!(*tool_calls_made, 3);
            }
            other => panic!("Expected Done, got {other:?}"),
        }
        assert_eq!(text.as_deref(), Some(MAX_STEPS_REPLY));
    }

    #[tokio::test]
    async fn provider_failure_emits_error_and_drops_full_text() {
        let model = ScriptedModel::new()
            .push_step_err(ProviderError::Network("connection refused".into()));

        let handle = runner_with(model, ToolRegistry::new())
            .start("conv-1", vec![ContextMessage::user("Hi")]);
        let (events, text) = collect(handle).await;

        assert!(matches!(
            events.last().unwrap(),
            AgentStreamEvent::Error { .. }
        ));
        // No text to persist — the oneshot was dropped unresolved.
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_becomes_a_failed_result() {
        let model = ScriptedModel::new()
            .push_step_tool_calls(
                "",
                vec![make_tool_invocation("no_such_tool", serde_json::json!({}))],
            )
            .push_step_text("Sorry, I can't do that.");

        let handle = runner_with(model, ToolRegistry::new())
            .start("conv-1", vec![ContextMessage::user("Hi")]);
        let (events, text) = collect(handle).await;

        assert!(events.iter().any(|e| matches!(
            e,
            AgentStreamEvent::ToolResult { success: false, .. }
        )));
        assert_eq!(text.as_deref(), Some("Sorry, I can't do that."));
    }
}
