//! The orchestrator — composes classification, compaction, and dispatch
//! into the end-to-end flow for one inbound message.
//!
//! Steps are strictly sequential; each depends on the previous one's
//! output. The returned [`ProcessedMessage`] hands the caller a live
//! stream plus routing metadata immediately — persisting the assistant's
//! final text happens afterwards via
//! [`Orchestrator::persist_assistant_response`], fire-and-forget relative
//! to the stream already delivered.

use crate::classifier::IntentClassifier;
use crate::compactor::ContextCompactor;
use crate::registry;
use crate::runner::{AgentRunner, AgentStreamHandle};
use helpdesk_core::agent::{AgentType, IntentClassification};
use helpdesk_core::error::{Error, Result, StorageError};
use helpdesk_core::event::{DomainEvent, EventBus};
use helpdesk_core::message::{Role, StoredMessage};
use helpdesk_core::provider::LanguageModel;
use helpdesk_core::store::{CommerceStore, ConversationStore};
use std::sync::Arc;
use tracing::{info, warn};

/// How many trailing messages feed the classifier's context window.
const CLASSIFIER_WINDOW: usize = 6;

/// Title used when generation fails or returns nothing.
const DEFAULT_TITLE: &str = "New Conversation";

const TITLE_SYSTEM_PROMPT: &str = "Generate a very short title (3-6 words) for a customer support conversation based on the user's first message. Return only the title, nothing else.";

/// Everything the transport layer needs to answer one message.
#[derive(Debug)]
pub struct ProcessedMessage {
    pub conversation_id: String,
    pub agent: AgentType,
    pub intent: IntentClassification,
    pub stream: AgentStreamHandle,
}

pub struct Orchestrator {
    conversations: Arc<dyn ConversationStore>,
    commerce: Arc<dyn CommerceStore>,
    model: Arc<dyn LanguageModel>,
    classifier: IntentClassifier,
    compactor: ContextCompactor,
    max_tool_steps: u32,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        commerce: Arc<dyn CommerceStore>,
        model: Arc<dyn LanguageModel>,
        config: &helpdesk_config::AppConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            compactor: ContextCompactor::new(model.clone(), config.context.max_context_tokens),
            max_tool_steps: config.agent.max_tool_steps,
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            conversations,
            commerce,
            model,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Process one inbound message end to end and return a streaming
    /// handle plus routing metadata.
    pub async fn process_message(
        &self,
        user_id: &str,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ProcessedMessage> {
        // 1. Resolve the conversation.
        let conversation = match conversation_id {
            Some(id) => self
                .conversations
                .get_conversation(id)
                .await?
                .ok_or_else(|| Error::ConversationNotFound(id.to_string()))?,
            None => {
                let title = self.generate_title(message).await?;
                self.conversations
                    .create_conversation(user_id, Some(&title))
                    .await?
            }
        };

        self.event_bus.publish(DomainEvent::MessageReceived {
            conversation_id: conversation.id.clone(),
            user_id: user_id.to_string(),
            content_preview: message.chars().take(80).collect(),
            timestamp: chrono::Utc::now(),
        });

        // 2. Append the user message.
        self.conversations
            .append_message(&conversation.id, Role::User, message, None, None, None)
            .await?;

        // 3. Load the full history and render the classifier's window.
        let history = self.conversations.list_messages(&conversation.id).await?;
        let recent_window = render_recent_window(&history);

        // 4. Classify intent.
        let intent = self
            .classifier
            .classify(message, recent_window.as_deref())
            .await
            .map_err(Error::from_provider)?;

        info!(
            conversation_id = %conversation.id,
            intent = %intent.intent,
            confidence = intent.confidence,
            reasoning = %intent.reasoning,
            "Intent classified"
        );
        self.event_bus.publish(DomainEvent::IntentClassified {
            conversation_id: conversation.id.clone(),
            intent: intent.intent,
            confidence: intent.confidence,
            timestamp: chrono::Utc::now(),
        });

        // 5. Compact context against the token budget.
        let compacted = self
            .compactor
            .prepare(&history, conversation.context_summary.as_deref())
            .await
            .map_err(Error::from_provider)?;

        if let Some(summary) = &compacted.new_summary {
            self.event_bus.publish(DomainEvent::ContextCompacted {
                conversation_id: conversation.id.clone(),
                messages_summarized: compacted.summarized_count,
                kept_recent: compacted.messages.len().saturating_sub(1),
                timestamp: chrono::Utc::now(),
            });
            // Best-effort: a stale summary only costs a little context
            // quality on the next turn.
            if let Err(e) = self
                .conversations
                .update_summary(&conversation.id, summary)
                .await
            {
                warn!(conversation_id = %conversation.id, error = %e, "Failed to persist context summary");
            }
        }

        // 6. Dispatch to the matching agent's tool-calling loop.
        let agent = registry::route(intent.intent);
        let toolset = helpdesk_tools::toolset_for(
            agent,
            self.conversations.clone(),
            self.commerce.clone(),
            user_id,
        );
        let runner = AgentRunner::new(
            self.model.clone(),
            agent,
            registry::system_prompt_for(agent, user_id),
            toolset,
            self.event_bus.clone(),
        )
        .with_max_steps(self.max_tool_steps)
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let stream = runner.start(conversation.id.clone(), compacted.messages);

        Ok(ProcessedMessage {
            conversation_id: conversation.id,
            agent,
            intent,
            stream,
        })
    }

    /// Persist the assistant's final text, tagged with the agent that
    /// produced it. Called after stream completion; failures here are the
    /// caller's to log, never to surface — the user already has their
    /// answer.
    pub async fn persist_assistant_response(
        &self,
        conversation_id: &str,
        agent: AgentType,
        text: &str,
    ) -> std::result::Result<StoredMessage, StorageError> {
        self.conversations
            .append_message(
                conversation_id,
                Role::Assistant,
                text,
                Some(agent),
                None,
                None,
            )
            .await
    }

    /// Generate a short conversation title from the first message.
    /// Best-effort: only quota exhaustion propagates.
    async fn generate_title(&self, message: &str) -> Result<String> {
        match self.model.generate_text(TITLE_SYSTEM_PROMPT, message).await {
            Ok(title) => {
                let title: String = title.trim().chars().take(100).collect();
                if title.is_empty() {
                    Ok(DEFAULT_TITLE.into())
                } else {
                    Ok(title)
                }
            }
            Err(e) if e.is_quota() => Err(Error::from_provider(e)),
            Err(e) => {
                warn!(error = %e, "Title generation failed, using default");
                Ok(DEFAULT_TITLE.into())
            }
        }
    }
}

/// Render the last few turns as `role: content` lines for the
/// classifier.
fn render_recent_window(history: &[StoredMessage]) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    let start = history.len().saturating_sub(CLASSIFIER_WINDOW);
    Some(
        history[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
