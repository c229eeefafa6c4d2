//! Domain event system — decoupled observability for the orchestration
//! pipeline.
//!
//! Events are published as a request moves through classification,
//! compaction, dispatch, and persistence. Subscribers (logging, metrics,
//! dashboards) react without coupling to the orchestrator.

use crate::agent::{AgentType, IntentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user message entered the pipeline.
    MessageReceived {
        conversation_id: String,
        user_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The classifier labeled a message.
    IntentClassified {
        conversation_id: String,
        intent: IntentType,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// Older history was folded into a summary to fit the token budget.
    ContextCompacted {
        conversation_id: String,
        messages_summarized: usize,
        kept_recent: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed inside an agent loop.
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An agent produced its final response text.
    ResponseGenerated {
        conversation_id: String,
        agent: AgentType,
        steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred somewhere in the pipeline.
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Components
/// subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
