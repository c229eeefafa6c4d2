//! Context compaction — keeping the model's input bounded as a
//! conversation grows.
//!
//! The compactor turns a persisted history (plus an optional existing
//! summary) into a bounded [`ContextMessage`] sequence:
//!
//! 1. An existing summary leads the sequence as a system message.
//! 2. Persisted user/assistant/system messages translate verbatim, in
//!    order; tool-role messages are dropped.
//! 3. Under the token budget, the sequence is returned unchanged.
//! 4. Over budget, the most recent `min(4, len)` messages are kept
//!    verbatim and everything older is folded into a fresh 2–3 sentence
//!    summary via a model call.
//!
//! Summarizer failure degrades to the recent tail alone — losing the
//! summary is acceptable, losing recency is not. The one exception is a
//! provider quota error, which must surface to the caller.

use crate::token;
use helpdesk_core::error::ProviderError;
use helpdesk_core::message::{ContextMessage, StoredMessage};
use helpdesk_core::provider::LanguageModel;
use std::sync::Arc;
use tracing::{debug, warn};

/// How many recent messages survive compaction verbatim (two
/// user/assistant pairs).
pub const KEEP_RECENT_MESSAGES: usize = 4;

/// Prefix for the synthetic system message carrying a summary.
pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

const SUMMARIZER_SYSTEM_PROMPT: &str = "You are a conversation summarizer. Create a concise summary of the conversation below, preserving key details like order numbers, issue descriptions, refund amounts, agent actions taken, and any unresolved issues. Keep it to 2-3 sentences.";

/// The result of preparing context for a model call.
#[derive(Debug, Clone)]
pub struct CompactedContext {
    /// The bounded sequence to feed to the model.
    pub messages: Vec<ContextMessage>,

    /// A fresh summary produced this pass, for persisting to the
    /// conversation. `None` when no compaction happened or the
    /// summarizer failed.
    pub new_summary: Option<String>,

    /// How many messages were dropped from the verbatim sequence.
    pub summarized_count: usize,
}

/// Stateless — create one per orchestrator and reuse it.
pub struct ContextCompactor {
    model: Arc<dyn LanguageModel>,
    max_context_tokens: usize,
}

impl ContextCompactor {
    pub fn new(model: Arc<dyn LanguageModel>, max_context_tokens: usize) -> Self {
        Self {
            model,
            max_context_tokens,
        }
    }

    /// Produce a bounded context sequence from raw history and an
    /// optional existing summary.
    pub async fn prepare(
        &self,
        history: &[StoredMessage],
        existing_summary: Option<&str>,
    ) -> Result<CompactedContext, ProviderError> {
        let mut messages: Vec<ContextMessage> = Vec::with_capacity(history.len() + 1);

        if let Some(summary) = existing_summary {
            if !summary.trim().is_empty() {
                messages.push(ContextMessage::system(format!("{SUMMARY_PREFIX}{summary}")));
            }
        }

        messages.extend(history.iter().filter_map(ContextMessage::from_stored));

        let total = token::estimate_context_tokens(&messages);
        if total <= self.max_context_tokens {
            return Ok(CompactedContext {
                messages,
                new_summary: None,
                summarized_count: 0,
            });
        }

        debug!(
            total_tokens = total,
            budget = self.max_context_tokens,
            messages = messages.len(),
            "Context over budget, compacting"
        );
        self.compact(messages).await
    }

    /// Fold everything but the recent tail into a summary.
    async fn compact(
        &self,
        messages: Vec<ContextMessage>,
    ) -> Result<CompactedContext, ProviderError> {
        let keep = KEEP_RECENT_MESSAGES.min(messages.len());
        let split = messages.len() - keep;
        let (old_head, recent_tail) = messages.split_at(split);

        if old_head.is_empty() {
            // Nothing left to fold — no further reduction possible.
            return Ok(CompactedContext {
                messages: recent_tail.to_vec(),
                new_summary: None,
                summarized_count: 0,
            });
        }

        let transcript = old_head
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        match self
            .model
            .generate_text(SUMMARIZER_SYSTEM_PROMPT, &transcript)
            .await
        {
            Ok(summary) => {
                let summary = summary.trim().to_string();
                let mut compacted =
                    vec![ContextMessage::system(format!("{SUMMARY_PREFIX}{summary}"))];
                compacted.extend_from_slice(recent_tail);
                Ok(CompactedContext {
                    messages: compacted,
                    new_summary: Some(summary),
                    summarized_count: old_head.len(),
                })
            }
            Err(e) if e.is_quota() => Err(e),
            Err(e) => {
                // Fall back to the recent tail without a summary.
                warn!(error = %e, "Compaction summarizer failed, keeping recent tail only");
                Ok(CompactedContext {
                    messages: recent_tail.to_vec(),
                    new_summary: None,
                    summarized_count: old_head.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use helpdesk_core::message::{ContextRole, Role};
    use chrono::Utc;

    fn stored(role: Role, content: &str) -> StoredMessage {
        StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: "conv-1".into(),
            role,
            content: content.into(),
            agent_type: None,
            tool_calls: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    fn compactor_with(model: ScriptedModel, budget: usize) -> ContextCompactor {
        ContextCompactor::new(Arc::new(model), budget)
    }

    #[tokio::test]
    async fn under_budget_history_is_unchanged() {
        let compactor = compactor_with(ScriptedModel::new(), 2000);
        let history = vec![
            stored(Role::User, "Hello"),
            stored(Role::Assistant, "Hi! How can I help?"),
        ];

        let result = compactor.prepare(&history, None).await.unwrap();
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].content, "Hello");
        assert!(result.new_summary.is_none());
        assert_eq!(result.summarized_count, 0);
    }

    #[tokio::test]
    async fn existing_summary_leads_the_sequence() {
        let compactor = compactor_with(ScriptedModel::new(), 2000);
        let history = vec![stored(Role::User, "Any update?")];

        let result = compactor
            .prepare(&history, Some("Customer asked about ORD-002."))
            .await
            .unwrap();
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].role, ContextRole::System);
        assert_eq!(
            result.messages[0].content,
            "Previous conversation summary: Customer asked about ORD-002."
        );
    }

    #[tokio::test]
    async fn tool_messages_are_excluded() {
        let compactor = compactor_with(ScriptedModel::new(), 2000);
        let history = vec![
            stored(Role::User, "Where is ORD-002?"),
            stored(Role::Tool, "{\"error\":null,\"data\":{}}"),
            stored(Role::Assistant, "It shipped yesterday."),
        ];

        let result = compactor.prepare(&history, None).await.unwrap();
        assert_eq!(result.messages.len(), 2);
        assert!(result.messages.iter().all(|m| m.role != ContextRole::System));
    }

    #[tokio::test]
    async fn over_budget_keeps_last_four_verbatim_with_summary() {
        // 5 messages × ~1000 tokens each ≈ 5000 tokens against a 2000 budget.
        let model = ScriptedModel::new().push_text("Customer reported a broken keyboard on ORD-001.");
        let compactor = compactor_with(model, 2000);

        let contents: Vec<String> = (0..5).map(|i| format!("{i}-{}", "x".repeat(4000))).collect();
        let history: Vec<StoredMessage> = contents
            .iter()
            .map(|c| stored(Role::User, c))
            .collect();

        let result = compactor.prepare(&history, None).await.unwrap();

        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.messages[0].role, ContextRole::System);
        assert_eq!(
            result.messages[0].content,
            "Previous conversation summary: Customer reported a broken keyboard on ORD-001."
        );
        // The tail is the last 4 original messages, verbatim and in order.
        for (i, original) in contents[1..].iter().enumerate() {
            assert_eq!(&result.messages[i + 1].content, original);
        }
        assert_eq!(result.new_summary.as_deref(), Some("Customer reported a broken keyboard on ORD-001."));
        assert_eq!(result.summarized_count, 1);
    }

    #[tokio::test]
    async fn summarizer_failure_degrades_to_recent_tail() {
        let model = ScriptedModel::new().push_text_err(ProviderError::Timeout("30s".into()));
        let compactor = compactor_with(model, 2000);

        let history: Vec<StoredMessage> = (0..6)
            .map(|i| stored(Role::User, &format!("{i}-{}", "y".repeat(4000))))
            .collect();

        let result = compactor.prepare(&history, None).await.unwrap();
        assert_eq!(result.messages.len(), KEEP_RECENT_MESSAGES);
        assert!(result.new_summary.is_none());
        // Tail preserved verbatim
        assert!(result.messages[0].content.starts_with("2-"));
        assert!(result.messages[3].content.starts_with("5-"));
    }

    #[tokio::test]
    async fn quota_error_propagates() {
        let model = ScriptedModel::new().push_text_err(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
        let compactor = compactor_with(model, 10);

        let history: Vec<StoredMessage> = (0..6)
            .map(|i| stored(Role::User, &format!("message number {i}")))
            .collect();

        let err = compactor.prepare(&history, None).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn short_over_budget_history_returns_tail_unchanged() {
        // 4 messages over budget: keep = min(4, 4) = 4, old head empty.
        let compactor = compactor_with(ScriptedModel::new(), 10);
        let history: Vec<StoredMessage> = (0..4)
            .map(|i| stored(Role::User, &format!("{i}-{}", "z".repeat(100))))
            .collect();

        let result = compactor.prepare(&history, None).await.unwrap();
        assert_eq!(result.messages.len(), 4);
        assert!(result.new_summary.is_none());
        assert_eq!(result.summarized_count, 0);
    }

    #[tokio::test]
    async fn compaction_is_idempotent_on_compacted_output() {
        let model = ScriptedModel::new().push_text("Summary of the early exchange.");
        let compactor = compactor_with(model, 2000);

        let history: Vec<StoredMessage> = (0..6)
            .map(|i| stored(Role::User, &format!("{i}-{}", "w".repeat(4000))))
            .collect();

        let first = compactor.prepare(&history, None).await.unwrap();
        assert!(first.new_summary.is_some());

        // Re-preparing an under-budget sequence leaves it unchanged. The
        // compacted output is summary + 4 tails, which for this second
        // pass is rebuilt from a short history and the stored summary.
        let short_history: Vec<StoredMessage> = (0..2)
            .map(|i| stored(Role::User, &format!("recent message {i}")))
            .collect();
        let second = compactor
            .prepare(&short_history, first.new_summary.as_deref())
            .await
            .unwrap();
        assert!(second.new_summary.is_none());
        assert_eq!(second.messages.len(), 3);
        assert_eq!(
            second.messages[0].content,
            "Previous conversation summary: Summary of the early exchange."
        );
    }

    #[tokio::test]
    async fn old_summary_is_folded_into_the_new_one() {
        let model = ScriptedModel::new().push_text("Merged summary.");
        let compactor = compactor_with(model, 2000);

        let history: Vec<StoredMessage> = (0..5)
            .map(|i| stored(Role::User, &format!("{i}-{}", "v".repeat(4000))))
            .collect();

        let result = compactor
            .prepare(&history, Some("Older summary text."))
            .await
            .unwrap();

        // The leading summary message plus the oldest history message were
        // folded; only one summary message remains at position 0.
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.summarized_count, 2);
        let system_count = result
            .messages
            .iter()
            .filter(|m| m.role == ContextRole::System)
            .count();
        assert_eq!(system_count, 1);
    }
}
