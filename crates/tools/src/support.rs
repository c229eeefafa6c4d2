//! Support agent tools.
//!
//! - `search_faq` — keyword search over the static FAQ
//! - `search_conversation_history` — the user's past conversations

use crate::faq;
use async_trait::async_trait;
use helpdesk_core::store::ConversationStore;
use helpdesk_core::tool::{Tool, ToolOutcome};
use std::sync::Arc;
use tracing::warn;

/// Most FAQ hits the model should see at once.
const MAX_FAQ_RESULTS: usize = 5;
const DEFAULT_HISTORY_LIMIT: usize = 5;

pub struct SearchFaqTool;

#[async_trait]
impl Tool for SearchFaqTool {
    fn name(&self) -> &str {
        "search_faq"
    }

    fn description(&self) -> &str {
        "Search frequently asked questions and common troubleshooting solutions. Use this for general product questions, how-to guides, or policy inquiries."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "The topic or keywords to search for in FAQs"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let Some(topic) = arguments["topic"].as_str() else {
            return ToolOutcome::fail("Missing 'topic' argument.");
        };

        let results = faq::search(topic);
        if results.is_empty() {
            return ToolOutcome::empty(format!(
                "No FAQ entries found for \"{topic}\". Try rephrasing or I can help directly."
            ));
        }

        let top: Vec<&faq::FaqEntry> = results.into_iter().take(MAX_FAQ_RESULTS).collect();
        match serde_json::to_value(&top) {
            Ok(data) => ToolOutcome::ok(data),
            Err(e) => ToolOutcome::fail(format!("Failed to serialize FAQ entries: {e}")),
        }
    }
}

/// Searches the calling user's past conversations. The user id is fixed
/// at construction; other users' history is unreachable.
pub struct SearchConversationHistoryTool {
    conversations: Arc<dyn ConversationStore>,
    user_id: String,
}

impl SearchConversationHistoryTool {
    pub fn new(conversations: Arc<dyn ConversationStore>, user_id: &str) -> Self {
        Self {
            conversations,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for SearchConversationHistoryTool {
    fn name(&self) -> &str {
        "search_conversation_history"
    }

    fn description(&self) -> &str {
        "Search the customer's past conversations to find relevant context, previous issues discussed, or solutions provided before. Use this when the user references past interactions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Optional keyword to search in message content"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of conversations to return",
                    "default": DEFAULT_HISTORY_LIMIT
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutcome {
        let query = arguments["query"].as_str();
        let limit = arguments["limit"]
            .as_u64()
            .unwrap_or(DEFAULT_HISTORY_LIMIT as u64)
            .min(20) as usize;

        match self
            .conversations
            .search_conversations(&self.user_id, query, limit)
            .await
        {
            Ok(digests) if digests.is_empty() => {
                ToolOutcome::empty("No past conversations found for this user.")
            }
            Ok(digests) => match serde_json::to_value(&digests) {
                Ok(data) => ToolOutcome::ok(data),
                Err(e) => ToolOutcome::fail(format!("Failed to serialize conversations: {e}")),
            },
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Store lookup failed");
                ToolOutcome::fail("Failed to search conversation history.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_store::{SqliteStore, seed};

    async fn conversations() -> Arc<dyn ConversationStore> {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        seed::run(&store).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn faq_search_returns_matches() {
        let tool = SearchFaqTool;
        let outcome = tool.execute(serde_json::json!({"topic": "return"})).await;

        assert!(!outcome.is_error());
        let entries = outcome.data.as_array().unwrap();
        assert!(!entries.is_empty());
        assert!(entries.len() <= MAX_FAQ_RESULTS);
    }

    #[tokio::test]
    async fn faq_miss_is_empty_with_message() {
        let tool = SearchFaqTool;
        let outcome = tool
            .execute(serde_json::json!({"topic": "teleportation"}))
            .await;

        assert!(!outcome.is_error());
        assert_eq!(outcome.data, serde_json::json!([]));
        assert!(outcome.message.unwrap().contains("teleportation"));
    }

    #[tokio::test]
    async fn history_search_is_user_scoped() {
        let store = conversations().await;

        // user-002's seeded conversation mentions the broken chair.
        let tool = SearchConversationHistoryTool::new(store.clone(), "user-002");
        let outcome = tool.execute(serde_json::json!({"query": "armrest"})).await;
        assert!(!outcome.is_error());
        assert_eq!(outcome.data.as_array().unwrap().len(), 1);

        // The same keyword finds nothing for user-001.
        let tool = SearchConversationHistoryTool::new(store, "user-001");
        let outcome = tool.execute(serde_json::json!({"query": "armrest"})).await;
        assert!(!outcome.is_error());
        assert_eq!(
            outcome.message.as_deref(),
            Some("No past conversations found for this user.")
        );
    }

    #[tokio::test]
    async fn history_search_without_query_lists_recent() {
        let tool = SearchConversationHistoryTool::new(conversations().await, "user-001");
        let outcome = tool.execute(serde_json::json!({})).await;

        assert!(!outcome.is_error());
        let digests = outcome.data.as_array().unwrap();
        assert_eq!(digests.len(), 1);
        assert!(!digests[0]["recent_messages"].as_array().unwrap().is_empty());
    }
}
