//! Storage traits — conversation persistence and the commerce data the
//! agent tools read.
//!
//! Both traits are implemented by the `helpdesk-store` crate against
//! SQLite; the orchestrator and tools only ever see the traits, which
//! keeps tests on in-memory fixtures.

use crate::agent::AgentType;
use crate::error::StorageError;
use crate::message::{Conversation, Role, StoredMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a user's conversation listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPage {
    pub items: Vec<ConversationSummary>,
    pub total: usize,
}

/// A conversation summary for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub status: String,
    pub last_agent_type: Option<AgentType>,
    /// Content of the most recent message, if any.
    pub last_message: Option<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A compact view of a past conversation returned by the support agent's
/// history search: the conversation header plus its most recent messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDigest {
    pub id: String,
    pub title: Option<String>,
    pub last_agent_type: Option<AgentType>,
    pub updated_at: DateTime<Utc>,
    /// Up to the last 3 messages, newest first.
    pub recent_messages: Vec<DigestMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestMessage {
    pub role: Role,
    pub content: String,
    pub agent_type: Option<AgentType>,
    pub created_at: DateTime<Utc>,
}

/// Durable storage for conversations and their append-only message logs.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, StorageError>;

    /// Load a conversation with its messages ordered by creation time
    /// ascending. `None` if the id does not exist.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError>;

    /// Append a message and bump the conversation's `updated_at` (and
    /// `last_agent_type` when an agent type is given).
    #[allow(clippy::too_many_arguments)]
    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        agent_type: Option<AgentType>,
        tool_calls: Option<serde_json::Value>,
        metadata: Option<serde_json::Value>,
    ) -> Result<StoredMessage, StorageError>;

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StorageError>;

    /// Replace the conversation's rolling context summary.
    async fn update_summary(
        &self,
        conversation_id: &str,
        summary: &str,
    ) -> Result<(), StorageError>;

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ConversationPage, StorageError>;

    /// Delete a conversation and (cascading) its messages. Returns false
    /// if the id did not exist.
    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError>;

    /// Search a user's past conversations, optionally filtered by a
    /// message-content keyword, newest first.
    async fn search_conversations(
        &self,
        user_id: &str,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationDigest>, StorageError>;
}

// ── Commerce records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Requested,
    Processing,
    Approved,
    Rejected,
    Completed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(Self::Requested),
            "processing" => Some(Self::Processing),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchased line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    pub category: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
}

/// An order. `invoice` and `refunds` are populated only by
/// [`CommerceStore::order_by_number`]; listings omit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub shipping_address: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refunds: Vec<Refund>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice fields embedded in an order lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoice_number: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub user_id: String,
    pub order_id: String,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Populated only by [`CommerceStore::invoice_by_number`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub order_number: String,
    pub user_id: String,
    pub amount: f64,
    pub status: RefundStatus,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Read-only access to the commerce data the agent tools query.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Full order lookup by its natural business key, including items,
    /// invoice summary, and refunds.
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, StorageError>;

    /// A user's orders, newest first, optionally filtered by status.
    async fn orders_for_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, StorageError>;

    /// Full invoice lookup by invoice number, including order items.
    async fn invoice_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, StorageError>;

    /// A user's invoices, newest first, optionally filtered by status.
    async fn invoices_for_user(
        &self,
        user_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, StorageError>;

    /// Refunds matching an order number and/or a user id, newest first.
    /// At least one filter must be supplied by the caller.
    async fn refunds(
        &self,
        order_number: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<Refund>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("returned"), None);
    }

    #[test]
    fn invoice_status_serde_is_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Overdue).unwrap();
        assert_eq!(json, "\"overdue\"");
    }

    #[test]
    fn refund_status_round_trips() {
        for status in [
            RefundStatus::Requested,
            RefundStatus::Processing,
            RefundStatus::Approved,
            RefundStatus::Rejected,
            RefundStatus::Completed,
        ] {
            assert_eq!(RefundStatus::parse(status.as_str()), Some(status));
        }
    }
}
