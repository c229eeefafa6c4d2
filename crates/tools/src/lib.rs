//! Domain toolsets for the helpdesk support agents.
//!
//! Each agent gets a small, read-mostly toolset: lookups by a natural
//! business key (order number, invoice number), filtered listings scoped
//! to the requesting user, and a free-text search over a static FAQ.
//!
//! Toolsets are built per dispatch via [`toolset_for`]: tools that read
//! per-user data receive the requesting user's id at construction, so
//! they expose no user-id parameter to the model and cross-user access
//! is structurally impossible.

pub mod billing;
pub mod faq;
pub mod order;
pub mod support;

use helpdesk_core::agent::AgentType;
use helpdesk_core::store::{CommerceStore, ConversationStore};
use helpdesk_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the toolset for one agent invocation, bound to `user_id`.
pub fn toolset_for(
    agent: AgentType,
    conversations: Arc<dyn ConversationStore>,
    commerce: Arc<dyn CommerceStore>,
    user_id: &str,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    match agent {
        // The router only classifies; it never calls tools.
        AgentType::Router => {}
        AgentType::Support => {
            registry.register(Box::new(support::SearchFaqTool));
            registry.register(Box::new(support::SearchConversationHistoryTool::new(
                conversations,
                user_id,
            )));
        }
        AgentType::Order => {
            registry.register(Box::new(order::GetOrderDetailsTool::new(commerce.clone())));
            registry.register(Box::new(order::CheckDeliveryStatusTool::new(
                commerce.clone(),
            )));
            registry.register(Box::new(order::ListUserOrdersTool::new(commerce, user_id)));
        }
        AgentType::Billing => {
            registry.register(Box::new(billing::GetInvoiceDetailsTool::new(
                commerce.clone(),
            )));
            registry.register(Box::new(billing::CheckRefundStatusTool::new(
                commerce.clone(),
                user_id,
            )));
            registry.register(Box::new(billing::ListUserInvoicesTool::new(
                commerce, user_id,
            )));
        }
    }
    registry
}
