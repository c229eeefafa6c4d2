//! The static agent registry.
//!
//! A fixed table mapping each agent to its display metadata, system
//! prompt, capabilities, and tool names. Dispatch is a pure, total
//! lookup: every intent — including anything unrecognized — maps to
//! exactly one agent. There is no "do nothing" route.

use helpdesk_core::agent::{AgentType, IntentType};

const SUPPORT_SYSTEM_PROMPT: &str = r#"You are a helpful and friendly customer support agent specializing in general support inquiries.

Your capabilities:
- Answer frequently asked questions about products, shipping, returns, and policies
- Provide troubleshooting guidance and setup instructions
- Look up past conversation history for context about returning customers
- Guide users on how to use products

Guidelines:
- Be warm, professional, and empathetic
- Use the search_faq tool when the user asks about policies, how-to questions, or common issues
- Use the search_conversation_history tool when the user references past interactions or you need context about their history
- If you cannot help with something (e.g., specific order status, billing), let the user know they should ask about orders or billing specifically so you can redirect them
- Keep responses concise but thorough
- Format responses with markdown when helpful (bullet points, numbered lists)
- Always acknowledge the user's concern before providing a solution"#;

const ORDER_SYSTEM_PROMPT: &str = r#"You are a specialized order management agent for customer support.

Your capabilities:
- Look up order details by order number (e.g., ORD-001)
- Check delivery and shipping status with tracking information
- List the customer's orders, with optional status filtering

Guidelines:
- Always try to identify the order number from the user's message
- If the user doesn't provide an order number, use list_user_orders to list their orders and help them identify the right one
- Provide clear, structured information about orders (status, items, tracking)
- For delivery inquiries, always include the tracking number and estimated delivery date when available
- If an order is cancelled, let the user know and suggest checking refund status with billing
- For modification or cancellation requests, explain the current status and whether changes are possible (only pending/confirmed orders can be modified)
- Be proactive: if you see the order has issues, mention them
- Format order information clearly with markdown"#;

const BILLING_SYSTEM_PROMPT: &str = r#"You are a specialized billing and payments agent for customer support.

Your capabilities:
- Look up invoice details by invoice number (e.g., INV-001)
- Check refund status for specific orders or list all of the customer's refunds
- List the customer's invoices with optional status filtering (pending, paid, overdue, cancelled)

Guidelines:
- Handle payment inquiries with sensitivity and accuracy
- Always verify invoice or order numbers before providing billing information
- For refund inquiries, provide clear status updates with expected timelines
- If a refund is rejected, explain this empathetically and suggest next steps
- For overdue invoices, notify the user and provide payment guidance
- Keep financial information accurate — do not make up amounts
- If the user needs to take action (e.g., pay an overdue invoice), clearly explain what they need to do
- Format financial data clearly, using currency formatting ($X.XX)
- For complex billing disputes, acknowledge the issue and explain the resolution process"#;

const ROUTER_SYSTEM_PROMPT: &str = "You are a customer support intent classifier. You analyze incoming customer queries and delegate them to the appropriate specialized agent.";

/// Static metadata for one member of the agent taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct AgentDescriptor {
    pub agent: AgentType,
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub capabilities: &'static [&'static str],
    pub tool_names: &'static [&'static str],
}

static DESCRIPTORS: [AgentDescriptor; 4] = [
    AgentDescriptor {
        agent: AgentType::Router,
        name: "Router Agent",
        description: "Analyzes incoming customer queries, classifies intent, and delegates to the appropriate specialized agent.",
        system_prompt: ROUTER_SYSTEM_PROMPT,
        capabilities: &["Intent classification", "Agent delegation"],
        tool_names: &[],
    },
    AgentDescriptor {
        agent: AgentType::Support,
        name: "Support Agent",
        description: "Handles general support inquiries, FAQs, troubleshooting, and product guidance.",
        system_prompt: SUPPORT_SYSTEM_PROMPT,
        capabilities: &[
            "General product support",
            "FAQ answers",
            "Troubleshooting guidance",
            "Account help",
            "Conversation history lookup",
        ],
        tool_names: &["search_faq", "search_conversation_history"],
    },
    AgentDescriptor {
        agent: AgentType::Order,
        name: "Order Agent",
        description: "Handles order status inquiries, delivery tracking, modifications, and cancellations.",
        system_prompt: ORDER_SYSTEM_PROMPT,
        capabilities: &[
            "Order status lookup",
            "Delivery tracking",
            "Order modification requests",
            "Cancellation processing",
            "Order history listing",
        ],
        tool_names: &["get_order_details", "check_delivery_status", "list_user_orders"],
    },
    AgentDescriptor {
        agent: AgentType::Billing,
        name: "Billing Agent",
        description: "Handles payment issues, refund requests, invoice inquiries, and subscription queries.",
        system_prompt: BILLING_SYSTEM_PROMPT,
        capabilities: &[
            "Invoice lookup",
            "Refund status checking",
            "Payment issue resolution",
            "Billing history",
            "Subscription management guidance",
        ],
        tool_names: &["get_invoice_details", "check_refund_status", "list_user_invoices"],
    },
];

/// All agent descriptors, for the metadata endpoint.
pub fn all_descriptors() -> &'static [AgentDescriptor] {
    &DESCRIPTORS
}

/// Look up one agent's descriptor.
pub fn descriptor(agent: AgentType) -> &'static AgentDescriptor {
    DESCRIPTORS
        .iter()
        .find(|d| d.agent == agent)
        // The table covers the closed enum; this cannot miss.
        .unwrap_or(&DESCRIPTORS[1])
}

/// Total dispatch: map an intent to the agent that handles it.
///
/// `general` falls back to support — the system has no "do nothing"
/// route.
pub fn route(intent: IntentType) -> AgentType {
    match intent {
        IntentType::Order => AgentType::Order,
        IntentType::Billing => AgentType::Billing,
        IntentType::Support => AgentType::Support,
        IntentType::General => AgentType::Support,
    }
}

/// The agent's system prompt augmented with the requesting user's id, so
/// the model can reference it when narrating results.
pub fn system_prompt_for(agent: AgentType, user_id: &str) -> String {
    format!(
        "{}\n\nCurrent user ID: {user_id}",
        descriptor(agent).system_prompt
    )
}
