//! The fixed agent and intent taxonomies.
//!
//! The agent set is closed by design: four members, dispatched through a
//! single total lookup. There is no plugin registration — a message always
//! reaches exactly one of these agents.

use serde::{Deserialize, Serialize};

/// The four members of the agent taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Classifies intent and delegates; never answers the user directly.
    Router,
    /// General support, FAQs, troubleshooting. Also the default route.
    Support,
    /// Order status, delivery tracking, order history.
    Order,
    /// Invoices, refunds, payment issues.
    Billing,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Support => "support",
            Self::Order => "order",
            Self::Billing => "billing",
        }
    }

    /// Parse from the lowercase wire/storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "router" => Some(Self::Router),
            "support" => Some(Self::Support),
            "order" => Some(Self::Order),
            "billing" => Some(Self::Billing),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classified category of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    Support,
    Order,
    Billing,
    /// Greetings, off-topic, or unclear messages.
    General,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Order => "order",
            Self::Billing => "billing",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's verdict for one message. Ephemeral — returned to the
/// caller as response metadata but never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: IntentType,
    /// How certain the classifier is, in [0, 1]. Advisory only — routing
    /// proceeds regardless of confidence.
    pub confidence: f64,
    pub reasoning: String,
}
