//! The static FAQ knowledge base.
//!
//! Small enough to live in code; production would move this behind the
//! store. Matching is plain case-insensitive substring over question,
//! answer, and tags.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FaqEntry {
    pub id: &'static str,
    pub question: &'static str,
    pub answer: &'static str,
    pub tags: &'static [&'static str],
}

pub const FAQ_ENTRIES: &[FaqEntry] = &[
    FaqEntry {
        id: "faq-001",
        question: "How do I track my order?",
        answer: "You can track your order by providing your order number (e.g., ORD-001). I can look up the current status, tracking number, and estimated delivery date for you.",
        tags: &["track", "order", "delivery", "shipping", "status"],
    },
    FaqEntry {
        id: "faq-002",
        question: "What is your return policy?",
        answer: "We offer a 30-day return policy for most items. Items must be in original packaging and unused condition. To initiate a return, provide your order number and we will guide you through the process.",
        tags: &["return", "policy", "refund", "exchange"],
    },
    FaqEntry {
        id: "faq-003",
        question: "How do I request a refund?",
        answer: "To request a refund, provide your order number. We will check the order status and initiate the refund process. Refunds typically take 5-10 business days to process after approval.",
        tags: &["refund", "money", "payment", "return"],
    },
    FaqEntry {
        id: "faq-004",
        question: "How do I cancel an order?",
        answer: "You can cancel an order if it has not been shipped yet. Provide your order number and we will check if cancellation is possible. Orders in \"pending\" or \"confirmed\" status can usually be cancelled.",
        tags: &["cancel", "order", "stop"],
    },
    FaqEntry {
        id: "faq-005",
        question: "What payment methods do you accept?",
        answer: "We accept all major credit cards (Visa, Mastercard, Amex), PayPal, Apple Pay, and Google Pay. All transactions are securely processed.",
        tags: &["payment", "credit card", "pay", "methods"],
    },
    FaqEntry {
        id: "faq-006",
        question: "How do I contact customer support?",
        answer: "You are already talking to our AI-powered customer support! I can help with order inquiries, billing questions, and general support. For complex issues, I can escalate to a human agent.",
        tags: &["contact", "support", "help", "agent", "human"],
    },
    FaqEntry {
        id: "faq-007",
        question: "How do I set up my smart home hub?",
        answer: "To set up your Smart Home Hub: 1) Plug it in and wait for the blue LED, 2) Download our companion app, 3) Create an account, 4) Tap \"Add New Device\" and select \"Smart Home Hub\", 5) Follow pairing instructions.",
        tags: &["setup", "smart home", "hub", "install", "configure"],
    },
    FaqEntry {
        id: "faq-008",
        question: "Do you offer international shipping?",
        answer: "Yes, we ship to over 50 countries. International shipping typically takes 7-14 business days. Shipping costs vary by destination and are calculated at checkout.",
        tags: &["international", "shipping", "global", "worldwide"],
    },
];

/// Case-insensitive substring match over question, answer, and tags.
pub fn search(topic: &str) -> Vec<&'static FaqEntry> {
    let needle = topic.to_lowercase();
    FAQ_ENTRIES
        .iter()
        .filter(|faq| {
            faq.question.to_lowercase().contains(&needle)
                || faq.answer.to_lowercase().contains(&needle)
                || faq.tags.iter().any(|tag| tag.contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_tag() {
        let results = search("refund");
        assert!(results.iter().any(|f| f.id == "faq-002"));
        assert!(results.iter().any(|f| f.id == "faq-003"));
    }

    #[test]
    fn matches_case_insensitively() {
        let results = search("Smart Home");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "faq-007");
    }

    #[test]
    fn no_match_returns_empty() {
        assert!(search("quantum entanglement").is_empty());
    }
}
