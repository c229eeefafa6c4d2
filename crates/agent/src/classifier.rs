//! Intent classification via structured model output.
//!
//! The classifier never fails a request: any provider error short of
//! quota exhaustion degrades to the safest default route (general, low
//! confidence). Disambiguation policy lives in the prompt, not in code.

use helpdesk_core::agent::{IntentClassification, IntentType};
use helpdesk_core::error::ProviderError;
use helpdesk_core::provider::LanguageModel;
use std::sync::Arc;
use tracing::{debug, warn};

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a customer support intent classifier. Analyze the user's message and classify it into one of the following categories.

Classification rules:
- "support": General product support, FAQs, troubleshooting, how-to questions, account help, setup guides
- "order": Order status inquiries, delivery tracking, order modifications, cancellations, shipping questions about specific orders
- "billing": Payment issues, refund requests/status, invoice inquiries, subscription management, charges, billing history
- "general": Greetings, off-topic messages, unclear intent that doesn't fit the above categories

Guidelines:
- Consider the full context of the conversation, not just keywords
- If a message mentions both order and billing (e.g., "refund for order X"), classify as "billing" since the primary action is billing-related
- Simple greetings like "hi" or "hello" should be "general"
- If unsure, lean toward "general" with lower confidence
- Confidence should reflect how certain you are: >0.8 = very clear, 0.5-0.8 = likely, <0.5 = uncertain"#;

/// Confidence reported when classification falls back.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

const FALLBACK_REASONING: &str = "Classification failed, defaulting to general support.";

fn intent_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": ["support", "order", "billing", "general"]
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0
            },
            "reasoning": {
                "type": "string"
            }
        },
        "required": ["intent", "confidence", "reasoning"],
        "additionalProperties": false
    })
}

/// Classifies user messages into the fixed intent taxonomy.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// The fixed fallback verdict used when classification fails.
    pub fn fallback() -> IntentClassification {
        IntentClassification {
            intent: IntentType::General,
            confidence: FALLBACK_CONFIDENCE,
            reasoning: FALLBACK_REASONING.into(),
        }
    }

    /// Classify a message, optionally with a short rendered window of
    /// recent turns for context.
    ///
    /// Only a quota error propagates; every other failure — including a
    /// response that does not match the schema — yields the fallback.
    pub async fn classify(
        &self,
        message: &str,
        recent_context: Option<&str>,
    ) -> Result<IntentClassification, ProviderError> {
        let prompt = match recent_context.filter(|ctx| !ctx.trim().is_empty()) {
            Some(ctx) => format!(
                "Previous conversation context:\n{ctx}\n\nNew user message: \"{message}\""
            ),
            None => format!("User message: \"{message}\""),
        };

        match self
            .model
            .generate_object(CLASSIFIER_SYSTEM_PROMPT, &prompt, &intent_schema())
            .await
        {
            Ok(value) => Ok(Self::parse(value).unwrap_or_else(|| {
                warn!("Classifier returned a malformed object, using fallback");
                Self::fallback()
            })),
            Err(e) if e.is_quota() => Err(e),
            Err(e) => {
                warn!(error = %e, "Classification failed, using fallback");
                Ok(Self::fallback())
            }
        }
    }

    fn parse(value: serde_json::Value) -> Option<IntentClassification> {
        let mut classification: IntentClassification = serde_json::from_value(value).ok()?;
        classification.confidence = classification.confidence.clamp(0.0, 1.0);
        debug!(
            intent = %classification.intent,
            confidence = classification.confidence,
            "Message classified"
        );
        Some(classification)
    }
}
