//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, accurate
//! within ~10% for BPE tokenizers on English text. This is intentionally
//! an approximation — the only property the compactor relies on is
//! monotonicity with text length.

use helpdesk_core::message::ContextMessage;

/// Fixed per-message cost for role name, delimiters, and formatting
/// markers in the API wire format.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single context message including overhead.
pub fn estimate_message_tokens(message: &ContextMessage) -> usize {
    MESSAGE_OVERHEAD_TOKENS + estimate_tokens(&message.content)
}

/// Estimate tokens for a context sequence.
pub fn estimate_context_tokens(messages: &[ContextMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[test]
    fn message_includes_overhead() {
        let msg = ContextMessage::user("test"); // 4 chars → 1 token + 4 overhead = 5
        assert_eq!(estimate_message_tokens(&msg), 5);
    }

    #[test]
    fn sequence_sums_per_message() {
        let msgs = vec![
            ContextMessage::user("hello"),      // 2 tokens + 4 overhead = 6
            ContextMessage::assistant("world"), // 2 tokens + 4 overhead = 6
        ];
        assert_eq!(estimate_context_tokens(&msgs), 12);
    }

    #[test]
    fn monotonic_with_length() {
        let short = estimate_tokens("short text");
        let long = estimate_tokens("a noticeably longer text than the short one");
        assert!(long > short);
    }
}
