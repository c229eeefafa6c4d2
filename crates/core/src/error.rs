//! Error types for the helpdesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level `Error`
//! mirrors the request-level taxonomy: a missing conversation and an
//! exhausted provider quota are the only failures a caller sees as-is,
//! everything else either degrades to a safe default or is logged.

use thiserror::Error;

/// The top-level error type for all helpdesk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced conversation does not exist. Fatal for the request.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// The provider reported rate/quota exhaustion. Faking a result here
    /// would mislead the user about billing-sensitive capacity, so this
    /// aborts the request instead of degrading.
    #[error("Provider quota exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Lift a provider error, routing quota exhaustion to its dedicated
    /// variant so it surfaces distinctly to the caller.
    pub fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_secs } => {
                Self::QuotaExceeded { retry_after_secs }
            }
            other => Self::Provider(other),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Structured output did not match the schema: {0}")]
    InvalidStructuredOutput(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this failure is a rate/quota limit. Best-effort call sites
    /// (classifier, title, summarizer) degrade on every other variant but
    /// must propagate this one.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool backend failed: {tool_name} — {reason}")]
    BackendFailed { tool_name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_error_maps_to_dedicated_variant() {
        let err = Error::from_provider(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
        assert!(matches!(err, Error::QuotaExceeded { retry_after_secs: 5 }));
    }

    #[test]
    fn generic_provider_error_passes_through() {
        let err = Error::from_provider(ProviderError::Timeout("30s elapsed".into()));
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
    }

    #[test]
    fn is_quota_only_for_rate_limits() {
        assert!(
            ProviderError::RateLimited {
                retry_after_secs: 1
            }
            .is_quota()
        );
        assert!(!ProviderError::Network("connection reset".into()).is_quota());
    }

    #[test]
    fn not_found_displays_conversation_id() {
        let err = Error::ConversationNotFound("conv-123".into());
        assert!(err.to_string().contains("conv-123"));
    }
}
