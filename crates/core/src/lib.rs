//! # Helpdesk Core
//!
//! Domain types, traits, and error definitions for the helpdesk
//! multi-agent customer support runtime. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentType, IntentClassification, IntentType};
pub use error::{Error, ProviderError, Result, StorageError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{ContextMessage, ContextRole, Conversation, Role, StoredMessage};
pub use provider::{ChatRequest, LanguageModel, PromptMessage, StreamChunk, ToolInvocation, Usage};
pub use store::{CommerceStore, ConversationStore};
pub use tool::{Tool, ToolCall, ToolOutcome, ToolRegistry};
