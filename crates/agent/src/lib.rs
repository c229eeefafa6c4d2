//! The orchestration engine — the heart of helpdesk.
//!
//! A request flows through the engine one way:
//!
//! 1. **Resolve** the conversation (load, or create with a generated title)
//! 2. **Append** the user message to the log
//! 3. **Classify** intent with a structured model call
//! 4. **Compact** the history to fit the context-token budget
//! 5. **Dispatch** to the matching agent's bounded tool-calling loop
//! 6. **Stream** the answer back while persistence happens off to the side
//!
//! The agent taxonomy is fixed at four members (router, support, order,
//! billing); dispatch is a total lookup and every message reaches some
//! agent.

pub mod classifier;
pub mod compactor;
pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod stream_event;
pub mod testing;
pub mod token;

pub use classifier::IntentClassifier;
pub use compactor::{CompactedContext, ContextCompactor};
pub use orchestrator::{Orchestrator, ProcessedMessage};
pub use registry::AgentDescriptor;
pub use runner::{AgentRunner, AgentStreamHandle};
pub use stream_event::AgentStreamEvent;
