//! SQLite persistence for helpdesk.
//!
//! One database file holds both sides of the system:
//! - conversations + messages (the orchestrator's log)
//! - orders, order items, invoices, refunds (the data agent tools read)
//!
//! The rest of the workspace depends only on the `ConversationStore` and
//! `CommerceStore` traits from `helpdesk-core`.

pub mod seed;
pub mod sqlite;

pub use sqlite::SqliteStore;
