//! Chat domain module.
//!
//! This module contains the chat and message models and the data-access
//! trait for the hosted backend.
//!
//! # Module Structure
//!
//! - `model`: Core chat domain model (`Chat`)
//! - `message`: Chat message types (`MessageRole`, `ChatMessage`)
//! - `store`: Data-access trait for chats and messages

mod message;
mod model;
mod store;

// Re-export public API
pub use message::{ChatMessage, MessageRole};
pub use model::Chat;
pub use store::ChatStore;
