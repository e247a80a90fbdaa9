//! Chat message types.
//!
//! This module contains types for representing messages in a chat,
//! including author roles and message content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the author of a chat message.
///
/// Serialized as the lowercase role string stored by the backend
/// (`"user"` / `"assistant"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message authored by the user.
    User,
    /// Message authored by the automated responder.
    Assistant,
}

/// A single message in a chat history.
///
/// Each message has an author role, content, and a creation timestamp.
/// Messages are persisted through the backend for both user-authored and
/// responder-authored turns; the view renders them in ascending creation
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier (UUID format, issued by the backend)
    pub id: String,
    /// Id of the chat this message belongs to
    pub chat_id: String,
    /// Id of the user who owns the chat
    pub user_id: String,
    /// The author of the message
    pub role: MessageRole,
    /// The content of the message
    pub content: String,
    /// Timestamp when the message was created
    pub created_at: DateTime<Utc>,
}
