//! Chat domain model.
//!
//! This module contains the core Chat entity that represents one
//! conversation owned by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one conversation in the application's domain layer.
///
/// A chat contains:
/// - A backend-issued identifier
/// - A human-readable title (renameable)
/// - The owning user's id
/// - Timestamps for creation and last update
///
/// Chats are owned by the backend; the client holds read-through copies
/// and reloads them on navigation. `updated_at` is bumped by the backend
/// whenever the chat is renamed, which drives the newest-first ordering
/// of the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier (UUID format, issued by the backend)
    pub id: String,
    /// Human-readable chat title
    pub title: String,
    /// Id of the owning user
    pub user_id: String,
    /// Timestamp when the chat was created
    pub created_at: DateTime<Utc>,
    /// Timestamp when the chat was last updated
    pub updated_at: DateTime<Utc>,
}
