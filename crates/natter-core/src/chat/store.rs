//! Chat store interface.
//!
//! This module defines the data-access trait for chats and messages.
//! Every operation is a single best-effort call against the hosted
//! backend: no retry, no local cache, no offline queue.

use async_trait::async_trait;

use super::{Chat, ChatMessage, MessageRole};
use crate::error::Result;

/// Data-access interface for chats and messages.
///
/// Implementations issue one authenticated backend request per call and
/// surface any transport or server failure to the caller unchanged.
/// Ordering of the returned collections is delegated to the backend.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates a new chat.
    ///
    /// # Arguments
    ///
    /// * `title` - The initial chat title
    /// * `user_id` - The owning user's id
    ///
    /// # Returns
    ///
    /// The created chat as persisted by the backend.
    async fn create_chat(&self, title: &str, user_id: &str) -> Result<Chat>;

    /// Lists all chats owned by a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owning user's id
    ///
    /// # Returns
    ///
    /// The user's chats ordered by `updated_at` descending
    /// (newest-updated first).
    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>>;

    /// Lists all messages in a chat.
    ///
    /// # Arguments
    ///
    /// * `chat_id` - The chat to read
    ///
    /// # Returns
    ///
    /// The chat's messages ordered by `created_at` ascending
    /// (oldest first).
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>>;

    /// Appends a message to a chat.
    ///
    /// Called for both user-authored and responder-authored turns.
    ///
    /// # Arguments
    ///
    /// * `chat_id` - The chat to append to
    /// * `content` - The message text
    /// * `role` - The author of the message
    /// * `user_id` - The owning user's id
    ///
    /// # Returns
    ///
    /// The persisted message.
    async fn append_message(
        &self,
        chat_id: &str,
        content: &str,
        role: MessageRole,
        user_id: &str,
    ) -> Result<ChatMessage>;

    /// Renames a chat.
    ///
    /// Also bumps the chat's `updated_at` marker on the backend, moving
    /// it to the front of the newest-first chat list.
    ///
    /// # Arguments
    ///
    /// * `chat_id` - The chat to rename
    /// * `title` - The new title
    ///
    /// # Returns
    ///
    /// The updated chat.
    async fn rename_chat(&self, chat_id: &str, title: &str) -> Result<Chat>;
}
