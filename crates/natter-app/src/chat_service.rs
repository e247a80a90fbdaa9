//! Chat use cases behind the dashboard and chat views.

use std::sync::Arc;

use natter_core::{Chat, ChatMessage, ChatStore, MessageRole, Responder, Result};

/// Orchestrates the data access layer and the automated responder.
///
/// Every call is single-attempt: store failures are returned to the caller
/// for manual retry, and the responder degrades its own failures to
/// displayable text.
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    responder: Arc<dyn Responder>,
}

impl ChatService {
    /// Creates the service over a chat store and a responder.
    pub fn new(store: Arc<dyn ChatStore>, responder: Arc<dyn Responder>) -> Self {
        Self { store, responder }
    }

    /// Creates a chat owned by `user_id`.
    pub async fn create_chat(&self, title: &str, user_id: &str) -> Result<Chat> {
        self.store.create_chat(title, user_id).await
    }

    /// Lists the user's chats, newest-updated first.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        self.store.list_chats(user_id).await
    }

    /// Loads a chat's history in ascending creation order.
    pub async fn open_chat(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        self.store.list_messages(chat_id).await
    }

    /// Renames a chat, bumping its update marker so it moves to the front
    /// of the newest-first list.
    pub async fn rename_chat(&self, chat_id: &str, title: &str) -> Result<Chat> {
        self.store.rename_chat(chat_id, title).await
    }

    /// Persists the user's turn, obtains the automated reply, and persists
    /// that reply as the assistant's turn.
    ///
    /// # Returns
    ///
    /// The persisted assistant turn. A failure persisting the user's turn
    /// aborts the exchange before the responder is contacted.
    pub async fn send_message(
        &self,
        chat_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<ChatMessage> {
        self.store
            .append_message(chat_id, content, MessageRole::User, user_id)
            .await?;

        let reply = self.responder.send(content, user_id, chat_id).await;

        self.store
            .append_message(chat_id, &reply, MessageRole::Assistant, user_id)
            .await
    }
}
