//! GraphqlChatStore - GraphQL client for the hosted data backend.
//!
//! Implements [`ChatStore`] with the backend's five fixed operation
//! documents. Every call is authenticated with the current access token,
//! fetched fresh from the identity provider, and is single-attempt:
//! failures are logged and returned to the caller, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use natter_core::error::{NatterError, Result};
use natter_core::{Chat, ChatMessage, ChatStore, IdentityProvider, MessageRole};

const INSERT_CHAT_MUTATION: &str = r#"
  mutation InsertChats($title: String, $user_id: uuid) {
    insert_chats(objects: {title: $title, user_id: $user_id}) {
      affected_rows
      returning {
        id
        title
        user_id
        created_at
        updated_at
      }
    }
  }
"#;

const GET_USER_CHATS_QUERY: &str = r#"
  query GetUserChats($user_id: uuid!) {
    chats(where: {user_id: {_eq: $user_id}}, order_by: {updated_at: desc}) {
      id
      title
      user_id
      created_at
      updated_at
    }
  }
"#;

const INSERT_MESSAGE_MUTATION: &str = r#"
  mutation InsertMessage($chat_id: uuid!, $content: String!, $role: String!, $user_id: uuid!) {
    insert_messages(objects: {chat_id: $chat_id, content: $content, role: $role, user_id: $user_id}) {
      affected_rows
      returning {
        id
        content
        role
        created_at
        chat_id
        user_id
      }
    }
  }
"#;

const GET_CHAT_MESSAGES_QUERY: &str = r#"
  query GetChatMessages($chat_id: uuid!) {
    messages(where: {chat_id: {_eq: $chat_id}}, order_by: {created_at: asc}) {
      id
      content
      role
      created_at
      chat_id
      user_id
    }
  }
"#;

const UPDATE_CHAT_TITLE_MUTATION: &str = r#"
  mutation UpdateChatTitle($chat_id: uuid!, $title: String!) {
    update_chats(where: {id: {_eq: $chat_id}}, _set: {title: $title, updated_at: "now()"}) {
      affected_rows
      returning {
        id
        title
        user_id
        created_at
        updated_at
      }
    }
  }
"#;

/// Chat-store implementation that talks to the hosted GraphQL endpoint.
pub struct GraphqlChatStore {
    client: Client,
    endpoint: String,
    identity: Arc<dyn IdentityProvider>,
}

impl GraphqlChatStore {
    /// Creates a new store for the given GraphQL endpoint.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The backend's GraphQL URL
    /// * `identity` - Source of the bearer credential attached per call
    pub fn new(endpoint: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            identity,
        }
    }

    /// Executes one GraphQL operation and unwraps the response envelope.
    ///
    /// A non-empty `errors` array is a server failure even under a 2xx
    /// status; its first message is surfaced.
    async fn execute<T: DeserializeOwned>(&self, query: &'static str, variables: Value) -> Result<T> {
        let token = self.identity.access_token().await.ok_or(NatterError::NoSession)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read GraphQL error body".to_string());
            return Err(map_http_error(status, body));
        }

        let envelope: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|err| NatterError::graphql(format!("Failed to parse GraphQL response: {err}")))?;

        if let Some(error) = envelope.errors.into_iter().next() {
            return Err(NatterError::graphql(error.message));
        }

        envelope
            .data
            .ok_or_else(|| NatterError::graphql("GraphQL response carried no data"))
    }
}

#[async_trait]
impl ChatStore for GraphqlChatStore {
    async fn create_chat(&self, title: &str, user_id: &str) -> Result<Chat> {
        let data: InsertChatsData = self
            .execute(INSERT_CHAT_MUTATION, json!({ "title": title, "user_id": user_id }))
            .await
            .map_err(|err| {
                tracing::error!("Failed to create chat: {}", err);
                err
            })?;

        first_returned("insert_chats", data.insert_chats.returning)
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        let data: ChatsData = self
            .execute(GET_USER_CHATS_QUERY, json!({ "user_id": user_id }))
            .await
            .map_err(|err| {
                tracing::error!("Failed to fetch chats: {}", err);
                err
            })?;

        Ok(data.chats)
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let data: MessagesData = self
            .execute(GET_CHAT_MESSAGES_QUERY, json!({ "chat_id": chat_id }))
            .await
            .map_err(|err| {
                tracing::error!("Failed to fetch messages: {}", err);
                err
            })?;

        Ok(data.messages)
    }

    async fn append_message(
        &self,
        chat_id: &str,
        content: &str,
        role: MessageRole,
        user_id: &str,
    ) -> Result<ChatMessage> {
        let variables = json!({
            "chat_id": chat_id,
            "content": content,
            "role": role,
            "user_id": user_id,
        });

        let data: InsertMessagesData = self
            .execute(INSERT_MESSAGE_MUTATION, variables)
            .await
            .map_err(|err| {
                tracing::error!("Failed to save message: {}", err);
                err
            })?;

        first_returned("insert_messages", data.insert_messages.returning)
    }

    async fn rename_chat(&self, chat_id: &str, title: &str) -> Result<Chat> {
        let data: UpdateChatsData = self
            .execute(UPDATE_CHAT_TITLE_MUTATION, json!({ "chat_id": chat_id, "title": title }))
            .await
            .map_err(|err| {
                tracing::error!("Failed to update chat title: {}", err);
                err
            })?;

        first_returned("update_chats", data.update_chats.returning)
    }
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct MutationPayload<T> {
    returning: Vec<T>,
}

#[derive(Deserialize)]
struct InsertChatsData {
    insert_chats: MutationPayload<Chat>,
}

#[derive(Deserialize)]
struct ChatsData {
    chats: Vec<Chat>,
}

#[derive(Deserialize)]
struct InsertMessagesData {
    insert_messages: MutationPayload<ChatMessage>,
}

#[derive(Deserialize)]
struct MessagesData {
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct UpdateChatsData {
    update_chats: MutationPayload<Chat>,
}

fn first_returned<T>(operation: &str, rows: Vec<T>) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| NatterError::graphql(format!("{operation} returned no rows")))
}

fn map_http_error(status: StatusCode, body: String) -> NatterError {
    let message = serde_json::from_str::<GraphqlResponse<Value>>(&body)
        .ok()
        .and_then(|envelope| envelope.errors.into_iter().next())
        .map(|error| error.message)
        .unwrap_or(body);
    NatterError::graphql(format!("{status}: {message}"))
}
