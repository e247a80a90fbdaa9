//! HTTP-level tests for the GraphQL chat store, backed by a mock server.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use natter_backend::GraphqlChatStore;
use natter_core::error::Result;
use natter_core::{AuthEvent, AuthSession, ChatStore, IdentityProvider, MessageRole, NatterError};

/// Identity stub that only hands out a fixed access token.
struct StaticIdentity {
    token: Option<&'static str>,
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<AuthSession> {
        unreachable!("not exercised by these tests")
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Option<AuthSession>> {
        unreachable!("not exercised by these tests")
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    async fn set_session(&self, _refresh_token: &str) -> Result<AuthSession> {
        unreachable!("not exercised by these tests")
    }

    async fn session(&self) -> Option<AuthSession> {
        None
    }

    async fn access_token(&self) -> Option<String> {
        self.token.map(str::to_string)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        broadcast::channel(1).1
    }
}

fn store_for(server: &MockServer, token: Option<&'static str>) -> GraphqlChatStore {
    GraphqlChatStore::new(server.uri(), Arc::new(StaticIdentity { token }))
}

fn chat_json(id: &str, title: &str, updated_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "user_id": "user-1",
        "created_at": "2024-05-04T10:00:00+00:00",
        "updated_at": updated_at
    })
}

fn message_json(id: &str, role: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "content": content,
        "role": role,
        "created_at": "2024-05-04T10:00:00+00:00",
        "chat_id": "chat-1",
        "user_id": "user-1"
    })
}

#[tokio::test]
async fn create_chat_returns_the_inserted_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_partial_json(json!({
            "variables": { "title": "First chat", "user_id": "user-1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "insert_chats": {
                    "affected_rows": 1,
                    "returning": [chat_json("chat-1", "First chat", "2024-05-04T10:00:00+00:00")]
                }
            }
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let chat = store.create_chat("First chat", "user-1").await.unwrap();

    assert_eq!(chat.id, "chat-1");
    assert_eq!(chat.title, "First chat");
    let expected: DateTime<Utc> = "2024-05-04T10:00:00+00:00".parse().unwrap();
    assert_eq!(chat.created_at, expected);
}

#[tokio::test]
async fn list_chats_delegates_ordering_to_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("order_by: {updated_at: desc}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "chats": [
                    chat_json("chat-2", "Newer", "2024-05-05T09:00:00+00:00"),
                    chat_json("chat-1", "Older", "2024-05-04T10:00:00+00:00")
                ]
            }
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let chats = store.list_chats("user-1").await.unwrap();

    let ids: Vec<&str> = chats.iter().map(|chat| chat.id.as_str()).collect();
    assert_eq!(ids, ["chat-2", "chat-1"]);
}

#[tokio::test]
async fn list_messages_decodes_roles_in_backend_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("order_by: {created_at: asc}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "messages": [
                    message_json("msg-1", "user", "hello"),
                    message_json("msg-2", "assistant", "hi there")
                ]
            }
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let messages = store.list_messages("chat-1").await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "hi there");
}

#[tokio::test]
async fn append_message_sends_the_role_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "variables": {
                "chat_id": "chat-1",
                "content": "hi there",
                "role": "assistant",
                "user_id": "user-1"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "insert_messages": {
                    "affected_rows": 1,
                    "returning": [message_json("msg-2", "assistant", "hi there")]
                }
            }
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let message = store
        .append_message("chat-1", "hi there", MessageRole::Assistant, "user-1")
        .await
        .unwrap();

    assert_eq!(message.id, "msg-2");
    assert_eq!(message.role, MessageRole::Assistant);
}

#[tokio::test]
async fn rename_chat_returns_the_updated_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "variables": { "chat_id": "chat-1", "title": "Renamed" }
        })))
        .and(body_string_contains("updated_at: \\\"now()\\\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "update_chats": {
                    "affected_rows": 1,
                    "returning": [chat_json("chat-1", "Renamed", "2024-05-06T12:00:00+00:00")]
                }
            }
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let chat = store.rename_chat("chat-1", "Renamed").await.unwrap();

    assert_eq!(chat.title, "Renamed");
}

#[tokio::test]
async fn graphql_errors_surface_the_first_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [
                { "message": "check constraint of an insert permission has failed" },
                { "message": "second error" }
            ]
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("access-1"));
    let err = store.create_chat("First chat", "user-1").await.unwrap_err();

    assert!(matches!(err, NatterError::Graphql(_)));
    assert_eq!(
        err.to_string(),
        "GraphQL error: check constraint of an insert permission has failed"
    );
}

#[tokio::test]
async fn missing_session_short_circuits_before_the_network() {
    // Nothing is listening here; the call must fail before any request.
    let store = GraphqlChatStore::new(
        "http://127.0.0.1:9",
        Arc::new(StaticIdentity { token: None }),
    );

    let err = store.list_chats("user-1").await.unwrap_err();

    assert!(err.is_no_session());
}
