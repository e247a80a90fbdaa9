//! WebhookResponder - HTTP client for the automation webhook.
//!
//! The webhook's reply shape is not under our control: depending on how
//! the remote workflow is wired it has answered with a Hasura mutation
//! result, a `{"response"}` object, a `{"content"}` object, a bare JSON
//! string, plain text, or nothing at all. Normalization runs an ordered
//! list of typed shape matchers and degrades every failure to a
//! displayable string, so `send` never errors.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use natter_core::Responder;

const EMPTY_REPLY: &str =
    "I received your message but got an empty response. Please try again.";
const UNEXPECTED_FORMAT: &str =
    "I received your message but got an unexpected response format.";
const UNREADABLE_REPLY: &str =
    "I received your message but couldn't understand the response format. Please try again.";
const CONNECTIVITY_FAILURE: &str =
    "Unable to connect to the AI service. Please check your internet connection and try again.";

/// JSON payload delivered to the webhook for every user turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub message: String,
    pub user_id: String,
    pub chat_id: String,
    /// RFC 3339 with millisecond precision
    pub timestamp: String,
}

/// Responder implementation that posts to the automation webhook.
#[derive(Clone)]
pub struct WebhookResponder {
    client: Client,
    url: String,
}

impl WebhookResponder {
    /// Creates a new responder client for the given webhook URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    async fn deliver(&self, payload: &OutboundMessage) -> String {
        let response = match self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return transport_fallback(&err),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Responder webhook answered {}", status);
            return format!(
                "Sorry, I encountered an error: HTTP error! status: {}. Please try again.",
                status.as_u16()
            );
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return EMPTY_REPLY.to_string();
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return transport_fallback(&err),
        };

        if !is_json {
            if body.is_empty() {
                return UNEXPECTED_FORMAT.to_string();
            }
            return body;
        }

        if body.trim().is_empty() {
            return EMPTY_REPLY.to_string();
        }

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("Responder reply was not valid JSON: {}", err);
                return UNREADABLE_REPLY.to_string();
            }
        };

        tracing::debug!("Responder reply: {}", value);
        normalize_reply(value)
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    async fn send(&self, message: &str, user_id: &str, chat_id: &str) -> String {
        let payload = OutboundMessage {
            message: message.to_string(),
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        self.deliver(&payload).await
    }
}

/// Shape matchers tried in order against a JSON reply.
///
/// The first matcher whose typed deserialization succeeds wins; its
/// extracted text is trimmed and returned.
const REPLY_MATCHERS: &[fn(&Value) -> Option<String>] = &[
    insert_messages_row,
    response_field,
    content_field,
    bare_string,
];

fn normalize_reply(value: Value) -> String {
    for matcher in REPLY_MATCHERS {
        if let Some(reply) = matcher(&value) {
            return reply.trim().to_string();
        }
    }

    tracing::error!("Responder reply had an unrecognized shape: {}", value);
    format!("Debug: Received response but couldn't parse it. Response: {value}")
}

#[derive(Deserialize)]
struct InsertMessagesRow {
    data: InsertMessagesData,
}

#[derive(Deserialize)]
struct InsertMessagesData {
    insert_messages_one: InsertedMessage,
}

#[derive(Deserialize)]
struct InsertedMessage {
    content: String,
}

/// `[{"data": {"insert_messages_one": {"content": "..."}}}]`, first element.
fn insert_messages_row(value: &Value) -> Option<String> {
    let first = value.as_array()?.first()?;
    let row: InsertMessagesRow = serde_json::from_value(first.clone()).ok()?;
    Some(row.data.insert_messages_one.content)
}

#[derive(Deserialize)]
struct ResponseField {
    response: String,
}

/// `{"response": "..."}`.
fn response_field(value: &Value) -> Option<String> {
    let shape: ResponseField = serde_json::from_value(value.clone()).ok()?;
    Some(shape.response)
}

#[derive(Deserialize)]
struct ContentField {
    content: String,
}

/// `{"content": "..."}`.
fn content_field(value: &Value) -> Option<String> {
    let shape: ContentField = serde_json::from_value(value.clone()).ok()?;
    Some(shape.content)
}

/// A bare JSON string.
fn bare_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn transport_fallback(err: &reqwest::Error) -> String {
    tracing::error!("Failed to reach responder webhook: {}", err);

    if err.is_connect() || err.is_timeout() {
        return CONNECTIVITY_FAILURE.to_string();
    }

    format!("Sorry, I encountered an error: {err}. Please try again.")
}
