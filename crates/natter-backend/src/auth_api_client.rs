//! AuthApiClient - REST client for the hosted identity service.
//!
//! Implements [`IdentityProvider`] against the service's email-password
//! endpoints. The client owns the current session: it establishes it on
//! sign-in/sign-up/token exchange, clears it on sign-out, and fans every
//! transition out on a broadcast channel.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::{RwLock, broadcast};

use natter_core::error::{NatterError, Result};
use natter_core::{AuthEvent, AuthSession, AuthUser, IdentityProvider};

/// Sessions transition rarely; a small buffer is plenty for one shell.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity-provider implementation that talks to the hosted auth REST API.
pub struct AuthApiClient {
    client: Client,
    base_url: String,
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthApiClient {
    /// Creates a new client for the given auth base URL
    /// (the `/v1` REST surface, without a trailing route).
    pub fn new(base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            session: RwLock::new(None),
            events,
        }
    }

    fn route(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), suffix)
    }

    /// Posts to a session-enveloped route (`signin`/`signup`).
    ///
    /// A `null` session in a 2xx response is a valid outcome: the account
    /// exists but no session was issued (email verification pending).
    async fn post_session(&self, route: &str, body: &impl Serialize) -> Result<Option<AuthSession>> {
        let envelope: SessionEnvelope = self.post_json(route, body).await?;
        Ok(envelope.session.map(AuthSession::from))
    }

    async fn post_json<T: DeserializeOwned>(&self, route: &str, body: &impl Serialize) -> Result<T> {
        let response = self.client.post(self.route(route)).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read auth error body".to_string());
            return Err(map_auth_error(status, body_text));
        }

        response
            .json()
            .await
            .map_err(|err| NatterError::internal(format!("Failed to parse auth response: {err}")))
    }

    /// Replaces the current session and publishes the transition.
    async fn store(&self, session: AuthSession) {
        *self.session.write().await = Some(session.clone());
        // A send error only means nobody is subscribed yet.
        let _ = self.events.send(AuthEvent::SignedIn { session });
    }
}

#[async_trait]
impl IdentityProvider for AuthApiClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = self
            .post_session("signin/email-password", &EmailPasswordRequest { email, password })
            .await?
            .ok_or_else(|| NatterError::internal("Sign-in response carried no session"))?;

        self.store(session.clone()).await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
        let session = self
            .post_session("signup/email-password", &EmailPasswordRequest { email, password })
            .await?;

        if let Some(session) = &session {
            self.store(session.clone()).await;
        }

        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.session.write().await.take();

        let Some(previous) = previous else {
            return Ok(());
        };

        let _ = self.events.send(AuthEvent::SignedOut);

        // Local state is already cleared; server-side revocation is
        // best-effort and must not fail the caller.
        let revocation = self
            .client
            .post(self.route("signout"))
            .json(&RefreshTokenRequest {
                refresh_token: &previous.refresh_token,
            })
            .send()
            .await;

        match revocation {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!("Sign-out revocation rejected: {}", response.status());
            }
            Err(err) => {
                tracing::warn!("Sign-out revocation failed: {}", err);
            }
            _ => {}
        }

        Ok(())
    }

    async fn set_session(&self, refresh_token: &str) -> Result<AuthSession> {
        // The token route returns the session directly, not enveloped.
        let payload: SessionPayload = self
            .post_json("token", &RefreshTokenRequest { refresh_token })
            .await?;

        let session = AuthSession::from(payload);
        self.store(session.clone()).await;
        Ok(session)
    }

    async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Serialize)]
struct EmailPasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct SessionEnvelope {
    session: Option<SessionPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    access_token: String,
    refresh_token: String,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    email: String,
}

#[derive(Deserialize)]
struct AuthErrorResponse {
    message: String,
    #[allow(dead_code)]
    error: String,
}

impl From<SessionPayload> for AuthSession {
    fn from(payload: SessionPayload) -> Self {
        Self {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            user: AuthUser {
                id: payload.user.id,
                email: payload.user.email,
            },
        }
    }
}

fn map_auth_error(status: StatusCode, body: String) -> NatterError {
    let message = serde_json::from_str::<AuthErrorResponse>(&body)
        .map(|error| error.message)
        .unwrap_or(body);
    NatterError::auth(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_auth_error_prefers_body_message() {
        let body = r#"{"status":401,"message":"Incorrect email or password","error":"invalid-email-password"}"#;
        let err = map_auth_error(StatusCode::UNAUTHORIZED, body.to_string());

        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Incorrect email or password");
    }

    #[test]
    fn test_map_auth_error_falls_back_to_raw_body() {
        let err = map_auth_error(StatusCode::BAD_GATEWAY, "upstream unavailable".to_string());

        assert!(err.is_auth());
        assert_eq!(err.to_string(), "upstream unavailable");
    }
}
