//! Identity provider interface.
//!
//! This module defines the capability trait for the hosted identity
//! service. Concrete implementations live in the backend crate; the
//! application shell only ever sees this trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{AuthEvent, AuthSession};
use crate::error::Result;

/// Capability interface for the hosted identity service.
///
/// Implementations own the current session: they establish it on
/// sign-in/sign-up/token exchange, invalidate it on sign-out, and publish
/// every transition as an [`AuthEvent`]. Consumers hold the trait behind
/// `Arc<dyn IdentityProvider>` and treat returned sessions as snapshots.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with email and password.
    ///
    /// # Arguments
    ///
    /// * `email` - The account email
    /// * `password` - The account password
    ///
    /// # Returns
    ///
    /// The established session. On rejection the provider's own message
    /// is carried in the error and is suitable for direct display.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Registers a new account.
    ///
    /// # Arguments
    ///
    /// * `email` - The email to register
    /// * `password` - The password for the new account
    ///
    /// # Returns
    ///
    /// `Some(session)` when the provider signs the new account in
    /// immediately, `None` when email verification is pending and no
    /// session has been issued yet.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>>;

    /// Invalidates the current session, if any.
    ///
    /// Succeeds as a no-op when no session is active.
    async fn sign_out(&self) -> Result<()>;

    /// Exchanges a refresh token for a session.
    ///
    /// Email-verification links carry a refresh token minted by the
    /// provider; exchanging it both verifies the address and establishes
    /// a session.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The token to exchange
    ///
    /// # Returns
    ///
    /// The established session, or an auth error when the token is
    /// expired or invalid.
    async fn set_session(&self, refresh_token: &str) -> Result<AuthSession>;

    /// Returns a snapshot of the current session, if any.
    async fn session(&self) -> Option<AuthSession>;

    /// Returns the current access token, if a session is active.
    ///
    /// Fetched fresh for every backend call; nothing caches the
    /// credential outside the provider.
    async fn access_token(&self) -> Option<String>;

    /// Subscribes to auth-state transitions.
    ///
    /// The returned receiver is the subscription handle: dropping it
    /// tears the subscription down. Events published before the call are
    /// not replayed.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
