use serde::{Deserialize, Serialize};

use super::AuthSession;

/// Auth-state transitions published by the identity provider.
///
/// Every session transition is fanned out to subscribers so the application
/// shell can mirror the authenticated user without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A session was established (sign-in, sign-up, or token exchange).
    SignedIn { session: AuthSession },
    /// The session was invalidated.
    SignedOut,
}
