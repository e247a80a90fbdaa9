//! Authentication domain models.
//!
//! This module contains the session and user types issued by the hosted
//! identity provider. The application treats both as read-only snapshots;
//! they are created and invalidated exclusively through the
//! [`IdentityProvider`](super::IdentityProvider) operations.

use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Unique user identifier (UUID format, issued by the provider)
    pub id: String,
    /// The email address the account was registered with
    pub email: String,
}

/// An authenticated session issued by the identity provider.
///
/// A session contains:
/// - The short-lived access token attached to backend requests as a
///   bearer credential
/// - The long-lived refresh token used to obtain new sessions
/// - The user the session belongs to
///
/// Tokens are opaque strings; the client never inspects or decodes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer credential for authenticated backend calls
    pub access_token: String,
    /// Token exchanged for a fresh session when the access token expires
    pub refresh_token: String,
    /// The authenticated user
    pub user: AuthUser,
}
