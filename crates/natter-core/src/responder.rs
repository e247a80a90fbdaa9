//! Responder interface.
//!
//! The responder is the external automation webhook that produces the
//! assistant side of every conversation. The client's only obligation is
//! to deliver the user's message and render whatever comes back as text.

use async_trait::async_trait;

/// Capability interface for the automated reply source.
///
/// `send` is infallible by contract: implementations absorb every
/// transport and parsing failure and degrade it to a displayable string,
/// so callers render the returned text unconditionally.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Delivers a user message and returns the reply as plain text.
    ///
    /// # Arguments
    ///
    /// * `message` - The user's message text
    /// * `user_id` - The sending user's id
    /// * `chat_id` - The chat the message belongs to
    ///
    /// # Returns
    ///
    /// The reply text, or a fallback string describing what went wrong.
    async fn send(&self, message: &str, user_id: &str, chat_id: &str) -> String;
}
