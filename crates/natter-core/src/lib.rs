pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod responder;

// Re-export common error type
pub use error::{NatterError, Result};

pub use auth::{AuthEvent, AuthSession, AuthUser, IdentityProvider};
pub use chat::{Chat, ChatMessage, ChatStore, MessageRole};
pub use config::AppConfig;
pub use responder::Responder;
