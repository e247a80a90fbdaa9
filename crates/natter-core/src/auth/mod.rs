//! Authentication domain module.
//!
//! This module contains the session/user models, the auth-state event
//! type, and the identity-provider capability trait.
//!
//! # Module Structure
//!
//! - `model`: Session and user models (`AuthSession`, `AuthUser`)
//! - `event`: Auth-state transition events (`AuthEvent`)
//! - `provider`: Capability trait for the hosted identity service

mod event;
mod model;
mod provider;

// Re-export public API
pub use event::AuthEvent;
pub use model::{AuthSession, AuthUser};
pub use provider::IdentityProvider;
