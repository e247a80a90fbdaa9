//! Application shell for natter.
//!
//! Sits between the terminal front-end and the backend clients: evaluates
//! launch parameters, drives the auth phase machine, and exposes the chat
//! use cases. No HTTP lives here; every external effect goes through the
//! `natter-core` capability traits.
//!
//! # Module Structure
//!
//! - `launch`: launch-parameter extraction from a pasted verification link
//! - `shell`: the phase state machine and auth-event mirror (`AppShell`)
//! - `chat_service`: chat use cases over the store and responder

pub mod chat_service;
pub mod launch;
pub mod shell;

// Re-export public API
pub use chat_service::ChatService;
pub use launch::LaunchParams;
pub use shell::{AppShell, Phase, VerificationOutcome};
