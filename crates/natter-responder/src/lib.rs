pub mod webhook;

pub use webhook::{OutboundMessage, WebhookResponder};
