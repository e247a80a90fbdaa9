//! Error types for the Natter application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Natter application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum NatterError {
    /// Authentication error reported by the identity provider
    #[error("{message}")]
    Auth { status: u16, message: String },

    /// No active session where one is required
    #[error("No active session")]
    NoSession,

    /// GraphQL error returned by the data backend
    #[error("GraphQL error: {0}")]
    Graphql(String),

    /// HTTP transport error (request never produced a usable response)
    #[error("HTTP error: {message}")]
    Http { message: String, connect: bool },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NatterError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Auth error from an identity-provider status and message
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Creates a Graphql error
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::Graphql(message.into())
    }

    /// Creates an Http error, flagging whether the failure was at connect time
    pub fn http(message: impl Into<String>, connect: bool) -> Self {
        Self::Http {
            message: message.into(),
            connect,
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Check if this is a NoSession error
    pub fn is_no_session(&self) -> bool {
        matches!(self, Self::NoSession)
    }

    /// Check if this error indicates the remote service could not be reached.
    ///
    /// Returns true for `Http` errors raised before any response arrived
    /// (connection refused, DNS failure, timeout). Callers use this to tell
    /// "service down" apart from "service answered with an error".
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Http { connect: true, .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for NatterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for NatterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for NatterError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for NatterError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for NatterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            message: err.to_string(),
            connect: err.is_connect() || err.is_timeout(),
        }
    }
}

/// Conversion from anyhow::Error (transitional, should be removed eventually)
impl From<anyhow::Error> for NatterError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, NatterError>`.
pub type Result<T> = std::result::Result<T, NatterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_displays_server_message() {
        let err = NatterError::auth(401, "Incorrect email or password");
        assert_eq!(err.to_string(), "Incorrect email or password");
        assert!(err.is_auth());
    }

    #[test]
    fn test_connect_classification() {
        let down = NatterError::http("connection refused", true);
        let bad_status = NatterError::http("500 Internal Server Error", false);
        assert!(down.is_connect());
        assert!(!bad_status.is_connect());
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: NatterError = json_err.into();
        assert!(err.is_serialization());
    }
}
