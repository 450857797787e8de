//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// Invalid, tampered or expired session cookies are not represented here:
/// they are recovered inside the store and yield a fresh session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Durable storage failed to read or write session data
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Payload written with an encoding version this build cannot read
    #[error("Unsupported session encoding version: {0}")]
    UnsupportedVersion(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Session error: {0}")]
    Other(String),
}

impl SessionError {
    /// Shorthand used by backend implementations.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        SessionError::Backend(err.to_string())
    }
}
