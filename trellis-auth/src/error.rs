//! Error types for credential handling.

use thiserror::Error;

/// Credential-specific errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("missing bearer token")]
    Missing,

    /// The header or token is not in the expected shape.
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// Ed25519 signature verification failed.
    #[error("token signature invalid")]
    InvalidSignature,

    /// Payload JSON is malformed or missing required fields.
    #[error("invalid token payload: {0}")]
    InvalidPayload(String),

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Key material could not be used.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Reading or writing the key file failed.
    #[error("key file error: {0}")]
    KeyFile(#[from] std::io::Error),
}

impl AuthError {
    /// True when no credential was presented at all, as opposed to a bad one.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;
