//! Error types for the client runtime.

use thiserror::Error;

/// A component script could not be turned into a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("malformed component script: {0}")]
    Malformed(String),

    #[error("component script must export an object")]
    NotAnObject,

    #[error("component member `{member}` must be {expected}")]
    InvalidMember {
        member: &'static str,
        expected: &'static str,
    },

    #[error("unknown component builder: {0}")]
    UnknownBuilder(String),

    #[error("component builder '{builder}' failed: {message}")]
    BuilderFailed { builder: String, message: String },

    #[error("component builder '{builder}' panicked: {message}")]
    BuilderPanicked { builder: String, message: String },
}

/// A component's render template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unknown binding `{0}`")]
    UnknownBinding(String),

    #[error("unterminated binding at byte {0}")]
    Unterminated(usize),
}

/// The registry snapshot could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("registry rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("registry returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid registry response: {0}")]
    Decode(String),
}
