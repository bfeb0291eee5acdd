//! Core type definitions for Trellis.
//!
//! This crate defines the types shared by the host, the plugin host and
//! the client runtime:
//! - Page definitions contributed by extensions and their persisted form
//! - Route access metadata
//! - Authenticated session claims
//! - The JSON envelope used by the registry read endpoint

mod claims;
mod ids;
mod page;

pub use claims::{Claims, Role};
pub use ids::PageId;
pub use page::{AccessMeta, PageDefinition, StoredPage, ValidationError};

use serde::{Deserialize, Serialize};

/// JSON envelope returned by host endpoints: `{ "message": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wraps `data` with the conventional `"success"` message.
    pub fn success(data: T) -> Self {
        Self {
            message: "success".to_string(),
            data,
        }
    }
}
