//! Bearer credentials for Trellis.
//!
//! Issues and verifies Ed25519-signed tokens that carry the
//! `{id, username, role}` claim, and parses `Authorization` headers.

mod error;
mod key;
mod token;

pub use error::{AuthError, AuthResult};
pub use key::load_or_generate_signing_key;
pub use token::{bearer_token, CredentialVerifier, TokenPayload, TokenSigner, TokenVerifier};
