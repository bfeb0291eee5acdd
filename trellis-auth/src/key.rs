//! Signing key persistence.

use crate::error::{AuthError, AuthResult};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::fs;
use std::path::Path;
use tracing::info;

/// Loads the 32-byte Ed25519 seed at `path`, generating and writing a new
/// one if the file does not exist.
pub fn load_or_generate_signing_key(path: &Path) -> AuthResult<SigningKey> {
    if path.exists() {
        let bytes = fs::read(path)?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AuthError::InvalidKey(format!(
                "{} must hold a 32-byte seed, found {} bytes",
                path.display(),
                bytes.len()
            ))
        })?;
        return Ok(SigningKey::from_bytes(&seed));
    }

    let key = SigningKey::generate(&mut OsRng);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, key.to_bytes())?;
    info!(path = %path.display(), "Generated new auth signing key");
    Ok(key)
}
