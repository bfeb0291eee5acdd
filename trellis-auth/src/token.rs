//! Signed bearer tokens.
//!
//! Tokens use the format: `base64url(payload).base64url(signature)`
//!
//! The payload is a JSON object containing:
//! - `id`: user ID (i64)
//! - `username`: login name
//! - `role`: `admin` or `user`
//! - `iat`: issued-at timestamp (seconds since epoch)
//! - `exp`: optional expiry timestamp (seconds since epoch)
//!
//! The signature covers `payload_b64.as_bytes()` (the base64url-encoded
//! payload string, not the decoded JSON).

use crate::error::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use trellis_types::{Claims, Role};

/// Verifies a presented credential and yields the caller's identity.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> AuthResult<Claims>;
}

/// Extracts the token from an `Authorization` header value.
///
/// An absent header, or `Bearer` with nothing after it, is `Missing`.
/// Any other scheme is `InvalidFormat`.
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::Missing)?;

    let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat(format!(
            "unsupported authorization scheme `{scheme}`"
        )));
    }

    match rest.trim() {
        "" => Err(AuthError::Missing),
        token => Ok(token),
    }
}

/// The decoded token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub id: i64,
    pub username: String,
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiry timestamp (seconds since epoch), or None for no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenPayload {
    #[must_use]
    pub fn claims(&self) -> Claims {
        Claims::new(self.id, self.username.clone(), self.role)
    }
}

/// Issues tokens signed with an Ed25519 key.
pub struct TokenSigner {
    key: SigningKey,
}

impl TokenSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Verifier for tokens issued by this signer.
    #[must_use]
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier {
            key: self.key.verifying_key(),
        }
    }

    /// Issues a token for `claims`, valid for `ttl` if given.
    pub fn issue(&self, claims: &Claims, ttl: Option<chrono::Duration>) -> AuthResult<String> {
        let iat = chrono::Utc::now().timestamp();
        let payload = TokenPayload {
            id: claims.id,
            username: claims.username.clone(),
            role: claims.role,
            iat,
            exp: ttl.map(|d| iat + d.num_seconds()),
        };
        self.sign_payload(&payload)
    }

    /// Signs an arbitrary payload. Lets callers control `iat` and `exp`.
    pub fn sign_payload(&self, payload: &TokenPayload) -> AuthResult<String> {
        let json =
            serde_json::to_vec(payload).map_err(|e| AuthError::InvalidPayload(e.to_string()))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(json);
        let signature = self.key.sign(payload_b64.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{payload_b64}.{sig_b64}"))
    }
}

/// Verifies tokens against an Ed25519 public key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: VerifyingKey,
}

impl TokenVerifier {
    pub fn from_bytes(public_key: &[u8; 32]) -> AuthResult<Self> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| AuthError::InvalidKey("invalid public key".to_string()))?;
        Ok(Self { key })
    }

    /// Parses, verifies and decodes `token` without checking expiry.
    pub fn decode(&self, token: &str) -> AuthResult<TokenPayload> {
        let token = token.trim();

        let Some((payload_b64, signature_b64)) = token.split_once('.') else {
            return Err(AuthError::InvalidFormat(
                "token must have exactly two parts separated by a dot".to_string(),
            ));
        };
        if signature_b64.contains('.') {
            return Err(AuthError::InvalidFormat(
                "token must have exactly two parts separated by a dot".to_string(),
            ));
        }

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| AuthError::InvalidFormat(format!("invalid signature base64: {e}")))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| AuthError::InvalidFormat("invalid signature length".to_string()))?;

        self.key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| AuthError::InvalidFormat(format!("invalid payload base64: {e}")))?;

        serde_json::from_slice(&payload_json)
            .map_err(|e| AuthError::InvalidPayload(format!("invalid payload JSON: {e}")))
    }
}

impl CredentialVerifier for TokenVerifier {
    fn verify(&self, token: &str) -> AuthResult<Claims> {
        let payload = self.decode(token)?;
        if let Some(exp) = payload.exp {
            if chrono::Utc::now().timestamp() >= exp {
                return Err(AuthError::Expired);
            }
        }
        Ok(payload.claims())
    }
}
