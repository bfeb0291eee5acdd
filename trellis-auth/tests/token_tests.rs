mod common;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::{payload_at, test_signer, TEST_SEED};
use ed25519_dalek::SigningKey;
use pretty_assertions::assert_eq;
use trellis_auth::{AuthError, CredentialVerifier, TokenSigner, TokenVerifier};
use trellis_types::{Claims, Role};

// ── Verification ─────────────────────────────────────────────────

#[test]
fn verifier_from_public_bytes_accepts_issued_token() {
    let signer = test_signer();
    let public = SigningKey::from_bytes(&TEST_SEED).verifying_key().to_bytes();
    let verifier = TokenVerifier::from_bytes(&public).unwrap();

    let claims = Claims::new(9, "editor", Role::User);
    let token = signer.issue(&claims, Some(chrono::Duration::hours(1))).unwrap();
    assert_eq!(verifier.verify(&token).unwrap(), claims);
}

#[test]
fn token_from_other_key_has_invalid_signature() {
    let other = TokenSigner::from_seed(&[42u8; 32]);
    let token = other.issue(&Claims::new(1, "x", Role::Admin), None).unwrap();

    let err = test_signer().verifier().verify(&token).unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature));
}

#[test]
fn tampered_payload_has_invalid_signature() {
    let signer = test_signer();
    let token = signer.issue(&Claims::new(2, "user", Role::User), None).unwrap();
    let (_, sig) = token.split_once('.').unwrap();

    let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"id":2,"username":"user","role":"admin","iat":0}"#);
    let forged = format!("{forged_payload}.{sig}");

    let err = signer.verifier().verify(&forged).unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature));
}

#[test]
fn garbage_is_invalid_format() {
    let verifier = test_signer().verifier();
    assert!(matches!(verifier.verify("not-a-token"), Err(AuthError::InvalidFormat(_))));
    assert!(matches!(verifier.verify("abc.!!!"), Err(AuthError::InvalidFormat(_))));
}

// ── Expiry ───────────────────────────────────────────────────────

#[test]
fn expired_token_is_rejected() {
    let signer = test_signer();
    let now = chrono::Utc::now().timestamp();
    let token = signer
        .sign_payload(&payload_at(Role::Admin, now - 7200, Some(now - 3600)))
        .unwrap();

    let err = signer.verifier().verify(&token).unwrap_err();
    assert!(matches!(err, AuthError::Expired));
}

#[test]
fn unexpired_token_is_accepted() {
    let signer = test_signer();
    let now = chrono::Utc::now().timestamp();
    let token = signer
        .sign_payload(&payload_at(Role::Admin, now, Some(now + 3600)))
        .unwrap();

    let claims = signer.verifier().verify(&token).unwrap();
    assert!(claims.is_admin());
}

#[test]
fn decode_ignores_expiry() {
    let signer = test_signer();
    let token = signer.sign_payload(&payload_at(Role::User, 10, Some(20))).unwrap();
    let payload = signer.verifier().decode(&token).unwrap();
    assert_eq!(payload.exp, Some(20));
}

// ── Errors ───────────────────────────────────────────────────────

#[test]
fn missing_is_distinguished_from_invalid() {
    assert!(AuthError::Missing.is_missing());
    assert!(!AuthError::InvalidSignature.is_missing());
    assert_eq!(AuthError::Missing.to_string(), "missing bearer token");
}
