//! Shared test helpers for token tests.

#![allow(dead_code)]

use trellis_auth::{TokenPayload, TokenSigner};
use trellis_types::Role;

/// Deterministic seed so signatures are reproducible across runs.
pub const TEST_SEED: [u8; 32] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32,
];

pub fn test_signer() -> TokenSigner {
    TokenSigner::from_seed(&TEST_SEED)
}

/// A payload issued at `iat` with the given expiry.
pub fn payload_at(role: Role, iat: i64, exp: Option<i64>) -> TokenPayload {
    TokenPayload {
        id: 1,
        username: "tester".into(),
        role,
        iat,
        exp,
    }
}
