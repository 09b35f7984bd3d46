// Password reset tokens
// The raw token is emailed once; only its SHA-256 digest is stored

use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A freshly issued reset token and the digest to persist
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub digest: String,
}

pub fn generate_reset_token() -> ResetToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = digest_token(&token);
    ResetToken { token, digest }
}

/// Hex-encoded SHA-256 of a raw token
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
