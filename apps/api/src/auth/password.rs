// Password hashing utilities
// Uses bcrypt; the cost factor comes from configuration

use bcrypt::{hash, verify, BcryptError};

/// Hashes a password using bcrypt
///
/// # Example
/// ```
/// use natours_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("my_password", 4).expect("valid hash");
/// assert!(verify_password("my_password", &hash));
/// ```
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    hash(password, cost)
}

/// Verifies a password against a bcrypt hash
///
/// A malformed hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    verify(password, hash).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Stored password hash could not be verified");
        false
    })
}
