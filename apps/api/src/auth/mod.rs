// Authentication primitives: session tokens, password hashing and reset tokens

pub mod jwt;
pub mod password;
pub mod reset_token;

pub use jwt::{create_token, verify_token, Claims, TokenError};
pub use password::{hash_password, verify_password};
pub use reset_token::{digest_token, generate_reset_token, ResetToken};
