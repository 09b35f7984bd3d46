// HTTP middleware: authentication, error finishing, rate limiting,
// request ids and security headers

pub mod auth;
pub mod errors;
pub mod rate_limit;
pub mod request_id;
pub mod security;

pub use auth::{protect, require_roles, CurrentUser, MaybeUser};
pub use errors::handle_errors;
pub use rate_limit::rate_limit;
pub use request_id::request_id;
pub use security::security_headers;
