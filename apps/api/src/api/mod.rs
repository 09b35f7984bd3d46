// HTTP adapter: routing, handlers, middleware and the error/response envelopes

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;

pub use router::build_router;
