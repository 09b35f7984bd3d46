// Domain layer module exports
// Entities, validation rules and repository ports
// Independent of HTTP and storage concerns

pub mod booking;
pub mod entity;
pub mod errors;
pub mod geo;
pub mod query;
pub mod repositories;
pub mod review;
pub mod tour;
pub mod user;
