// Infrastructure layer module
// Database adapters and external service integrations
// Follows Hexagonal Architecture

pub mod database;
pub mod email;
pub mod http;
pub mod payments;
pub mod repositories;
