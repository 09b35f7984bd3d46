// Repository ports
// Implemented by the PostgreSQL adapters and the in-memory store

use thiserror::Error;

pub mod booking_repository;
pub mod crud;
pub mod review_repository;
pub mod tour_repository;
pub mod user_repository;

pub use booking_repository::BookingRepository;
pub use crud::CrudRepository;
pub use review_repository::ReviewRepository;
pub use tour_repository::TourRepository;
pub use user_repository::UserRepository;

/// Storage failures, classified so the API can answer with the right status
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write
    #[error("Duplicate field value: {0}")]
    Duplicate(String),

    /// The store could not interpret a value for a typed column
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A referenced tour or user does not exist
    #[error("No {0} found with that ID")]
    MissingReference(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
