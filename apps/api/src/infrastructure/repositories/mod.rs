// Repository implementations (data access layer)
// Adapters that implement the domain repository ports

pub mod list_query;
pub mod memory;
pub mod postgres_booking_repository;
pub mod postgres_review_repository;
pub mod postgres_tour_repository;
pub mod postgres_user_repository;

pub use memory::MemoryStore;
pub use postgres_booking_repository::PostgresBookingRepository;
pub use postgres_review_repository::PostgresReviewRepository;
pub use postgres_tour_repository::PostgresTourRepository;
pub use postgres_user_repository::PostgresUserRepository;

use crate::domain::repositories::RepositoryError;

/// Classifies a database error
///
/// Unique and foreign-key violations are reported per field so clients get
/// a 400 naming the offending value.
pub fn map_db_error(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        match db.code().as_deref() {
            Some("23505") => {
                return RepositoryError::Duplicate(unique_field(db.constraint()).to_string())
            }
            Some("23503") => {
                return RepositoryError::MissingReference(
                    reference_field(db.constraint()).to_string(),
                )
            }
            _ => {}
        }
    }
    RepositoryError::Database(error.to_string())
}

fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email",
        Some("tours_name_key") => "name",
        Some("tours_slug_key") => "slug",
        Some("reviews_tour_id_user_id_key") => "tour, user",
        _ => "unknown",
    }
}

fn reference_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.ends_with("_tour_id_fkey") => "tour",
        Some(name) if name.ends_with("_user_id_fkey") => "user",
        _ => "document",
    }
}
