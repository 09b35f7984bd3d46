use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CrudRepository, RepositoryResult};
use crate::domain::user::{Email, User};

/// Repository trait for user accounts
///
/// Lookups only ever return active users.
#[async_trait]
pub trait UserRepository: CrudRepository<User> {
    fn as_crud(&self) -> &dyn CrudRepository<User>;

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;

    /// Finds the user holding an unexpired reset token with this digest
    async fn find_by_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>>;

    async fn delete_all(&self) -> RepositoryResult<u64>;
}
