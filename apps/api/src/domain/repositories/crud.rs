use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::entity::Entity;
use crate::domain::query::ListQuery;

/// Storage operations shared by every entity
///
/// Implementations hide documents that are not publicly visible
/// (inactive users, secret tours) from every read.
#[async_trait]
pub trait CrudRepository<E: Entity>: Send + Sync {
    /// Filtered, sorted and paginated listing; projection is left to the caller
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<E>>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<E>>;

    async fn insert(&self, entity: &E) -> RepositoryResult<()>;

    /// Overwrites a stored entity; `false` if it no longer exists
    async fn update(&self, entity: &E) -> RepositoryResult<bool>;

    /// Removes an entity; `false` if nothing was deleted
    async fn delete(&self, id: Uuid) -> RepositoryResult<bool>;
}
