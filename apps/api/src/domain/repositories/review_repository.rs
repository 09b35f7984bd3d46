use async_trait::async_trait;
use uuid::Uuid;

use super::{CrudRepository, RepositoryResult};
use crate::domain::review::{RatingSummary, Review};

#[async_trait]
pub trait ReviewRepository: CrudRepository<Review> {
    fn as_crud(&self) -> &dyn CrudRepository<Review>;

    /// Reviews of one tour, newest first
    async fn find_by_tour(&self, tour_id: Uuid) -> RepositoryResult<Vec<Review>>;

    async fn rating_summary(&self, tour_id: Uuid) -> RepositoryResult<RatingSummary>;

    async fn delete_all(&self) -> RepositoryResult<u64>;
}
