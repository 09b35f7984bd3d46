use async_trait::async_trait;
use uuid::Uuid;

use super::{CrudRepository, RepositoryResult};
use crate::domain::booking::Booking;

#[async_trait]
pub trait BookingRepository: CrudRepository<Booking> {
    fn as_crud(&self) -> &dyn CrudRepository<Booking>;

    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>>;
}
