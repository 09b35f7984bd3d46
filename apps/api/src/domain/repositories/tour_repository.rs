use async_trait::async_trait;
use uuid::Uuid;

use super::{CrudRepository, RepositoryResult};
use crate::domain::geo::LatLng;
use crate::domain::review::RatingSummary;
use crate::domain::tour::{MonthlyPlan, Tour, TourDistance, TourStats};

/// Repository trait for tours
///
/// Secret tours are excluded from every read.
#[async_trait]
pub trait TourRepository: CrudRepository<Tour> {
    fn as_crud(&self) -> &dyn CrudRepository<Tour>;

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tour>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Tour>>;

    /// Difficulty statistics of tours rated 4.5 or better
    async fn stats(&self) -> RepositoryResult<Vec<TourStats>>;

    async fn monthly_plan(&self, year: i32) -> RepositoryResult<Vec<MonthlyPlan>>;

    /// Tours starting within `radius` radians of `center`
    async fn within(&self, center: LatLng, radius: f64) -> RepositoryResult<Vec<Tour>>;

    /// Distance to each tour's start, in meters scaled by `multiplier`
    async fn distances(&self, from: LatLng, multiplier: f64) -> RepositoryResult<Vec<TourDistance>>;

    async fn update_ratings(&self, id: Uuid, summary: RatingSummary) -> RepositoryResult<()>;

    async fn delete_all(&self) -> RepositoryResult<u64>;
}
