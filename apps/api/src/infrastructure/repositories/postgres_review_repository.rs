use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use super::list_query::{push_filters, push_order_and_page};
use super::map_db_error;
use crate::domain::query::ListQuery;
use crate::domain::repositories::{CrudRepository, RepositoryResult, ReviewRepository};
use crate::domain::review::{RatingSummary, Review};
use crate::domain::tour::tour::DEFAULT_RATINGS_AVERAGE;

const REVIEW_COLUMNS: &str = "id, review, rating, created_at, tour_id, user_id";

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    review: String,
    rating: i32,
    created_at: DateTime<Utc>,
    tour_id: Uuid,
    user_id: Uuid,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            review: row.review,
            rating: row.rating,
            created_at: row.created_at,
            tour: row.tour_id,
            user: row.user_id,
        }
    }
}

/// PostgreSQL implementation of ReviewRepository
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository<Review> for PostgresReviewRepository {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Review>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM reviews WHERE TRUE",
            REVIEW_COLUMNS
        ));
        push_filters(&mut builder, query);
        push_order_and_page(&mut builder, query);

        let rows = builder
            .build_query_as::<ReviewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Review::from))
    }

    async fn insert(&self, review: &Review) -> RepositoryResult<()> {
        sqlx::query(&format!(
            "INSERT INTO reviews ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            REVIEW_COLUMNS
        ))
        .bind(review.id)
        .bind(&review.review)
        .bind(review.rating)
        .bind(review.created_at)
        .bind(review.tour)
        .bind(review.user)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn update(&self, review: &Review) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE reviews SET review = $2, rating = $3 WHERE id = $1")
            .bind(review.id)
            .bind(&review.review)
            .bind(review.rating)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    fn as_crud(&self) -> &dyn CrudRepository<Review> {
        self
    }

    async fn find_by_tour(&self, tour_id: Uuid) -> RepositoryResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE tour_id = $1 ORDER BY created_at DESC, id ASC",
            REVIEW_COLUMNS
        ))
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn rating_summary(&self, tour_id: Uuid) -> RepositoryResult<RatingSummary> {
        sqlx::query_as::<_, RatingSummary>(
            "SELECT COUNT(*)::int4 AS quantity, COALESCE(AVG(rating)::float8, $2) AS average \
             FROM reviews WHERE tour_id = $1",
        )
        .bind(tour_id)
        .bind(DEFAULT_RATINGS_AVERAGE)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM reviews")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
