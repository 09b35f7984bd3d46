use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use super::list_query::{push_filters, push_order_and_page};
use super::map_db_error;
use crate::domain::geo::{LatLng, EARTH_RADIUS_KM};
use crate::domain::query::ListQuery;
use crate::domain::repositories::{CrudRepository, RepositoryError, RepositoryResult, TourRepository};
use crate::domain::review::RatingSummary;
use crate::domain::tour::stats::{year_bounds, STATS_MIN_RATING};
use crate::domain::tour::{Location, MonthlyPlan, Tour, TourDistance, TourStats};

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, ratings_average, \
     ratings_quantity, price, price_discount, summary, description, image_cover, images, \
     start_dates, secret_tour, start_location, locations, guides, created_at";

/// Great-circle angle in radians between `start_location` and the point ($1 lat, $2 lng)
const ANGLE_SQL: &str = "2 * ASIN(LEAST(1.0, SQRT(\
     POWER(SIN(RADIANS(((start_location->'coordinates'->>1)::float8 - $1) / 2)), 2) \
     + COS(RADIANS($1)) * COS(RADIANS((start_location->'coordinates'->>1)::float8)) \
     * POWER(SIN(RADIANS(((start_location->'coordinates'->>0)::float8 - $2) / 2)), 2))))";

#[derive(Debug, FromRow)]
struct TourRow {
    id: Uuid,
    name: String,
    slug: String,
    duration: i32,
    max_group_size: i32,
    difficulty: String,
    ratings_average: f64,
    ratings_quantity: i32,
    price: Decimal,
    price_discount: Option<Decimal>,
    summary: String,
    description: Option<String>,
    image_cover: String,
    images: Vec<String>,
    start_dates: Vec<DateTime<Utc>>,
    secret_tour: bool,
    start_location: Option<Json<Location>>,
    locations: Json<Vec<Location>>,
    guides: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TourRow> for Tour {
    type Error = RepositoryError;

    fn try_from(row: TourRow) -> Result<Self, Self::Error> {
        let difficulty = row
            .difficulty
            .parse()
            .map_err(|e| RepositoryError::Database(format!("Invalid difficulty from database: {}", e)))?;

        Ok(Tour {
            id: row.id,
            name: row.name,
            slug: row.slug,
            duration: row.duration,
            max_group_size: row.max_group_size,
            difficulty,
            ratings_average: row.ratings_average,
            ratings_quantity: row.ratings_quantity,
            price: row.price,
            price_discount: row.price_discount,
            summary: row.summary,
            description: row.description,
            image_cover: row.image_cover,
            images: row.images,
            start_dates: row.start_dates,
            secret_tour: row.secret_tour,
            start_location: row.start_location.map(|Json(location)| location),
            locations: row.locations.0,
            guides: row.guides,
            created_at: row.created_at,
        })
    }
}

fn into_tours(rows: Vec<TourRow>) -> RepositoryResult<Vec<Tour>> {
    rows.into_iter().map(Tour::try_from).collect()
}

/// PostgreSQL implementation of TourRepository
pub struct PostgresTourRepository {
    pool: PgPool,
}

impl PostgresTourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository<Tour> for PostgresTourRepository {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Tour>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM tours WHERE secret_tour = FALSE",
            TOUR_COLUMNS
        ));
        push_filters(&mut builder, query);
        push_order_and_page(&mut builder, query);

        let rows = builder
            .build_query_as::<TourRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        into_tours(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Tour>> {
        sqlx::query_as::<_, TourRow>(&format!(
            "SELECT {} FROM tours WHERE id = $1 AND secret_tour = FALSE",
            TOUR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Tour::try_from)
        .transpose()
    }

    async fn insert(&self, tour: &Tour) -> RepositoryResult<()> {
        sqlx::query(&format!(
            "INSERT INTO tours ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
            TOUR_COLUMNS
        ))
        .bind(tour.id)
        .bind(&tour.name)
        .bind(&tour.slug)
        .bind(tour.duration)
        .bind(tour.max_group_size)
        .bind(tour.difficulty.as_str())
        .bind(tour.ratings_average)
        .bind(tour.ratings_quantity)
        .bind(tour.price)
        .bind(tour.price_discount)
        .bind(&tour.summary)
        .bind(&tour.description)
        .bind(&tour.image_cover)
        .bind(&tour.images)
        .bind(&tour.start_dates)
        .bind(tour.secret_tour)
        .bind(tour.start_location.as_ref().map(Json))
        .bind(Json(&tour.locations))
        .bind(&tour.guides)
        .bind(tour.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn update(&self, tour: &Tour) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tours
            SET name = $2, slug = $3, duration = $4, max_group_size = $5, difficulty = $6,
                ratings_average = $7, ratings_quantity = $8, price = $9, price_discount = $10,
                summary = $11, description = $12, image_cover = $13, images = $14,
                start_dates = $15, secret_tour = $16, start_location = $17, locations = $18,
                guides = $19
            WHERE id = $1
            "#,
        )
        .bind(tour.id)
        .bind(&tour.name)
        .bind(&tour.slug)
        .bind(tour.duration)
        .bind(tour.max_group_size)
        .bind(tour.difficulty.as_str())
        .bind(tour.ratings_average)
        .bind(tour.ratings_quantity)
        .bind(tour.price)
        .bind(tour.price_discount)
        .bind(&tour.summary)
        .bind(&tour.description)
        .bind(&tour.image_cover)
        .bind(&tour.images)
        .bind(&tour.start_dates)
        .bind(tour.secret_tour)
        .bind(tour.start_location.as_ref().map(Json))
        .bind(Json(&tour.locations))
        .bind(&tour.guides)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM tours WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TourRepository for PostgresTourRepository {
    fn as_crud(&self) -> &dyn CrudRepository<Tour> {
        self
    }

    async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tour>> {
        sqlx::query_as::<_, TourRow>(&format!(
            "SELECT {} FROM tours WHERE slug = $1 AND secret_tour = FALSE",
            TOUR_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Tour::try_from)
        .transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Tour>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, TourRow>(&format!(
            "SELECT {} FROM tours WHERE id = ANY($1) AND secret_tour = FALSE ORDER BY created_at DESC",
            TOUR_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        into_tours(rows)
    }

    async fn stats(&self) -> RepositoryResult<Vec<TourStats>> {
        sqlx::query_as::<_, TourStats>(
            r#"
            SELECT UPPER(difficulty) AS difficulty,
                   COUNT(*) AS num_tours,
                   COALESCE(SUM(ratings_quantity), 0)::int8 AS num_ratings,
                   AVG(ratings_average) AS average_rating,
                   AVG(price) AS average_price,
                   MIN(price) AS minimum_price,
                   MAX(price) AS maximum_price
            FROM tours
            WHERE ratings_average >= $1 AND secret_tour = FALSE
            GROUP BY UPPER(difficulty)
            ORDER BY average_price ASC
            "#,
        )
        .bind(STATS_MIN_RATING)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn monthly_plan(&self, year: i32) -> RepositoryResult<Vec<MonthlyPlan>> {
        let Some((start, end)) = year_bounds(year) else {
            return Ok(Vec::new());
        };

        sqlx::query_as::<_, MonthlyPlan>(
            r#"
            SELECT EXTRACT(MONTH FROM starts.start_date AT TIME ZONE 'UTC')::int4 AS month,
                   COUNT(*) AS num_tour_starts,
                   ARRAY_AGG(t.name ORDER BY starts.start_date) AS tours
            FROM tours t
            CROSS JOIN LATERAL UNNEST(t.start_dates) AS starts(start_date)
            WHERE t.secret_tour = FALSE AND starts.start_date >= $1 AND starts.start_date < $2
            GROUP BY 1
            ORDER BY num_tour_starts DESC, month ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn within(&self, center: LatLng, radius: f64) -> RepositoryResult<Vec<Tour>> {
        let rows = sqlx::query_as::<_, TourRow>(&format!(
            "SELECT {columns} FROM tours \
             WHERE secret_tour = FALSE AND start_location IS NOT NULL AND {angle} <= $3 \
             ORDER BY {angle}",
            columns = TOUR_COLUMNS,
            angle = ANGLE_SQL
        ))
        .bind(center.lat)
        .bind(center.lng)
        .bind(radius)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        into_tours(rows)
    }

    async fn distances(&self, from: LatLng, multiplier: f64) -> RepositoryResult<Vec<TourDistance>> {
        sqlx::query_as::<_, TourDistance>(&format!(
            "SELECT id, name, {angle} * $3 * $4 AS distance FROM tours \
             WHERE secret_tour = FALSE AND start_location IS NOT NULL \
             ORDER BY distance ASC",
            angle = ANGLE_SQL
        ))
        .bind(from.lat)
        .bind(from.lng)
        .bind(EARTH_RADIUS_KM * 1000.0)
        .bind(multiplier)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_ratings(&self, id: Uuid, summary: RatingSummary) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE tours SET ratings_quantity = $2, ratings_average = ROUND(($3)::numeric, 1)::float8 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(summary.quantity)
        .bind(summary.average)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM tours")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
