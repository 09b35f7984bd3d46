use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use super::list_query::{push_filters, push_order_and_page};
use super::map_db_error;
use crate::domain::booking::Booking;
use crate::domain::query::ListQuery;
use crate::domain::repositories::{BookingRepository, CrudRepository, RepositoryResult};

const BOOKING_COLUMNS: &str = "id, tour_id, user_id, price, paid, created_at";

#[derive(Debug, FromRow)]
struct BookingRow {
    id: Uuid,
    tour_id: Uuid,
    user_id: Uuid,
    price: Decimal,
    paid: bool,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            tour: row.tour_id,
            user: row.user_id,
            price: row.price,
            paid: row.paid,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL implementation of BookingRepository
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository<Booking> for PostgresBookingRepository {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<Booking>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM bookings WHERE TRUE",
            BOOKING_COLUMNS
        ));
        push_filters(&mut builder, query);
        push_order_and_page(&mut builder, query);

        let rows = builder
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Booking::from))
    }

    async fn insert(&self, booking: &Booking) -> RepositoryResult<()> {
        sqlx::query(&format!(
            "INSERT INTO bookings ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.tour)
        .bind(booking.user)
        .bind(booking.price)
        .bind(booking.paid)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn update(&self, booking: &Booking) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE bookings SET price = $2, paid = $3 WHERE id = $1")
            .bind(booking.id)
            .bind(booking.price)
            .bind(booking.paid)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    fn as_crud(&self) -> &dyn CrudRepository<Booking> {
        self
    }

    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }
}
