use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use super::list_query::{push_filters, push_order_and_page};
use super::map_db_error;
use crate::domain::query::ListQuery;
use crate::domain::repositories::{CrudRepository, RepositoryError, RepositoryResult, UserRepository};
use crate::domain::user::{Email, User};

const USER_COLUMNS: &str = "id, name, email, role, photo, password_hash, password_changed_at, \
     password_reset_token, password_reset_expires, active, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    photo: String,
    password_hash: String,
    password_changed_at: DateTime<Utc>,
    password_reset_token: Option<String>,
    password_reset_expires: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::new(&row.email)
            .map_err(|e| RepositoryError::Database(format!("Invalid email from database: {}", e)))?;
        let role = row
            .role
            .parse()
            .map_err(|e| RepositoryError::Database(format!("Invalid role from database: {}", e)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email,
            role,
            photo: row.photo,
            password_hash: row.password_hash,
            password_changed_at: row.password_changed_at,
            password_reset_token: row.password_reset_token,
            password_reset_expires: row.password_reset_expires,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> RepositoryResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new PostgresUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository<User> for PostgresUserRepository {
    async fn find_all(&self, query: &ListQuery) -> RepositoryResult<Vec<User>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM users WHERE active = TRUE",
            USER_COLUMNS
        ));
        push_filters(&mut builder, query);
        push_order_and_page(&mut builder, query);

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        into_users(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND active = TRUE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn insert(&self, user: &User) -> RepositoryResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.role.as_str())
        .bind(&user.photo)
        .bind(&user.password_hash)
        .bind(user.password_changed_at)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .bind(user.active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, role = $4, photo = $5, password_hash = $6,
                password_changed_at = $7, password_reset_token = $8,
                password_reset_expires = $9, active = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.role.as_str())
        .bind(&user.photo)
        .bind(&user.password_hash)
        .bind(user.password_changed_at)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .bind(user.active)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    fn as_crud(&self) -> &dyn CrudRepository<User> {
        self
    }

    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1 AND active = TRUE",
            USER_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users \
             WHERE password_reset_token = $1 AND password_reset_expires > $2 AND active = TRUE",
            USER_COLUMNS
        ))
        .bind(token_digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1) AND active = TRUE",
            USER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        into_users(rows)
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
