//! PostgreSQL-backed person store.

use crate::errors::ApiError;
use crate::models::Person;
use crate::repositories::{NewPerson, PersonStore, PersonUpdate};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

/// Person store over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgPersonStore {
    pool: PgPool,
}

impl PgPersonStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    #[instrument(skip(self), name = "roster.repo.person.list")]
    async fn list(&self) -> Result<Vec<Person>, ApiError> {
        let people = sqlx::query_as::<_, Person>(
            "SELECT id, name, email, created_at, updated_at, update_user
             FROM people
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(people)
    }

    #[instrument(skip(self), name = "roster.repo.person.get")]
    async fn get(&self, id: i32) -> Result<Option<Person>, ApiError> {
        let person = sqlx::query_as::<_, Person>(
            "SELECT id, name, email, created_at, updated_at, update_user
             FROM people
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(person)
    }

    #[instrument(skip(self, record), name = "roster.repo.person.insert")]
    async fn insert(&self, record: NewPerson) -> Result<Person, ApiError> {
        let now = chrono::Utc::now().naive_utc();

        let person = sqlx::query_as::<_, Person>(
            "INSERT INTO people (name, email, created_at, updated_at, update_user)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, email, created_at, updated_at, update_user",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(now)
        .bind(now)
        .bind(&record.update_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(person)
    }

    #[instrument(skip(self, record), name = "roster.repo.person.update")]
    async fn update(&self, id: i32, record: PersonUpdate) -> Result<u64, ApiError> {
        let now = chrono::Utc::now().naive_utc();

        let result = sqlx::query(
            "UPDATE people
             SET name = $2, email = $3, updated_at = $4, update_user = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(now)
        .bind(&record.update_user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), name = "roster.repo.person.delete")]
    async fn delete(&self, id: i32) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM people WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), name = "roster.repo.person.ping")]
    async fn ping(&self) -> Result<(), ApiError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
