//! Publishers repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
};

#[derive(Clone)]
pub struct PublishersRepository {
    pool: Pool<Postgres>,
}

impl PublishersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all publishers
    pub async fn list(&self) -> AppResult<Vec<Publisher>> {
        let rows = sqlx::query_as::<_, Publisher>("SELECT id, name FROM publishers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get publisher by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>("SELECT id, name FROM publishers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher {} not found", id)))
    }

    pub async fn create(&self, data: &CreatePublisher) -> AppResult<Publisher> {
        let row = sqlx::query_as::<_, Publisher>(
            "INSERT INTO publishers (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i32, data: &UpdatePublisher) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>(
            "UPDATE publishers SET name = COALESCE($1, name) WHERE id = $2 RETURNING id, name",
        )
        .bind(data.name.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Publisher {} not found", id)))
    }

    /// Delete a publisher; its books go with it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Publisher {} not found", id)));
        }
        Ok(())
    }
}
