//! Tag repository implementation.
//!
//! Tags have no table of their own; they are derived from bookmark tag
//! arrays.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabmark_core::{Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.name, COUNT(*) AS bookmark_count
            FROM bookmark b, unnest(b.tags) AS t(name)
            WHERE b.user_id = $1
            GROUP BY t.name
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Tag {
                name: r.get("name"),
                bookmark_count: r.get("bookmark_count"),
            })
            .collect())
    }
}
