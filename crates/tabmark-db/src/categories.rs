//! Category repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabmark_core::{
    normalize_category_name, Category, CategoryRepository, CreateCategoryRequest, Error, Result,
    UpdateCategoryRequest,
};

use crate::map_unique_violation;

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.name, c.description, c.color, c.created_at,
           COALESCE((SELECT COUNT(*) FROM bookmark b
                     WHERE b.user_id = c.user_id
                       AND lower(b.category) = lower(c.name)), 0) AS bookmark_count
    FROM category c
"#;

/// PostgreSQL implementation of CategoryRepository.
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &PgRow) -> Category {
        Category {
            id: r.get("id"),
            user_id: r.get("user_id"),
            name: r.get("name"),
            description: r.get("description"),
            color: r.get("color"),
            created_at: r.get("created_at"),
            bookmark_count: r.get("bookmark_count"),
        }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, user_id: Uuid, req: CreateCategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name).map_err(Error::InvalidInput)?;
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO category (id, user_id, name, description, color, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&name)
        .bind(&req.description)
        .bind(&req.color)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Category '{}' already exists", name)))?;

        Ok(Category {
            id,
            user_id,
            name,
            description: req.description,
            color: req.color,
            created_at: now,
            bookmark_count: 0,
        })
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "{} WHERE c.id = $1 AND c.user_id = $2",
            CATEGORY_SELECT
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.user_id = $1 ORDER BY lower(c.name)",
            CATEGORY_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Category> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let current = sqlx::query(
            "SELECT name, description, color FROM category
             WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::CategoryNotFound(id))?;

        let old_name: String = current.get("name");
        let name = match req.name.as_deref() {
            Some(n) => normalize_category_name(n).map_err(Error::InvalidInput)?,
            None => old_name.clone(),
        };
        let description: Option<String> = req.description.or_else(|| current.get("description"));
        let color: Option<String> = req.color.or_else(|| current.get("color"));

        sqlx::query(
            "UPDATE category SET name = $1, description = $2, color = $3
             WHERE id = $4 AND user_id = $5",
        )
        .bind(&name)
        .bind(&description)
        .bind(&color)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, format!("Category '{}' already exists", name)))?;

        if name != old_name {
            // Bookmarks reference categories by label.
            sqlx::query(
                "UPDATE bookmark SET category = $1, updated_at = $2
                 WHERE user_id = $3 AND lower(category) = lower($4)",
            )
            .bind(&name)
            .bind(Utc::now())
            .bind(user_id)
            .bind(&old_name)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        let row = sqlx::query(&format!(
            "{} WHERE c.id = $1 AND c.user_id = $2",
            CATEGORY_SELECT
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(Self::parse_row(&row))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let name: String = sqlx::query_scalar(
            "SELECT name FROM category WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::CategoryNotFound(id))?;

        let in_use: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookmark WHERE user_id = $1 AND lower(category) = lower($2)",
        )
        .bind(user_id)
        .bind(&name)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "Category '{}' still contains {} bookmark(s)",
                name, in_use
            )));
        }

        sqlx::query("DELETE FROM category WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
