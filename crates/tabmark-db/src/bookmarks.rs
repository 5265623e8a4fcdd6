//! Bookmark repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabmark_core::{
    Bookmark, BookmarkRepository, CreateBookmarkRequest, Error, HealthStatus,
    ListBookmarksRequest, ListBookmarksResponse, Result, UpdateBookmarkRequest,
};

use crate::escape_like;

const BOOKMARK_COLUMNS: &str = "id, user_id, title, url, description, category, tags, \
     favicon_url, content_hash, health_status, last_checked_at, visit_count, \
     last_visited_at, created_at, updated_at";

// Nullable filters: $2 category, $3 tag, $4 ILIKE pattern.
const FILTER_CLAUSE: &str = "user_id = $1
       AND ($2::text IS NULL OR lower(category) = lower($2))
       AND ($3::text IS NULL OR $3 = ANY(tags))
       AND ($4::text IS NULL
            OR title ILIKE $4
            OR url ILIKE $4
            OR COALESCE(description, '') ILIKE $4)";

/// PostgreSQL implementation of BookmarkRepository.
#[derive(Clone)]
pub struct PgBookmarkRepository {
    pool: Pool<Postgres>,
}

impl PgBookmarkRepository {
    /// Create a new PgBookmarkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &PgRow) -> Result<Bookmark> {
        let health: String = r.get("health_status");
        Ok(Bookmark {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            url: r.get("url"),
            description: r.get("description"),
            category: r.get("category"),
            tags: r.get("tags"),
            favicon_url: r.get("favicon_url"),
            content_hash: r.get("content_hash"),
            health_status: health.parse::<HealthStatus>().map_err(Error::Internal)?,
            last_checked_at: r.get("last_checked_at"),
            visit_count: r.get("visit_count"),
            last_visited_at: r.get("last_visited_at"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        })
    }

    fn like_pattern(q: Option<&str>) -> Option<String> {
        q.map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

#[async_trait]
impl BookmarkRepository for PgBookmarkRepository {
    async fn insert(&self, user_id: Uuid, req: CreateBookmarkRequest) -> Result<Bookmark> {
        let b = Bookmark::from_request(user_id, req)?;

        sqlx::query(
            "INSERT INTO bookmark (id, user_id, title, url, description, category, tags,
                                   favicon_url, content_hash, health_status, visit_count,
                                   created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(b.id)
        .bind(b.user_id)
        .bind(&b.title)
        .bind(&b.url)
        .bind(&b.description)
        .bind(&b.category)
        .bind(&b.tags)
        .bind(&b.favicon_url)
        .bind(&b.content_hash)
        .bind(b.health_status.as_str())
        .bind(b.visit_count)
        .bind(b.created_at)
        .bind(b.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(b)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Bookmark>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bookmark WHERE id = $1 AND user_id = $2",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn list(
        &self,
        user_id: Uuid,
        req: &ListBookmarksRequest,
    ) -> Result<ListBookmarksResponse> {
        let pattern = Self::like_pattern(req.q.as_deref());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM bookmark WHERE {}",
            FILTER_CLAUSE
        ))
        .bind(user_id)
        .bind(&req.category)
        .bind(&req.tag)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookmark WHERE {}
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6",
            BOOKMARK_COLUMNS, FILTER_CLAUSE
        ))
        .bind(user_id)
        .bind(&req.category)
        .bind(&req.tag)
        .bind(&pattern)
        .bind(req.effective_limit())
        .bind(req.effective_offset())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let bookmarks = rows
            .iter()
            .map(Self::parse_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListBookmarksResponse { bookmarks, total })
    }

    async fn list_all(&self, user_id: Uuid) -> Result<Vec<Bookmark>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookmark WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKMARK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_row).collect()
    }

    async fn find_by_hash(&self, user_id: Uuid, content_hash: &str) -> Result<Option<Bookmark>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bookmark WHERE user_id = $1 AND content_hash = $2
             ORDER BY created_at ASC LIMIT 1",
            BOOKMARK_COLUMNS
        ))
        .bind(user_id)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateBookmarkRequest,
    ) -> Result<Bookmark> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM bookmark WHERE id = $1 AND user_id = $2 FOR UPDATE",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::BookmarkNotFound(id))?;

        let mut b = Self::parse_row(&row)?;
        b.apply_update(req)?;

        sqlx::query(
            "UPDATE bookmark
             SET title = $1, url = $2, description = $3, category = $4, tags = $5,
                 favicon_url = $6, content_hash = $7, health_status = $8,
                 last_checked_at = $9, updated_at = $10
             WHERE id = $11 AND user_id = $12",
        )
        .bind(&b.title)
        .bind(&b.url)
        .bind(&b.description)
        .bind(&b.category)
        .bind(&b.tags)
        .bind(&b.favicon_url)
        .bind(&b.content_hash)
        .bind(b.health_status.as_str())
        .bind(b.last_checked_at)
        .bind(b.updated_at)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(b)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM bookmark WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::BookmarkNotFound(id));
        }
        Ok(())
    }

    async fn record_visit(&self, user_id: Uuid, id: Uuid) -> Result<Bookmark> {
        let row = sqlx::query(&format!(
            "UPDATE bookmark
             SET visit_count = visit_count + 1, last_visited_at = $3
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::BookmarkNotFound(id))?;

        Self::parse_row(&row)
    }

    async fn set_health(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Bookmark> {
        let row = sqlx::query(&format!(
            "UPDATE bookmark
             SET health_status = $3, last_checked_at = $4
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(checked_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::BookmarkNotFound(id))?;

        Self::parse_row(&row)
    }
}
