//! Repository traits implemented by the PostgreSQL and file-system stores.
//!
//! Every operation is scoped to a user id; a record owned by another user
//! behaves exactly like a missing one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::settings::SettingsDomain;

// =============================================================================
// BOOKMARK REPOSITORY
// =============================================================================

/// Repository for bookmark CRUD operations.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Persist a new bookmark built from the request.
    async fn insert(&self, user_id: Uuid, req: CreateBookmarkRequest) -> Result<Bookmark>;

    /// Fetch one bookmark.
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Bookmark>>;

    /// Filtered, paginated listing, newest first.
    async fn list(&self, user_id: Uuid, req: &ListBookmarksRequest)
        -> Result<ListBookmarksResponse>;

    /// Every bookmark of the user (analytics).
    async fn list_all(&self, user_id: Uuid) -> Result<Vec<Bookmark>>;

    /// Oldest bookmark with the given content hash.
    async fn find_by_hash(&self, user_id: Uuid, content_hash: &str) -> Result<Option<Bookmark>>;

    /// Partial update. Missing bookmark → `Error::BookmarkNotFound`.
    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateBookmarkRequest,
    ) -> Result<Bookmark>;

    /// Delete. Missing bookmark → `Error::BookmarkNotFound`.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    /// Increment the visit counter.
    async fn record_visit(&self, user_id: Uuid, id: Uuid) -> Result<Bookmark>;

    /// Store the result of a link health check.
    async fn set_health(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Bookmark>;
}

// =============================================================================
// CATEGORY REPOSITORY
// =============================================================================

/// Repository for category operations.
///
/// Names are unique per user, compared case-insensitively.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category. Duplicate name → `Error::Conflict`.
    async fn create(&self, user_id: Uuid, req: CreateCategoryRequest) -> Result<Category>;

    /// Get a category with its bookmark count.
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>>;

    /// List categories ordered by name, with bookmark counts.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Category>>;

    /// Update a category. A rename relabels the category's bookmarks.
    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateCategoryRequest)
        -> Result<Category>;

    /// Delete a category. Categories that still hold bookmarks →
    /// `Error::Conflict`.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Tags derived from bookmark tag lists.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags of the user with bookmark counts, ordered by name.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>>;
}

// =============================================================================
// SETTINGS REPOSITORY
// =============================================================================

/// Per-user settings storage, one JSON value per (domain, key).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Stored value, or `None` when unset.
    async fn get(&self, user_id: Uuid, domain: SettingsDomain, key: &str)
        -> Result<Option<JsonValue>>;

    /// Every stored key of the domain.
    async fn get_all(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
    ) -> Result<BTreeMap<String, JsonValue>>;

    /// Replace the value of one key.
    async fn set(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
        key: &str,
        value: JsonValue,
    ) -> Result<()>;
}
