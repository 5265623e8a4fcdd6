//! Domain models for bookmarks, categories, and tags.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::url_utils::{content_hash, parse_bookmark_url, primary_favicon};

// =============================================================================
// BOOKMARK TYPES
// =============================================================================

/// Result of the most recent link health check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never checked.
    #[default]
    Unknown,
    /// Responded with a non-error status.
    Healthy,
    /// Unreachable or responded with an error status.
    Broken,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Broken => "broken",
        }
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(HealthStatus::Unknown),
            "healthy" => Ok(HealthStatus::Healthy),
            "broken" => Ok(HealthStatus::Broken),
            other => Err(format!("unknown health status '{}'", other)),
        }
    }
}

/// A saved bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category label (matches a `Category::name` for the same user).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    /// SHA-256 of the normalized URL, used for duplicate detection.
    pub content_hash: String,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visit_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    /// Validate a create request and build the record a store will persist.
    ///
    /// The title falls back to the URL; tags are normalized; the favicon
    /// falls back to the first candidate of the favicon chain.
    pub fn from_request(user_id: Uuid, req: CreateBookmarkRequest) -> Result<Self> {
        let url = parse_bookmark_url(&req.url)?.to_string();
        let hash = content_hash(&url)?;
        let tags = normalize_tags(&req.tags).map_err(Error::InvalidInput)?;
        let title = match req.title.trim() {
            "" => url.clone(),
            t => t.to_string(),
        };
        let favicon_url = primary_favicon(&url, req.favicon_url.as_deref());
        let category = req
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            title,
            url,
            description: req.description.filter(|d| !d.trim().is_empty()),
            category,
            tags,
            favicon_url,
            content_hash: hash,
            health_status: HealthStatus::Unknown,
            last_checked_at: None,
            visit_count: 0,
            last_visited_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update in place. A changed URL recomputes the hash
    /// and resets the health status.
    pub fn apply_update(&mut self, req: UpdateBookmarkRequest) -> Result<()> {
        if let Some(url) = req.url {
            let url = parse_bookmark_url(&url)?.to_string();
            if url != self.url {
                self.content_hash = content_hash(&url)?;
                self.health_status = HealthStatus::Unknown;
                self.last_checked_at = None;
                self.url = url;
            }
        }
        if let Some(title) = req.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::InvalidInput("Title cannot be empty".to_string()));
            }
            self.title = title.to_string();
        }
        if let Some(description) = req.description {
            self.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(category) = req.category {
            let category = category.trim();
            self.category = (!category.is_empty()).then(|| category.to_string());
        }
        if let Some(tags) = req.tags {
            self.tags = normalize_tags(&tags).map_err(Error::InvalidInput)?;
        }
        if let Some(favicon_url) = req.favicon_url {
            self.favicon_url = Some(favicon_url).filter(|f| !f.trim().is_empty());
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Request for creating a bookmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkRequest {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
}

/// Partial update of a bookmark. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookmarkRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub favicon_url: Option<String>,
}

impl UpdateBookmarkRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.favicon_url.is_none()
    }
}

/// Filters for listing bookmarks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBookmarksRequest {
    /// Category label, compared case-insensitively like category names.
    pub category: Option<String>,
    /// Bookmarks carrying this tag.
    pub tag: Option<String>,
    /// Case-insensitive substring match on title, url, and description.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListBookmarksRequest {
    /// Effective page size, clamped to `[1, PAGE_LIMIT_MAX]`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(defaults::PAGE_LIMIT)
            .clamp(1, defaults::PAGE_LIMIT_MAX)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(defaults::PAGE_OFFSET).max(0)
    }

    /// In-memory form of the filter, shared by the file store and tests.
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        if let Some(category) = &self.category {
            let wanted = category.to_lowercase();
            let actual = bookmark.category.as_deref().map(str::to_lowercase);
            if actual.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !bookmark.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            let hit = bookmark.title.to_lowercase().contains(&needle)
                || bookmark.url.to_lowercase().contains(&needle)
                || bookmark
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&needle))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Page of bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBookmarksResponse {
    pub bookmarks: Vec<Bookmark>,
    pub total: i64,
}

// =============================================================================
// CATEGORY & TAG TYPES
// =============================================================================

/// A user-defined bookmark category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Number of bookmarks labelled with this category (computed)
    #[serde(default)]
    pub bookmark_count: i64,
}

impl Category {
    /// Placeholder categories served when the store is unreachable.
    pub fn fallback_list(user_id: Uuid) -> Vec<Category> {
        let created_at = DateTime::<Utc>::default();
        defaults::FALLBACK_CATEGORIES
            .iter()
            .map(|name| Category {
                id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
                user_id,
                name: (*name).to_string(),
                description: None,
                color: None,
                created_at,
                bookmark_count: 0,
            })
            .collect()
    }
}

/// Request for creating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A tag derived from bookmark tag lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    /// Number of bookmarks with this tag (computed)
    #[serde(default)]
    pub bookmark_count: i64,
}

impl Tag {
    /// Placeholder tags served when the store is unreachable.
    pub fn fallback_list() -> Vec<Tag> {
        defaults::FALLBACK_TAGS
            .iter()
            .map(|name| Tag {
                name: (*name).to_string(),
                bookmark_count: 0,
            })
            .collect()
    }
}

/// Validate and normalize a category name.
///
/// Trims surrounding whitespace; rejects empty names and names over 100
/// characters.
pub fn normalize_category_name(name: &str) -> std::result::Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Category name cannot be empty".to_string());
    }
    if trimmed.chars().count() > 100 {
        return Err("Category name must be 100 characters or less".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize a tag list: trimmed, lowercased, deduplicated,
/// order preserved.
pub fn normalize_tags(tags: &[String]) -> std::result::Result<Vec<String>, String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for raw in tags {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.len() > 50 {
            return Err(format!("Tag '{}' must be 50 characters or less", tag));
        }
        if tag.chars().any(char::is_whitespace) {
            return Err(format!("Tag '{}' cannot contain whitespace", tag));
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}
