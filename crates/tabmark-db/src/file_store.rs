//! JSON file store used when no database is configured.
//!
//! Each entity set lives in its own document under the data directory
//! (`bookmarks.json`, `categories.json`, `settings.json`). The whole state is
//! held in memory behind a tokio `RwLock`; a mutation is applied to a copy,
//! the touched documents are written to a temp file and renamed into place,
//! and only then does the copy replace the live state. A failed write leaves
//! both the disk and memory untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use tabmark_core::{
    normalize_category_name, Bookmark, BookmarkRepository, Category, CategoryRepository,
    CreateBookmarkRequest, CreateCategoryRequest, Error, HealthStatus, ListBookmarksRequest,
    ListBookmarksResponse, Result, SettingsDomain, SettingsRepository, Tag, TagRepository,
    UpdateBookmarkRequest, UpdateCategoryRequest,
};

const BOOKMARKS_FILE: &str = "bookmarks.json";
const CATEGORIES_FILE: &str = "categories.json";
const SETTINGS_FILE: &str = "settings.json";

/// user id → domain → key → value
type SettingsMap = BTreeMap<Uuid, BTreeMap<String, BTreeMap<String, JsonValue>>>;

#[derive(Debug, Clone, Default)]
struct FileState {
    bookmarks: Vec<Bookmark>,
    categories: Vec<Category>,
    settings: SettingsMap,
}

impl FileState {
    fn category_count(&self, user_id: Uuid, name: &str) -> i64 {
        let name = name.to_lowercase();
        self.bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| b.category.as_deref().map(str::to_lowercase).as_deref() == Some(name.as_str()))
            .count() as i64
    }

    fn with_count(&self, category: &Category) -> Category {
        let mut c = category.clone();
        c.bookmark_count = self.category_count(c.user_id, &c.name);
        c
    }

    fn name_taken(&self, user_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        let name = name.to_lowercase();
        self.categories.iter().any(|c| {
            c.user_id == user_id && Some(c.id) != except && c.name.to_lowercase() == name
        })
    }

    fn bookmark_mut(&mut self, user_id: Uuid, id: Uuid) -> Result<&mut Bookmark> {
        self.bookmarks
            .iter_mut()
            .find(|b| b.id == id && b.user_id == user_id)
            .ok_or(Error::BookmarkNotFound(id))
    }
}

/// Which documents a mutation touched.
#[derive(Debug, Clone, Copy)]
struct Dirty {
    bookmarks: bool,
    categories: bool,
    settings: bool,
}

impl Dirty {
    const BOOKMARKS: Dirty = Dirty {
        bookmarks: true,
        categories: false,
        settings: false,
    };
    const CATEGORIES: Dirty = Dirty {
        bookmarks: false,
        categories: true,
        settings: false,
    };
    const SETTINGS: Dirty = Dirty {
        bookmarks: false,
        categories: false,
        settings: true,
    };
    const BOOKMARKS_AND_CATEGORIES: Dirty = Dirty {
        bookmarks: true,
        categories: true,
        settings: false,
    };
}

struct Inner {
    dir: PathBuf,
    state: RwLock<FileState>,
}

/// File-backed implementation of every repository trait.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`. Missing documents start
    /// empty.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let state = FileState {
            bookmarks: read_json(&dir.join(BOOKMARKS_FILE)).await?,
            categories: read_json(&dir.join(CATEGORIES_FILE)).await?,
            settings: read_json(&dir.join(SETTINGS_FILE)).await?,
        };

        info!(
            subsystem = "storage",
            component = "file_store",
            op = "open",
            dir = %dir.display(),
            bookmarks = state.bookmarks.len(),
            categories = state.categories.len(),
            "File store opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                state: RwLock::new(state),
            }),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    async fn read<T>(&self, f: impl FnOnce(&FileState) -> T) -> T {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Apply `f` to a copy of the state, persist the touched documents, then
    /// publish the copy. Writers are serialized by the write lock.
    async fn mutate<T>(
        &self,
        dirty: Dirty,
        f: impl FnOnce(&mut FileState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.inner.state.write().await;
        let mut next = state.clone();
        let out = f(&mut next)?;

        let dir = &self.inner.dir;
        if dirty.bookmarks {
            write_json(&dir.join(BOOKMARKS_FILE), &next.bookmarks).await?;
        }
        if dirty.categories {
            write_json(&dir.join(CATEGORIES_FILE), &next.categories).await?;
        }
        if dirty.settings {
            write_json(&dir.join(SETTINGS_FILE), &next.settings).await?;
        }

        *state = next;
        Ok(out)
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(T::default()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            Error::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(
        subsystem = "storage",
        component = "file_store",
        op = "write",
        path = %path.display(),
        bytes = bytes.len(),
        "Document written"
    );
    Ok(())
}

// =============================================================================
// BOOKMARKS
// =============================================================================

#[async_trait]
impl BookmarkRepository for FileStore {
    async fn insert(&self, user_id: Uuid, req: CreateBookmarkRequest) -> Result<Bookmark> {
        let bookmark = Bookmark::from_request(user_id, req)?;
        self.mutate(Dirty::BOOKMARKS, |s| {
            s.bookmarks.push(bookmark.clone());
            Ok(bookmark)
        })
        .await
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Bookmark>> {
        Ok(self
            .read(|s| {
                s.bookmarks
                    .iter()
                    .find(|b| b.id == id && b.user_id == user_id)
                    .cloned()
            })
            .await)
    }

    async fn list(
        &self,
        user_id: Uuid,
        req: &ListBookmarksRequest,
    ) -> Result<ListBookmarksResponse> {
        let mut matching: Vec<Bookmark> = self
            .read(|s| {
                s.bookmarks
                    .iter()
                    .filter(|b| b.user_id == user_id && req.matches(b))
                    .cloned()
                    .collect()
            })
            .await;
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as i64;
        let bookmarks = matching
            .into_iter()
            .skip(req.effective_offset() as usize)
            .take(req.effective_limit() as usize)
            .collect();
        Ok(ListBookmarksResponse { bookmarks, total })
    }

    async fn list_all(&self, user_id: Uuid) -> Result<Vec<Bookmark>> {
        let mut all: Vec<Bookmark> = self
            .read(|s| {
                s.bookmarks
                    .iter()
                    .filter(|b| b.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .await;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn find_by_hash(&self, user_id: Uuid, content_hash: &str) -> Result<Option<Bookmark>> {
        Ok(self
            .read(|s| {
                s.bookmarks
                    .iter()
                    .filter(|b| b.user_id == user_id && b.content_hash == content_hash)
                    .min_by_key(|b| b.created_at)
                    .cloned()
            })
            .await)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateBookmarkRequest,
    ) -> Result<Bookmark> {
        self.mutate(Dirty::BOOKMARKS, |s| {
            let b = s.bookmark_mut(user_id, id)?;
            b.apply_update(req)?;
            Ok(b.clone())
        })
        .await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.mutate(Dirty::BOOKMARKS, |s| {
            let before = s.bookmarks.len();
            s.bookmarks.retain(|b| !(b.id == id && b.user_id == user_id));
            if s.bookmarks.len() == before {
                return Err(Error::BookmarkNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn record_visit(&self, user_id: Uuid, id: Uuid) -> Result<Bookmark> {
        self.mutate(Dirty::BOOKMARKS, |s| {
            let b = s.bookmark_mut(user_id, id)?;
            b.visit_count += 1;
            b.last_visited_at = Some(Utc::now());
            Ok(b.clone())
        })
        .await
    }

    async fn set_health(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Bookmark> {
        self.mutate(Dirty::BOOKMARKS, |s| {
            let b = s.bookmark_mut(user_id, id)?;
            b.health_status = status;
            b.last_checked_at = Some(checked_at);
            Ok(b.clone())
        })
        .await
    }
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[async_trait]
impl CategoryRepository for FileStore {
    async fn create(&self, user_id: Uuid, req: CreateCategoryRequest) -> Result<Category> {
        let name = normalize_category_name(&req.name).map_err(Error::InvalidInput)?;
        self.mutate(Dirty::CATEGORIES, |s| {
            if s.name_taken(user_id, &name, None) {
                return Err(Error::Conflict(format!("Category '{}' already exists", name)));
            }
            let category = Category {
                id: Uuid::now_v7(),
                user_id,
                name,
                description: req.description,
                color: req.color,
                created_at: Utc::now(),
                bookmark_count: 0,
            };
            s.categories.push(category.clone());
            Ok(s.with_count(&category))
        })
        .await
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>> {
        Ok(self
            .read(|s| {
                s.categories
                    .iter()
                    .find(|c| c.id == id && c.user_id == user_id)
                    .map(|c| s.with_count(c))
            })
            .await)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .read(|s| {
                s.categories
                    .iter()
                    .filter(|c| c.user_id == user_id)
                    .map(|c| s.with_count(c))
                    .collect()
            })
            .await;
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Category> {
        let new_name = req
            .name
            .as_deref()
            .map(normalize_category_name)
            .transpose()
            .map_err(Error::InvalidInput)?;

        self.mutate(Dirty::BOOKMARKS_AND_CATEGORIES, |s| {
            let idx = s
                .categories
                .iter()
                .position(|c| c.id == id && c.user_id == user_id)
                .ok_or(Error::CategoryNotFound(id))?;
            let old_name = s.categories[idx].name.clone();

            if let Some(name) = new_name {
                if s.name_taken(user_id, &name, Some(id)) {
                    return Err(Error::Conflict(format!("Category '{}' already exists", name)));
                }
                if name != old_name {
                    let old_lower = old_name.to_lowercase();
                    let now = Utc::now();
                    for b in s.bookmarks.iter_mut().filter(|b| b.user_id == user_id) {
                        if b.category.as_deref().map(str::to_lowercase).as_deref()
                            == Some(old_lower.as_str())
                        {
                            b.category = Some(name.clone());
                            b.updated_at = now;
                        }
                    }
                }
                s.categories[idx].name = name;
            }
            if let Some(description) = req.description {
                s.categories[idx].description = Some(description);
            }
            if let Some(color) = req.color {
                s.categories[idx].color = Some(color);
            }

            let updated = s.categories[idx].clone();
            Ok(s.with_count(&updated))
        })
        .await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.mutate(Dirty::CATEGORIES, |s| {
            let idx = s
                .categories
                .iter()
                .position(|c| c.id == id && c.user_id == user_id)
                .ok_or(Error::CategoryNotFound(id))?;
            let name = s.categories[idx].name.clone();
            let in_use = s.category_count(user_id, &name);
            if in_use > 0 {
                return Err(Error::Conflict(format!(
                    "Category '{}' still contains {} bookmark(s)",
                    name, in_use
                )));
            }
            s.categories.remove(idx);
            Ok(())
        })
        .await
    }
}

// =============================================================================
// TAGS
// =============================================================================

#[async_trait]
impl TagRepository for FileStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        let counts: BTreeMap<String, i64> = self
            .read(|s| {
                let mut counts = BTreeMap::new();
                for b in s.bookmarks.iter().filter(|b| b.user_id == user_id) {
                    for tag in &b.tags {
                        *counts.entry(tag.clone()).or_insert(0) += 1;
                    }
                }
                counts
            })
            .await;

        Ok(counts
            .into_iter()
            .map(|(name, bookmark_count)| Tag {
                name,
                bookmark_count,
            })
            .collect())
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

#[async_trait]
impl SettingsRepository for FileStore {
    async fn get(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
        key: &str,
    ) -> Result<Option<JsonValue>> {
        Ok(self
            .read(|s| {
                s.settings
                    .get(&user_id)
                    .and_then(|d| d.get(domain.as_str()))
                    .and_then(|k| k.get(key))
                    .cloned()
            })
            .await)
    }

    async fn get_all(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
    ) -> Result<BTreeMap<String, JsonValue>> {
        Ok(self
            .read(|s| {
                s.settings
                    .get(&user_id)
                    .and_then(|d| d.get(domain.as_str()))
                    .cloned()
                    .unwrap_or_default()
            })
            .await)
    }

    async fn set(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
        key: &str,
        value: JsonValue,
    ) -> Result<()> {
        self.mutate(Dirty::SETTINGS, |s| {
            s.settings
                .entry(user_id)
                .or_default()
                .entry(domain.as_str().to_string())
                .or_default()
                .insert(key.to_string(), value);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(url: &str) -> CreateBookmarkRequest {
        CreateBookmarkRequest {
            title: String::new(),
            url: url.to_string(),
            description: None,
            category: None,
            tags: vec![],
            favicon_url: None,
        }
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let user = Uuid::now_v7();

        let result = store
            .mutate(Dirty::BOOKMARKS, |s| {
                s.bookmarks.clear();
                Err::<(), _>(Error::Internal("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        BookmarkRepository::insert(&store, user, create("https://example.com"))
            .await
            .unwrap();
        let all = store.list_all(user).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_untouched_documents_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        SettingsRepository::set(
            &store,
            Uuid::now_v7(),
            SettingsDomain::Ai,
            "bulk_uploader",
            serde_json::json!({ "batch_size": 5 }),
        )
        .await
        .unwrap();

        assert!(dir.path().join(SETTINGS_FILE).exists());
        assert!(!dir.path().join(BOOKMARKS_FILE).exists());
        assert!(!dir.path().join(CATEGORIES_FILE).exists());
    }

    #[tokio::test]
    async fn test_empty_document_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BOOKMARKS_FILE), b"").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.list_all(Uuid::now_v7()).await.unwrap().is_empty());
    }
}
