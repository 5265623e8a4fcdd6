//! # tabmark-db
//!
//! Storage layer for tabmark.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repository implementations for bookmarks, categories, tags,
//!   and settings
//! - A JSON file store implementing the same traits, used when no database
//!   is configured
//! - [`Store`], the backend-agnostic handle the API works against
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabmark_db::{Database, Store, CreateBookmarkRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tabmark").await?;
//!     let store = Store::postgres(&db);
//!
//!     let bookmark = store.bookmarks.insert(user_id, CreateBookmarkRequest {
//!         title: "Rust".to_string(),
//!         url: "https://www.rust-lang.org".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created bookmark: {}", bookmark.id);
//!     Ok(())
//! }
//! ```
pub mod bookmarks;
pub mod categories;
pub mod file_store;
pub mod pool;
pub mod settings;
pub mod tags;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::path::Path;
use std::sync::Arc;

// Re-export core types
pub use tabmark_core::*;

pub use bookmarks::PgBookmarkRepository;
pub use categories::PgCategoryRepository;
pub use file_store::FileStore;
pub use pool::{connect_pool, log_pool_metrics, PoolConfig};
pub use settings::PgSettingsRepository;
pub use tags::PgTagRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Map a unique-constraint violation to `Error::Conflict`, anything else to
/// `Error::Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: String) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(message),
        _ => Error::Database(e),
    }
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Bookmark repository for CRUD operations.
    pub bookmarks: PgBookmarkRepository,
    /// Category repository.
    pub categories: PgCategoryRepository,
    /// Tags derived from bookmarks.
    pub tags: PgTagRepository,
    /// Per-user settings.
    pub settings: PgSettingsRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            bookmarks: PgBookmarkRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            settings: PgSettingsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = connect_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

/// Which backend a [`Store`] talks to.
#[derive(Clone)]
pub enum StoreBackend {
    Postgres(sqlx::Pool<sqlx::Postgres>),
    File(FileStore),
}

/// Backend-agnostic repository handle.
#[derive(Clone)]
pub struct Store {
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    backend: StoreBackend,
}

impl Store {
    /// Store backed by PostgreSQL.
    pub fn postgres(db: &Database) -> Self {
        Self {
            bookmarks: Arc::new(db.bookmarks.clone()),
            categories: Arc::new(db.categories.clone()),
            tags: Arc::new(db.tags.clone()),
            settings: Arc::new(db.settings.clone()),
            backend: StoreBackend::Postgres(db.pool.clone()),
        }
    }

    /// Store backed by JSON documents.
    pub fn file(store: FileStore) -> Self {
        Self {
            bookmarks: Arc::new(store.clone()),
            categories: Arc::new(store.clone()),
            tags: Arc::new(store.clone()),
            settings: Arc::new(store.clone()),
            backend: StoreBackend::File(store),
        }
    }

    /// Open a file store at `dir`.
    pub async fn open_file(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::file(FileStore::open(dir).await?))
    }

    /// Short backend name for logs and health output.
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            StoreBackend::Postgres(_) => "postgres",
            StoreBackend::File(_) => "file",
        }
    }

    /// Probe the backend. PostgreSQL runs `SELECT 1`; the file store checks
    /// that its directory is still there.
    pub async fn ping(&self) -> Result<()> {
        match &self.backend {
            StoreBackend::Postgres(pool) => {
                log_pool_metrics(pool);
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(Error::Database)?;
                Ok(())
            }
            StoreBackend::File(store) => {
                tokio::fs::metadata(store.dir()).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\dir"), "c:\\\\dir");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_file_store_backend_name_and_ping() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_file(dir.path()).await.unwrap();
        assert_eq!(store.backend_name(), "file");
        store.ping().await.unwrap();
    }
}
