//! Integration tests for the JSON file store.
//!
//! These exercise the same repository contract the PostgreSQL backend
//! implements, through the `Store` handle the API uses.

use serde_json::json;
use tabmark_db::test_fixtures::{bookmark_request, test_user};
use tabmark_db::{
    CreateBookmarkRequest, CreateCategoryRequest, Error, HealthStatus, ListBookmarksRequest,
    SettingsDomain, Store, UpdateBookmarkRequest, UpdateCategoryRequest,
};

async fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open_file(dir.path()).await.expect("open store");
    (dir, store)
}

fn category(name: &str) -> CreateCategoryRequest {
    CreateCategoryRequest {
        name: name.to_string(),
        description: None,
        color: None,
    }
}

#[tokio::test]
async fn test_bookmark_crud_roundtrip() {
    let (_dir, store) = open_store().await;
    let user = test_user();

    let created = store
        .bookmarks
        .insert(
            user,
            CreateBookmarkRequest {
                title: "  Tokio  ".to_string(),
                url: "https://tokio.rs/".to_string(),
                tags: vec!["Rust".to_string(), "async".to_string(), "rust".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.title, "Tokio");
    assert_eq!(created.tags, vec!["rust", "async"]);
    assert_eq!(created.health_status, HealthStatus::Unknown);
    assert_eq!(
        created.favicon_url.as_deref(),
        Some("https://tokio.rs/favicon.ico")
    );

    let fetched = store.bookmarks.get(user, created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    let updated = store
        .bookmarks
        .update(
            user,
            created.id,
            UpdateBookmarkRequest {
                title: Some("Tokio runtime".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Tokio runtime");
    assert_eq!(updated.url, created.url);

    store.bookmarks.delete(user, created.id).await.unwrap();
    assert!(store.bookmarks.get(user, created.id).await.unwrap().is_none());

    let err = store.bookmarks.delete(user, created.id).await.unwrap_err();
    assert!(matches!(err, Error::BookmarkNotFound(_)));
}

#[tokio::test]
async fn test_bookmarks_are_scoped_to_user() {
    let (_dir, store) = open_store().await;
    let owner = test_user();
    let other = test_user();

    let b = store
        .bookmarks
        .insert(owner, bookmark_request("https://example.com"))
        .await
        .unwrap();

    assert!(store.bookmarks.get(other, b.id).await.unwrap().is_none());
    assert!(store.bookmarks.record_visit(other, b.id).await.is_err());
    assert_eq!(
        store
            .bookmarks
            .list(other, &ListBookmarksRequest::default())
            .await
            .unwrap()
            .total,
        0
    );
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let (_dir, store) = open_store().await;
    let user = test_user();

    for i in 0..5 {
        store
            .bookmarks
            .insert(
                user,
                CreateBookmarkRequest {
                    title: format!("Rust article {}", i),
                    url: format!("https://blog.example.com/rust/{}", i),
                    category: Some("Development".to_string()),
                    tags: vec!["rust".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    store
        .bookmarks
        .insert(
            user,
            CreateBookmarkRequest {
                title: "Sourdough".to_string(),
                url: "https://bread.example.com".to_string(),
                category: Some("Cooking".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let by_category = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                category: Some("Development".to_string()),
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_category.total, 5);
    assert_eq!(by_category.bookmarks.len(), 2);

    // Same case-insensitive rule as category names and counts.
    let by_lowercase = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                category: Some("development".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_lowercase.total, 5);

    let by_query = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                q: Some("SOURDOUGH".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_query.total, 1);

    let last_page = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                tag: Some("rust".to_string()),
                limit: Some(2),
                offset: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(last_page.total, 5);
    assert_eq!(last_page.bookmarks.len(), 1);
}

#[tokio::test]
async fn test_find_by_hash_matches_equivalent_urls() {
    let (_dir, store) = open_store().await;
    let user = test_user();

    let original = store
        .bookmarks
        .insert(user, bookmark_request("https://example.com/page"))
        .await
        .unwrap();
    let hash = tabmark_db::content_hash("https://EXAMPLE.com/page/?utm_source=feed#top").unwrap();

    let found = store.bookmarks.find_by_hash(user, &hash).await.unwrap();
    assert_eq!(found.map(|b| b.id), Some(original.id));
}

#[tokio::test]
async fn test_visit_and_health_tracking() {
    let (_dir, store) = open_store().await;
    let user = test_user();
    let b = store
        .bookmarks
        .insert(user, bookmark_request("https://example.com"))
        .await
        .unwrap();

    store.bookmarks.record_visit(user, b.id).await.unwrap();
    let visited = store.bookmarks.record_visit(user, b.id).await.unwrap();
    assert_eq!(visited.visit_count, 2);
    assert!(visited.last_visited_at.is_some());

    let checked = store
        .bookmarks
        .set_health(user, b.id, HealthStatus::Broken, chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(checked.health_status, HealthStatus::Broken);

    // Changing the URL invalidates the previous check.
    let moved = store
        .bookmarks
        .update(
            user,
            b.id,
            UpdateBookmarkRequest {
                url: Some("https://example.org".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.health_status, HealthStatus::Unknown);
    assert!(moved.last_checked_at.is_none());
    assert_ne!(moved.content_hash, b.content_hash);
}

#[tokio::test]
async fn test_category_rules() {
    let (_dir, store) = open_store().await;
    let user = test_user();

    let dev = store.categories.create(user, category("Development")).await.unwrap();
    let err = store
        .categories
        .create(user, category("development"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Same name for another user is fine.
    store
        .categories
        .create(test_user(), category("Development"))
        .await
        .unwrap();

    store
        .bookmarks
        .insert(
            user,
            CreateBookmarkRequest {
                url: "https://docs.rs".to_string(),
                category: Some("Development".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = store.categories.list(user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].bookmark_count, 1);

    let err = store.categories.delete(user, dev.id).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let renamed = store
        .categories
        .update(
            user,
            dev.id,
            UpdateCategoryRequest {
                name: Some("Engineering".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Engineering");
    assert_eq!(renamed.bookmark_count, 1);

    let all = store.bookmarks.list_all(user).await.unwrap();
    assert_eq!(all[0].category.as_deref(), Some("Engineering"));
}

#[tokio::test]
async fn test_empty_category_can_be_deleted() {
    let (_dir, store) = open_store().await;
    let user = test_user();
    let c = store.categories.create(user, category("Misc")).await.unwrap();

    store.categories.delete(user, c.id).await.unwrap();
    assert!(store.categories.get(user, c.id).await.unwrap().is_none());

    let err = store.categories.delete(user, c.id).await.unwrap_err();
    assert!(matches!(err, Error::CategoryNotFound(_)));
}

#[tokio::test]
async fn test_tags_are_derived_from_bookmarks() {
    let (_dir, store) = open_store().await;
    let user = test_user();
    for (url, tags) in [
        ("https://a.example", vec!["rust", "web"]),
        ("https://b.example", vec!["rust"]),
    ] {
        store
            .bookmarks
            .insert(
                user,
                CreateBookmarkRequest {
                    url: url.to_string(),
                    tags: tags.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let tags = store.tags.list(user).await.unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "rust");
    assert_eq!(tags[0].bookmark_count, 2);
    assert_eq!(tags[1].name, "web");
    assert_eq!(tags[1].bookmark_count, 1);
}

#[tokio::test]
async fn test_settings_roundtrip() {
    let (_dir, store) = open_store().await;
    let user = test_user();

    assert!(store
        .settings
        .get(user, SettingsDomain::Ai, "bulk_uploader")
        .await
        .unwrap()
        .is_none());

    store
        .settings
        .set(user, SettingsDomain::Ai, "bulk_uploader", json!({ "batch_size": 25 }))
        .await
        .unwrap();
    store
        .settings
        .set(user, SettingsDomain::Assistant, "voice", json!({ "enabled": true }))
        .await
        .unwrap();

    let ai = store.settings.get_all(user, SettingsDomain::Ai).await.unwrap();
    assert_eq!(ai.len(), 1);
    assert_eq!(ai["bulk_uploader"]["batch_size"], 25);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let user = test_user();

    {
        let store = Store::open_file(dir.path()).await.unwrap();
        store
            .bookmarks
            .insert(user, bookmark_request("https://example.com"))
            .await
            .unwrap();
        store.categories.create(user, category("Reading")).await.unwrap();
        store
            .settings
            .set(user, SettingsDomain::Ai, "analytics", json!({ "enabled": false }))
            .await
            .unwrap();
    }

    let reopened = Store::open_file(dir.path()).await.unwrap();
    assert_eq!(reopened.bookmarks.list_all(user).await.unwrap().len(), 1);
    assert_eq!(reopened.categories.list(user).await.unwrap()[0].name, "Reading");
    assert_eq!(
        reopened
            .settings
            .get(user, SettingsDomain::Ai, "analytics")
            .await
            .unwrap(),
        Some(json!({ "enabled": false }))
    );
}

#[tokio::test]
async fn test_corrupt_document_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("categories.json"), b"{not json").unwrap();

    let err = Store::open_file(dir.path()).await.err().expect("should fail");
    assert!(matches!(err, Error::Serialization(_)));
}
