//! PostgreSQL repository tests.
//!
//! These need a migrated database at `DATABASE_URL` (or the default test URL)
//! and are ignored by default:
//!
//! ```text
//! cargo test -p tabmark-db --test pg_repository_test -- --ignored
//! ```

use serde_json::json;
use tabmark_db::test_fixtures::{bookmark_request, cleanup_user, connect_test_database, test_user};
use tabmark_db::{
    CreateBookmarkRequest, CreateCategoryRequest, Error, ListBookmarksRequest, SettingsDomain,
    Store, UpdateCategoryRequest,
};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_pg_bookmark_list_and_visit() {
    let db = connect_test_database().await.expect("connect");
    let store = Store::postgres(&db);
    let user = test_user();

    let b = store
        .bookmarks
        .insert(
            user,
            CreateBookmarkRequest {
                title: "50% off_sale".to_string(),
                url: "https://shop.example.com".to_string(),
                tags: vec!["deals".to_string()],
                ..Default::default()
            },
        )
        .await
        .expect("insert");
    store
        .bookmarks
        .insert(user, bookmark_request("https://other.example.com"))
        .await
        .expect("insert");

    // Wildcards in the query are matched literally.
    let hits = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                q: Some("50%".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("list");
    assert_eq!(hits.total, 1);
    assert_eq!(hits.bookmarks[0].id, b.id);

    let tagged = store
        .bookmarks
        .list(
            user,
            &ListBookmarksRequest {
                tag: Some("deals".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("list");
    assert_eq!(tagged.total, 1);

    let visited = store.bookmarks.record_visit(user, b.id).await.expect("visit");
    assert_eq!(visited.visit_count, 1);

    cleanup_user(&db, user).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_pg_category_conflicts_and_rename() {
    let db = connect_test_database().await.expect("connect");
    let store = Store::postgres(&db);
    let user = test_user();

    let c = store
        .categories
        .create(
            user,
            CreateCategoryRequest {
                name: "Research".to_string(),
                description: None,
                color: Some("#336699".to_string()),
            },
        )
        .await
        .expect("create");

    let dup = store
        .categories
        .create(
            user,
            CreateCategoryRequest {
                name: "RESEARCH".to_string(),
                description: None,
                color: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(dup, Error::Conflict(_)));

    store
        .bookmarks
        .insert(
            user,
            CreateBookmarkRequest {
                url: "https://arxiv.org".to_string(),
                category: Some("Research".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("insert");

    let in_use = store.categories.delete(user, c.id).await.unwrap_err();
    assert!(matches!(in_use, Error::Conflict(_)));

    let renamed = store
        .categories
        .update(
            user,
            c.id,
            UpdateCategoryRequest {
                name: Some("Papers".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.bookmark_count, 1);
    assert_eq!(renamed.color.as_deref(), Some("#336699"));

    let tags = store.tags.list(user).await.expect("tags");
    assert!(tags.is_empty());

    cleanup_user(&db, user).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_pg_settings_upsert() {
    let db = connect_test_database().await.expect("connect");
    let store = Store::postgres(&db);
    let user = test_user();

    for size in [10, 20] {
        store
            .settings
            .set(user, SettingsDomain::Ai, "bulk_uploader", json!({ "batch_size": size }))
            .await
            .expect("set");
    }
    let stored = store
        .settings
        .get(user, SettingsDomain::Ai, "bulk_uploader")
        .await
        .expect("get");
    assert_eq!(stored, Some(json!({ "batch_size": 20 })));

    cleanup_user(&db, user).await.expect("cleanup");
}
