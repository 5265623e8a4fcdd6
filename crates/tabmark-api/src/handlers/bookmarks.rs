//! Bookmark CRUD, visit tracking, and link health checks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use tabmark_core::{
    Bookmark, CreateBookmarkRequest, Error, ListBookmarksRequest, ListBookmarksResponse,
    UpdateBookmarkRequest,
};
use tabmark_jobs::LinkCheckResult;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{ApiError, AppState, CurrentUser};

/// Result of `POST /bookmarks/:id/check`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub bookmark: Bookmark,
    pub check: LinkCheckResult,
}

/// `GET /bookmarks`
pub async fn list_bookmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<ListBookmarksRequest>,
) -> Result<Json<ListBookmarksResponse>, ApiError> {
    let page = state.store.bookmarks.list(user_id, &query).await?;
    Ok(Json(page))
}

/// `POST /bookmarks`
pub async fn create_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let bookmark = state.store.bookmarks.insert(user_id, req).await?;
    tracing::debug!(
        subsystem = "api",
        component = "bookmarks",
        op = "create",
        bookmark_id = %bookmark.id,
        "Bookmark created"
    );
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// `GET /bookmarks/:id`
pub async fn get_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Bookmark>, ApiError> {
    let bookmark = state
        .store
        .bookmarks
        .get(user_id, id)
        .await?
        .ok_or(Error::BookmarkNotFound(id))?;
    Ok(Json(bookmark))
}

/// `PATCH /bookmarks/:id`
pub async fn update_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateBookmarkRequest>,
) -> Result<Json<Bookmark>, ApiError> {
    let bookmark = state.store.bookmarks.update(user_id, id, req).await?;
    Ok(Json(bookmark))
}

/// `DELETE /bookmarks/:id`
pub async fn delete_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.bookmarks.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /bookmarks/:id/visit`
pub async fn record_visit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Bookmark>, ApiError> {
    let bookmark = state.store.bookmarks.record_visit(user_id, id).await?;
    Ok(Json(bookmark))
}

/// `POST /bookmarks/:id/check`: probe the URL and record the outcome.
pub async fn check_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CheckResponse>, ApiError> {
    let existing = state
        .store
        .bookmarks
        .get(user_id, id)
        .await?
        .ok_or(Error::BookmarkNotFound(id))?;

    let check = state.link_checker.check(&existing.url).await;
    let bookmark = state
        .store
        .bookmarks
        .set_health(user_id, id, check.status, Utc::now())
        .await?;

    tracing::info!(
        subsystem = "api",
        component = "bookmarks",
        op = "check",
        bookmark_id = %id,
        health = check.status.as_str(),
        "Link health recorded"
    );
    Ok(Json(CheckResponse { bookmark, check }))
}
