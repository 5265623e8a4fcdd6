//! Category management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use tabmark_core::{Category, CreateCategoryRequest, Error, UpdateCategoryRequest};

use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, AppState, CurrentUser};

/// `GET /categories`: categories with bookmark counts. Falls back to the
/// static default list when the store cannot be read.
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Vec<Category>> {
    match state.store.categories.list(user_id).await {
        Ok(categories) => Json(categories),
        Err(e) => {
            tracing::warn!(
                subsystem = "api",
                component = "categories",
                op = "list",
                error = %e,
                "Category store unavailable, serving fallback list"
            );
            Json(Category::fallback_list(user_id))
        }
    }
}

/// `POST /categories`
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.store.categories.create(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /categories/:id`
pub async fn get_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .store
        .categories
        .get(user_id, id)
        .await?
        .ok_or(Error::CategoryNotFound(id))?;
    Ok(Json(category))
}

/// `PATCH /categories/:id`
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state.store.categories.update(user_id, id, req).await?;
    Ok(Json(category))
}

/// `DELETE /categories/:id`
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.categories.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
