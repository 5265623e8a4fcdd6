use axum::extract::State;
use axum::Json;

use tabmark_core::Tag;

use crate::{AppState, CurrentUser};

/// `GET /tags`: tags with bookmark counts. Falls back to the static list
/// when the store cannot be read.
pub async fn list_tags(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Vec<Tag>> {
    match state.store.tags.list(user_id).await {
        Ok(tags) => Json(tags),
        Err(e) => {
            tracing::warn!(
                subsystem = "api",
                component = "tags",
                op = "list",
                error = %e,
                "Tag store unavailable, serving fallback list"
            );
            Json(Tag::fallback_list())
        }
    }
}
