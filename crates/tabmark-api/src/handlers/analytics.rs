use axum::extract::State;
use axum::Json;
use chrono::Utc;

use tabmark_core::{summarize, AnalyticsSummary};

use crate::{ApiError, AppState, CurrentUser};

/// `GET /analytics/summary`
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let bookmarks = state.store.bookmarks.list_all(user_id).await?;
    let categories = state.store.categories.list(user_id).await?;
    Ok(Json(summarize(
        &bookmarks,
        categories.len() as i64,
        Utc::now(),
    )))
}
