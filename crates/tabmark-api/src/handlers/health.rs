use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;

/// `GET /health`: liveness plus a storage round trip.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(
                subsystem = "api",
                component = "health",
                storage = state.store.backend_name(),
                error = %e,
                "Storage health check failed"
            );
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "storage": state.store.backend_name(),
        })),
    )
}
