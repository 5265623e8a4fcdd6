//! # tabmark-api
//!
//! HTTP surface of tabmark: tab capture with live status streams, bookmark
//! CRUD, categories, tags, settings with static defaults, and analytics.
//!
//! The binary in `main.rs` reads configuration from the environment and
//! serves [`build_router`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use tabmark_core::defaults;
use tabmark_db::Store;
use tabmark_jobs::{CaptureSubmitter, LinkChecker};

pub use error::ApiError;
pub use middleware::{AuthConfig, CurrentUser, GlobalRateLimiter, RateLimitConfig};

/// Origins allowed when `ALLOWED_ORIGINS` is unset or blank.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub capture: CaptureSubmitter,
    pub link_checker: LinkChecker,
    pub auth: AuthConfig,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
    pub allowed_origins: Vec<HeaderValue>,
}

impl AppState {
    /// State requiring `X-User-Id`, without rate limiting, allowing the
    /// default origins.
    pub fn new(store: Store, capture: CaptureSubmitter, link_checker: LinkChecker) -> Self {
        Self {
            store,
            capture,
            link_checker,
            auth: AuthConfig::header_only(),
            rate_limiter: None,
            allowed_origins: parse_allowed_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Option<Arc<GlobalRateLimiter>>) -> Self {
        self.rate_limiter = limiter;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<HeaderValue>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Parse a comma-separated origin list. Invalid entries are skipped with a
/// warning; a blank list yields the defaults.
///
/// ```text
/// ALLOWED_ORIGINS=https://bookmarks.example.com,http://localhost:3000
/// ```
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let source = if raw.trim().is_empty() {
        DEFAULT_ALLOWED_ORIGINS
    } else {
        raw
    };

    source
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router with middleware.
pub fn build_router(state: AppState) -> Router {
    use handlers::{analytics, bookmarks, capture, categories, health, settings, tags};

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.allowed_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(defaults::USER_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS));

    Router::new()
        .route("/health", get(health::health_check))
        // Tab capture
        .route("/tab-capture", post(capture::submit_capture))
        .route("/tab-capture/:job_id", get(capture::stream_capture_status))
        // Bookmarks
        .route(
            "/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route(
            "/bookmarks/:id",
            get(bookmarks::get_bookmark)
                .patch(bookmarks::update_bookmark)
                .delete(bookmarks::delete_bookmark),
        )
        .route("/bookmarks/:id/visit", post(bookmarks::record_visit))
        .route("/bookmarks/:id/check", post(bookmarks::check_bookmark))
        // Categories & tags
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/tags", get(tags::list_tags))
        // Settings
        .route("/settings/:domain", get(settings::get_settings_document))
        .route(
            "/settings/:domain/:key",
            get(settings::get_setting).post(settings::set_setting),
        )
        // Analytics
        .route("/analytics/summary", get(analytics::summary))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins() {
        let origins = parse_allowed_origins(" https://a.example , ,http://localhost:3000 ");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://a.example");
        assert_eq!(origins[1], "http://localhost:3000");
    }

    #[test]
    fn test_blank_origins_use_defaults() {
        let origins = parse_allowed_origins("   ");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
    }

    #[test]
    fn test_invalid_origin_skipped() {
        let origins = parse_allowed_origins("https://ok.example,bad\norigin");
        assert_eq!(origins, vec![HeaderValue::from_static("https://ok.example")]);
    }
}
