//! Global request rate limiting.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use governor::{Quota, RateLimiter};

use tabmark_core::{defaults, Error, Result};

use crate::AppState;

/// Global rate limiter type (direct quota, no per-client buckets).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Rate limit settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u64,
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: defaults::RATE_LIMIT_REQUESTS,
            period: Duration::from_secs(defaults::RATE_LIMIT_PERIOD_SECS),
        }
    }
}

impl RateLimitConfig {
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `RATE_LIMIT_ENABLED` | `true` | Enable the global limiter |
    /// | `RATE_LIMIT_REQUESTS` | `100` | Requests per period |
    /// | `RATE_LIMIT_PERIOD_SECS` | `60` | Period length |
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(base.enabled),
            requests: std::env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.requests),
            period: std::env::var("RATE_LIMIT_PERIOD_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(base.period),
        }
    }

    /// Build the limiter, or `None` when disabled.
    pub fn build(&self) -> Result<Option<Arc<GlobalRateLimiter>>> {
        if !self.enabled {
            return Ok(None);
        }
        let burst = u32::try_from(self.requests)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                Error::Config(format!(
                    "RATE_LIMIT_REQUESTS must be between 1 and {}",
                    u32::MAX
                ))
            })?;
        let quota = Quota::with_period(self.period)
            .ok_or_else(|| Error::Config("RATE_LIMIT_PERIOD_SECS must be non-zero".to_string()))?
            .allow_burst(burst);
        Ok(Some(Arc::new(RateLimiter::direct(quota))))
    }
}

/// Rejects requests with 429 once the global quota is exhausted.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!(subsystem = "api", component = "rate_limit", "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Please wait before retrying."
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_builds_nothing() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(config.build().unwrap().is_none());
    }

    #[test]
    fn test_burst_is_enforced() {
        let config = RateLimitConfig {
            enabled: true,
            requests: 2,
            period: Duration::from_secs(60),
        };
        let limiter = config.build().unwrap().unwrap();
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let zero_requests = RateLimitConfig {
            enabled: true,
            requests: 0,
            period: Duration::from_secs(60),
        };
        assert!(zero_requests.build().is_err());

        let zero_period = RateLimitConfig {
            enabled: true,
            requests: 10,
            period: Duration::ZERO,
        };
        assert!(zero_period.build().is_err());
    }
}
