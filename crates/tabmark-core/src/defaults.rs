//! Centralized default constants for tabmark.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum request body size in bytes (10 MB).
pub const MAX_BODY_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Directory used by the file store when no database is configured.
pub const DATA_DIR: &str = "./data";

// =============================================================================
// AUTH
// =============================================================================

/// Header carrying the authenticated user id (set by the upstream proxy).
pub const USER_ID_HEADER: &str = "x-user-id";

/// Fixed user id used when auth bypass is enabled.
pub const DEV_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for bookmark listings.
pub const PAGE_LIMIT: i64 = 50;

/// Hard upper bound for a single page.
pub const PAGE_LIMIT_MAX: i64 = 500;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// TAB CAPTURE
// =============================================================================

/// Default maximum number of tabs accepted in one capture batch.
pub const CAPTURE_MAX_TABS: usize = 40;

/// Number of tabs processed concurrently within one job.
pub const CAPTURE_TAB_CONCURRENCY: usize = 1;

/// Job-level processing timeout in seconds.
pub const CAPTURE_JOB_TIMEOUT_SECS: u64 = 300;

/// How long terminal jobs stay queryable before eviction.
pub const CAPTURE_JOB_TTL_SECS: u64 = 3600;

/// How often the job sweeper runs.
pub const CAPTURE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Status stream polling interval in milliseconds.
pub const CAPTURE_STREAM_INTERVAL_MS: u64 = 1000;

/// Simulated per-tab latency bounds in milliseconds (demo mode).
pub const SIMULATED_DELAY_MIN_MS: u64 = 1000;
pub const SIMULATED_DELAY_MAX_MS: u64 = 3000;

/// Simulated outcome probabilities (demo mode).
pub const SIMULATED_DUPLICATE_RATE: f64 = 0.10;
pub const SIMULATED_FAILURE_RATE: f64 = 0.05;

// =============================================================================
// LINK HEALTH
// =============================================================================

/// Timeout for link health checks in seconds.
pub const LINK_CHECK_TIMEOUT_SECS: u64 = 10;

/// User agent sent with link health checks.
pub const LINK_CHECK_USER_AGENT: &str = concat!("tabmark-link-check/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// ANALYTICS
// =============================================================================

/// Number of entries in "top N" analytics lists.
pub const ANALYTICS_TOP_N: usize = 10;

/// Window for the "added per day" series.
pub const ANALYTICS_DAYS: i64 = 30;

// =============================================================================
// STATIC FALLBACK LISTS
// =============================================================================

/// Categories returned when the store is unreachable.
pub const FALLBACK_CATEGORIES: &[&str] = &[
    "Development",
    "Design",
    "Research",
    "News",
    "Entertainment",
    "Uncategorized",
];

/// Tags returned when the store is unreachable.
pub const FALLBACK_TAGS: &[&str] = &[
    "reference",
    "tutorial",
    "tools",
    "read-later",
    "inspiration",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_delay_bounds_ordered() {
        assert!(SIMULATED_DELAY_MIN_MS <= SIMULATED_DELAY_MAX_MS);
    }

    #[test]
    fn test_simulated_rates_are_probabilities() {
        assert!((0.0..=1.0).contains(&SIMULATED_DUPLICATE_RATE));
        assert!((0.0..=1.0).contains(&SIMULATED_FAILURE_RATE));
    }

    #[test]
    fn test_dev_user_id_is_uuid() {
        assert!(uuid::Uuid::parse_str(DEV_USER_ID).is_ok());
    }

    #[test]
    fn test_page_limits() {
        assert!(PAGE_LIMIT <= PAGE_LIMIT_MAX);
    }
}
