//! Request middleware: user resolution and global rate limiting.

pub mod auth;
pub mod rate_limit;

pub use auth::{resolve_user, AuthConfig, CurrentUser};
pub use rate_limit::{rate_limit_middleware, GlobalRateLimiter, RateLimitConfig};
