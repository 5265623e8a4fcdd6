//! User resolution.
//!
//! An upstream auth proxy sets `X-User-Id` on every request. With
//! `AUTH_BYPASS=true` all requests act as a fixed development user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use tabmark_core::{defaults, Error, Result};

use crate::{ApiError, AppState};

/// How requests are mapped to users.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Resolve every request to `dev_user_id`.
    pub bypass: bool,
    pub dev_user_id: Uuid,
}

impl AuthConfig {
    /// Require the `X-User-Id` header.
    pub fn header_only() -> Self {
        Self {
            bypass: false,
            dev_user_id: Uuid::nil(),
        }
    }

    /// Resolve every request to `user_id`.
    pub fn bypass(user_id: Uuid) -> Self {
        Self {
            bypass: true,
            dev_user_id: user_id,
        }
    }

    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AUTH_BYPASS` | `false` | Skip the header and use the dev user |
    /// | `DEV_USER_ID` | `00000000-0000-0000-0000-000000000001` | User id for bypass mode |
    pub fn from_env() -> Result<Self> {
        let bypass = std::env::var("AUTH_BYPASS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let raw = std::env::var("DEV_USER_ID").unwrap_or_else(|_| defaults::DEV_USER_ID.to_string());
        let dev_user_id = Uuid::parse_str(raw.trim())
            .map_err(|e| Error::Config(format!("Invalid DEV_USER_ID '{}': {}", raw, e)))?;
        Ok(Self {
            bypass,
            dev_user_id,
        })
    }
}

/// Resolve the acting user from request headers.
pub fn resolve_user(headers: &HeaderMap, auth: &AuthConfig) -> std::result::Result<Uuid, ApiError> {
    if auth.bypass {
        return Ok(auth.dev_user_id);
    }
    let value = headers
        .get(defaults::USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized("Invalid X-User-Id header".to_string()))
}

/// The resolved user of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        resolve_user(&parts.headers, &state.auth).map(CurrentUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bypass_ignores_header() {
        let dev = Uuid::parse_str(defaults::DEV_USER_ID).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            defaults::USER_ID_HEADER,
            HeaderValue::from_str(&Uuid::now_v7().to_string()).unwrap(),
        );
        assert_eq!(resolve_user(&headers, &AuthConfig::bypass(dev)).unwrap(), dev);
    }

    #[test]
    fn test_header_resolution() {
        let auth = AuthConfig::header_only();
        let user = Uuid::now_v7();
        let mut headers = HeaderMap::new();
        assert!(matches!(
            resolve_user(&headers, &auth),
            Err(ApiError::Unauthorized(_))
        ));

        headers.insert(defaults::USER_ID_HEADER, HeaderValue::from_static("nope"));
        assert!(matches!(
            resolve_user(&headers, &auth),
            Err(ApiError::Unauthorized(_))
        ));

        headers.insert(
            defaults::USER_ID_HEADER,
            HeaderValue::from_str(&user.to_string()).unwrap(),
        );
        assert_eq!(resolve_user(&headers, &auth).unwrap(), user);
    }
}
