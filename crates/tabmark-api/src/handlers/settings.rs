//! Settings reads and writes with static defaults.
//!
//! Reads never fail because of the store: an unset key or a failed fetch
//! falls back to the domain's default document. Writes surface every error.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tabmark_core::{defaults, SettingsDomain};

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::resolve_user;
use crate::{ApiError, AppState};

/// Optional explicit user for settings calls.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    pub user_id: Option<Uuid>,
}

/// Body of `POST /settings/:domain/:key`.
#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub value: JsonValue,
}

#[derive(Debug, Serialize)]
pub struct SettingValue {
    pub value: JsonValue,
}

#[derive(Debug, Serialize)]
pub struct SetSettingResponse {
    pub success: bool,
}

fn parse_domain(raw: &str) -> Result<SettingsDomain, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

/// An explicit `user_id` is honoured only when it names the caller. Requests
/// without any identity may still address a user explicitly.
fn settings_user(
    explicit: Option<Uuid>,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Uuid, ApiError> {
    let has_identity = state.auth.bypass || headers.contains_key(defaults::USER_ID_HEADER);
    match explicit {
        Some(user_id) if has_identity => {
            let caller = resolve_user(headers, &state.auth)?;
            if caller != user_id {
                return Err(ApiError::Forbidden(
                    "user_id does not match the authenticated user".to_string(),
                ));
            }
            Ok(user_id)
        }
        Some(user_id) => Ok(user_id),
        None => resolve_user(headers, &state.auth),
    }
}

/// `GET /settings/:domain/:key?user_id=`
pub async fn get_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((domain, key)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<SettingsQuery>,
) -> Result<Json<SettingValue>, ApiError> {
    let domain = parse_domain(&domain)?;
    let user_id = settings_user(query.user_id, &headers, &state)?;

    let stored = match state.store.settings.get(user_id, domain, &key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                subsystem = "api",
                component = "settings",
                op = "get",
                domain = domain.as_str(),
                key = %key,
                error = %e,
                "Settings fetch failed, using default"
            );
            None
        }
    };

    stored
        .or_else(|| domain.default_value(&key).cloned())
        .map(|value| Json(SettingValue { value }))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown setting '{}' in {}", key, domain)))
}

/// `POST /settings/:domain/:key`: replace one key's value.
pub async fn set_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath((domain, key)): ApiPath<(String, String)>,
    ApiJson(req): ApiJson<SetSettingRequest>,
) -> Result<Json<SetSettingResponse>, ApiError> {
    let domain = parse_domain(&domain)?;
    if !domain.is_known_key(&key) {
        return Err(ApiError::BadRequest(format!(
            "Unknown setting '{}' in {}",
            key, domain
        )));
    }
    let user_id = settings_user(req.user_id, &headers, &state)?;

    state
        .store
        .settings
        .set(user_id, domain, &key, req.value)
        .await?;

    tracing::info!(
        subsystem = "api",
        component = "settings",
        op = "set",
        domain = domain.as_str(),
        key = %key,
        "Setting saved"
    );
    Ok(Json(SetSettingResponse { success: true }))
}

/// `GET /settings/:domain?user_id=`: defaults overlaid with stored values.
pub async fn get_settings_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(domain): ApiPath<String>,
    ApiQuery(query): ApiQuery<SettingsQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let domain = parse_domain(&domain)?;
    let user_id = settings_user(query.user_id, &headers, &state)?;

    let stored = state
        .store
        .settings
        .get_all(user_id, domain)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(
                subsystem = "api",
                component = "settings",
                op = "get_all",
                domain = domain.as_str(),
                error = %e,
                "Settings fetch failed, using defaults"
            );
            Default::default()
        });

    Ok(Json(domain.merged(&stored)))
}
