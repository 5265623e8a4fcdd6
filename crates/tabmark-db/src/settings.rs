//! Per-user settings repository implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabmark_core::{Error, Result, SettingsDomain, SettingsRepository};

/// PostgreSQL implementation of SettingsRepository.
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: Pool<Postgres>,
}

impl PgSettingsRepository {
    /// Create a new PgSettingsRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
        key: &str,
    ) -> Result<Option<JsonValue>> {
        sqlx::query_scalar(
            "SELECT value FROM user_setting WHERE user_id = $1 AND domain = $2 AND key = $3",
        )
        .bind(user_id)
        .bind(domain.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn get_all(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
    ) -> Result<BTreeMap<String, JsonValue>> {
        let rows = sqlx::query(
            "SELECT key, value FROM user_setting WHERE user_id = $1 AND domain = $2",
        )
        .bind(user_id)
        .bind(domain.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }

    async fn set(
        &self,
        user_id: Uuid,
        domain: SettingsDomain,
        key: &str,
        value: JsonValue,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_setting (user_id, domain, key, value, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, domain, key)
             DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
        )
        .bind(user_id)
        .bind(domain.as_str())
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
