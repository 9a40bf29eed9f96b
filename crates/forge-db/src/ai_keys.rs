//! AI agent API key repository.
//!
//! Rows hold the sealed secret; [`AiAgentApiKey`] never carries it. Only
//! [`AiKeyRepository::sealed_key_for_provider`] reads `sealed_key` back.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use forge_core::{
    new_v7, AiAgentApiKey, AiKeyChanges, AiKeyRepository, AiProvider, Error, NewAiKey, Result,
};

const COLUMNS: &str = "id, user_id, provider, name, key_preview, created_at, updated_at";

/// PostgreSQL AI key repository.
#[derive(Clone)]
pub struct PgAiKeyRepository {
    pool: Pool<Postgres>,
}

impl PgAiKeyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &PgRow) -> Result<AiAgentApiKey> {
        let provider: String = r.get("provider");
        Ok(AiAgentApiKey {
            id: r.get("id"),
            user_id: r.get("user_id"),
            provider: provider.parse()?,
            name: r.get("name"),
            key_preview: r.get("key_preview"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        })
    }
}

#[async_trait]
impl AiKeyRepository for PgAiKeyRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AiAgentApiKey>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM ai_agent_api_key WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_row).collect()
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<AiAgentApiKey>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM ai_agent_api_key WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn find_by_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
    ) -> Result<Option<AiAgentApiKey>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM ai_agent_api_key WHERE user_id = $1 AND provider = $2"
        ))
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn create(&self, user_id: &str, key: NewAiKey) -> Result<AiAgentApiKey> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO ai_agent_api_key
                (id, user_id, provider, name, sealed_key, key_preview, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {COLUMNS}"
        ))
        .bind(new_v7())
        .bind(user_id)
        .bind(key.provider.as_str())
        .bind(&key.name)
        .bind(&key.sealed_key)
        .bind(&key.key_preview)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_row(&row)
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        changes: AiKeyChanges,
    ) -> Result<Option<AiAgentApiKey>> {
        let (sealed_key, key_preview) = match changes.sealed_key {
            Some((sealed, preview)) => (Some(sealed), Some(preview)),
            None => (None, None),
        };

        let row = sqlx::query(&format!(
            "UPDATE ai_agent_api_key SET
                provider = COALESCE($1, provider),
                name = COALESCE($2, name),
                sealed_key = COALESCE($3, sealed_key),
                key_preview = COALESCE($4, key_preview),
                updated_at = $5
             WHERE id = $6 AND user_id = $7
             RETURNING {COLUMNS}"
        ))
        .bind(changes.provider.map(|p| p.as_str()))
        .bind(&changes.name)
        .bind(sealed_key)
        .bind(key_preview)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ai_agent_api_key WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn sealed_key_for_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
    ) -> Result<Option<Vec<u8>>> {
        let sealed: Option<Vec<u8>> = sqlx::query_scalar(
            "SELECT sealed_key FROM ai_agent_api_key WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(sealed)
    }
}
