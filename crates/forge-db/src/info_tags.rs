//! Info tag repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use forge_core::{
    new_v7, CreateInfoTagRequest, Error, InfoTag, InfoTagRepository, Result, UpdateInfoTagRequest,
};

pub(crate) const INFO_TAG_COLUMNS: &str =
    "id, user_id, goal_id, title, info, created_at, updated_at";

pub(crate) fn parse_info_tag_row(r: &PgRow) -> InfoTag {
    InfoTag {
        id: r.get("id"),
        user_id: r.get("user_id"),
        goal_id: r.get("goal_id"),
        title: r.get("title"),
        info: r.get("info"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

/// PostgreSQL info tag repository.
#[derive(Clone)]
pub struct PgInfoTagRepository {
    pool: Pool<Postgres>,
}

impl PgInfoTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InfoTagRepository for PgInfoTagRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InfoTag>> {
        let rows = sqlx::query(&format!(
            "SELECT {INFO_TAG_COLUMNS} FROM info_tag
             WHERE user_id = $1 AND goal_id IS NULL
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(parse_info_tag_row).collect())
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<InfoTag>> {
        let row = sqlx::query(&format!(
            "SELECT {INFO_TAG_COLUMNS} FROM info_tag WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(parse_info_tag_row))
    }

    async fn create(&self, user_id: &str, req: CreateInfoTagRequest) -> Result<Option<InfoTag>> {
        let now = Utc::now();

        // The SELECT yields no row when goal_id names someone else's goal.
        let row = sqlx::query(&format!(
            "INSERT INTO info_tag (id, user_id, goal_id, title, info, created_at, updated_at)
             SELECT $1, $2, $3, $4, $5, $6, $6
             WHERE $3::uuid IS NULL
                OR EXISTS (SELECT 1 FROM goal WHERE id = $3 AND user_id = $2)
             RETURNING {INFO_TAG_COLUMNS}"
        ))
        .bind(new_v7())
        .bind(user_id)
        .bind(req.goal_id)
        .bind(req.title.trim())
        .bind(&req.info)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(parse_info_tag_row))
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateInfoTagRequest,
    ) -> Result<Option<InfoTag>> {
        let row = sqlx::query(&format!(
            "UPDATE info_tag SET
                title = COALESCE($1, title),
                info = COALESCE($2, info),
                updated_at = $3
             WHERE id = $4 AND user_id = $5
             RETURNING {INFO_TAG_COLUMNS}"
        ))
        .bind(req.title.as_deref().map(str::trim))
        .bind(&req.info)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(parse_info_tag_row))
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM info_tag WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
