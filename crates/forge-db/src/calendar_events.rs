//! Calendar event repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use forge_core::{
    new_v7, CalendarEvent, CalendarEventRepository, CreateCalendarEventRequest, Error, Result,
    UpdateCalendarEventRequest,
};

const COLUMNS: &str =
    "id, user_id, title, start_at, end_at, kind, metadata, created_at, updated_at";

/// PostgreSQL calendar event repository.
#[derive(Clone)]
pub struct PgCalendarEventRepository {
    pool: Pool<Postgres>,
}

impl PgCalendarEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &PgRow) -> CalendarEvent {
        CalendarEvent {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            start: r.get("start_at"),
            end: r.get("end_at"),
            kind: r.get("kind"),
            metadata: r.get("metadata"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[async_trait]
impl CalendarEventRepository for PgCalendarEventRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CalendarEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM calendar_event WHERE user_id = $1
             ORDER BY start_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_row).collect())
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<CalendarEvent>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM calendar_event WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn create(
        &self,
        user_id: &str,
        req: CreateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO calendar_event
                (id, user_id, title, start_at, end_at, kind, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING {COLUMNS}"
        ))
        .bind(new_v7())
        .bind(user_id)
        .bind(req.title.trim())
        .bind(req.start)
        .bind(req.end)
        .bind(&req.kind)
        .bind(&req.metadata)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(&row))
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateCalendarEventRequest,
    ) -> Result<Option<CalendarEvent>> {
        // $6 says whether metadata was sent at all; $7 is the new value or NULL.
        let (metadata_sent, metadata) = match req.metadata {
            Some(value) => (true, value),
            None => (false, None),
        };

        let row = sqlx::query(&format!(
            "UPDATE calendar_event SET
                title = COALESCE($1, title),
                start_at = COALESCE($2, start_at),
                end_at = COALESCE($3, end_at),
                kind = COALESCE($4, kind),
                updated_at = $5,
                metadata = CASE WHEN $6 THEN $7 ELSE metadata END
             WHERE id = $8 AND user_id = $9
             RETURNING {COLUMNS}"
        ))
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.start)
        .bind(req.end)
        .bind(&req.kind)
        .bind(Utc::now())
        .bind(metadata_sent)
        .bind(metadata)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM calendar_event WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
