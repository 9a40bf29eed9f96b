//! Deliverable repository.
//!
//! Deliverables have no user column; ownership is checked through the parent
//! goal on every statement.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use forge_core::{
    Deliverable, DeliverableRepository, Error, GoalEvent, Result, SlotAssignment,
    UpdateDeliverableRequest,
};

pub(crate) const DELIVERABLE_COLUMNS: &str = "id, goal_id, title, completed, minutes_estimate, \
     sort_order, start_at, end_at, created_at, updated_at";

pub(crate) fn parse_deliverable_row(r: &PgRow) -> Deliverable {
    Deliverable {
        id: r.get("id"),
        goal_id: r.get("goal_id"),
        title: r.get("title"),
        completed: r.get("completed"),
        minutes_estimate: r.get("minutes_estimate"),
        order: r.get("sort_order"),
        start: r.get("start_at"),
        end: r.get("end_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

/// PostgreSQL deliverable repository.
#[derive(Clone)]
pub struct PgDeliverableRepository {
    pool: Pool<Postgres>,
}

impl PgDeliverableRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliverableRepository for PgDeliverableRepository {
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Deliverable>> {
        let row = sqlx::query(
            "SELECT d.id, d.goal_id, d.title, d.completed, d.minutes_estimate, d.sort_order,
                    d.start_at, d.end_at, d.created_at, d.updated_at
             FROM deliverable d
             JOIN goal g ON g.id = d.goal_id
             WHERE d.id = $1 AND g.user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(parse_deliverable_row))
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        req: UpdateDeliverableRequest,
    ) -> Result<Option<Deliverable>> {
        // Each nullable column gets a "sent" flag so an explicit null clears it.
        let (estimate_sent, estimate) = split_patch(req.minutes_estimate);
        let (start_sent, start) = split_patch(req.start);
        let (end_sent, end) = split_patch(req.end);

        let row = sqlx::query(&format!(
            "UPDATE deliverable d SET
                title = COALESCE($1, d.title),
                completed = COALESCE($2, d.completed),
                minutes_estimate = CASE WHEN $3 THEN $4 ELSE d.minutes_estimate END,
                start_at = CASE WHEN $5 THEN $6 ELSE d.start_at END,
                end_at = CASE WHEN $7 THEN $8 ELSE d.end_at END,
                updated_at = $9
             FROM goal g
             WHERE d.id = $10 AND g.id = d.goal_id AND g.user_id = $11
             RETURNING {}",
            qualified_columns("d")
        ))
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.completed)
        .bind(estimate_sent)
        .bind(estimate)
        .bind(start_sent)
        .bind(start)
        .bind(end_sent)
        .bind(end)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(parse_deliverable_row))
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM deliverable d USING goal g
             WHERE d.id = $1 AND g.id = d.goal_id AND g.user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_goal_events(&self, user_id: &str) -> Result<Vec<GoalEvent>> {
        let rows = sqlx::query(
            "SELECT d.id, d.goal_id, g.title AS goal_title, d.title, d.completed,
                    d.minutes_estimate, d.start_at, d.end_at
             FROM deliverable d
             JOIN goal g ON g.id = d.goal_id
             WHERE g.user_id = $1 AND d.start_at IS NOT NULL AND d.end_at IS NOT NULL
             ORDER BY d.start_at ASC, d.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| GoalEvent {
                id: r.get("id"),
                goal_id: r.get("goal_id"),
                goal_title: r.get("goal_title"),
                title: r.get("title"),
                completed: r.get("completed"),
                minutes_estimate: r.get("minutes_estimate"),
                start: r.get("start_at"),
                end: r.get("end_at"),
            })
            .collect())
    }

    async fn assign_slots(
        &self,
        user_id: &str,
        goal_id: Uuid,
        slots: &[SlotAssignment],
    ) -> Result<usize> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut written = 0usize;

        for slot in slots {
            let result = sqlx::query(
                "UPDATE deliverable d SET start_at = $1, end_at = $2, updated_at = $3
                 FROM goal g
                 WHERE d.id = $4 AND d.goal_id = $5 AND g.id = d.goal_id AND g.user_id = $6",
            )
            .bind(slot.start)
            .bind(slot.end)
            .bind(now)
            .bind(slot.deliverable_id)
            .bind(goal_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            written += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "deliverables",
            op = "assign_slots",
            goal_id = %goal_id,
            result_count = written,
            "Assigned placeholder slots"
        );
        Ok(written)
    }
}

/// Split a PATCH field into (was it sent, value to write).
fn split_patch<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}

fn qualified_columns(alias: &str) -> String {
    DELIVERABLE_COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
