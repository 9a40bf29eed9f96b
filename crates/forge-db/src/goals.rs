//! Goal repository.
//!
//! A goal owns its deliverables and its goal-level info tags. Creation and
//! replacement write the goal and all children in one transaction, and every
//! read returns the goal with children attached.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use forge_core::{new_v7, Error, Goal, GoalInput, GoalRepository, Result};

use crate::deliverables::{parse_deliverable_row, DELIVERABLE_COLUMNS};
use crate::info_tags::{parse_info_tag_row, INFO_TAG_COLUMNS};

const GOAL_COLUMNS: &str = "id, user_id, title, description, due_date, created_at, updated_at";

/// PostgreSQL goal repository.
#[derive(Clone)]
pub struct PgGoalRepository {
    pool: Pool<Postgres>,
}

impl PgGoalRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(r: &PgRow) -> Goal {
        Goal {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            description: r.get("description"),
            due_date: r.get("due_date"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
            deliverables: Vec::new(),
            info_tags: Vec::new(),
        }
    }

    /// Attach deliverables and goal tags to `goals` with two queries total.
    async fn attach_children_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        goals: &mut [Goal],
    ) -> Result<()> {
        if goals.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = goals.iter().map(|g| g.id).collect();

        let deliverable_rows = sqlx::query(&format!(
            "SELECT {DELIVERABLE_COLUMNS} FROM deliverable
             WHERE goal_id = ANY($1)
             ORDER BY sort_order ASC, id ASC"
        ))
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let tag_rows = sqlx::query(&format!(
            "SELECT {INFO_TAG_COLUMNS} FROM info_tag
             WHERE goal_id = ANY($1)
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let index: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        for row in &deliverable_rows {
            let d = parse_deliverable_row(row);
            if let Some(&i) = index.get(&d.goal_id) {
                goals[i].deliverables.push(d);
            }
        }
        for row in &tag_rows {
            let tag = parse_info_tag_row(row);
            if let Some(i) = tag.goal_id.and_then(|g| index.get(&g).copied()) {
                goals[i].info_tags.push(tag);
            }
        }
        Ok(())
    }

    /// Fetch one owned goal with children inside an existing transaction.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        id: Uuid,
    ) -> Result<Option<Goal>> {
        let row = sqlx::query(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut goals = vec![Self::parse_row(&row)];
        self.attach_children_tx(tx, &mut goals).await?;
        Ok(goals.pop())
    }

    /// Insert deliverables (ordered by position) and goal tags.
    async fn insert_children_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        goal_id: Uuid,
        input: &GoalInput,
        now: DateTime<Utc>,
    ) -> Result<()> {
        for (order, d) in input.deliverables.iter().enumerate() {
            sqlx::query(
                "INSERT INTO deliverable
                    (id, goal_id, title, completed, minutes_estimate, sort_order,
                     start_at, end_at, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)",
            )
            .bind(new_v7())
            .bind(goal_id)
            .bind(d.title.trim())
            .bind(d.completed)
            .bind(d.minutes_estimate)
            .bind(order as i32)
            .bind(d.start)
            .bind(d.end)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }

        for tag in &input.info_tags {
            sqlx::query(
                "INSERT INTO info_tag (id, user_id, goal_id, title, info, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $6)",
            )
            .bind(new_v7())
            .bind(user_id)
            .bind(goal_id)
            .bind(tag.title.trim())
            .bind(&tag.info)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl GoalRepository for PgGoalRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Goal>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let rows = sqlx::query(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let mut goals: Vec<Goal> = rows.iter().map(Self::parse_row).collect();
        self.attach_children_tx(&mut tx, &mut goals).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "goals",
            op = "list",
            result_count = goals.len(),
            "Listed goals"
        );
        Ok(goals)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Goal>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn create(&self, user_id: &str, input: GoalInput) -> Result<Goal> {
        let id = new_v7();
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO goal (id, user_id, title, description, due_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.due_date)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        self.insert_children_tx(&mut tx, user_id, id, &input, now)
            .await?;

        let goal = self
            .fetch_tx(&mut tx, user_id, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("goal {id} vanished after insert")))?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "goals",
            op = "create",
            goal_id = %id,
            deliverables = goal.deliverables.len(),
            info_tags = goal.info_tags.len(),
            "Created goal"
        );
        Ok(goal)
    }

    async fn replace(&self, user_id: &str, id: Uuid, input: GoalInput) -> Result<Option<Goal>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let updated = sqlx::query(
            "UPDATE goal SET title = $1, description = $2, due_date = $3, updated_at = $4
             WHERE id = $5 AND user_id = $6",
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.due_date)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM deliverable WHERE goal_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM info_tag WHERE goal_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        self.insert_children_tx(&mut tx, user_id, id, &input, now)
            .await?;

        let goal = self.fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(goal)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM goal WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
