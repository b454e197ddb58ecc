//! # Goal Repository
//!
//! CRUD for per-seller goals. Progress is never stored; the goals
//! service derives it from the sale aggregates on every read.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{Goal, Viewer};

const GOAL_COLUMNS: &str = "\
    id, tenant_id, seller_id, metric, target_value, period_start, period_end, \
    is_active, created_at, updated_at";

/// Repository for goals.
#[derive(Debug, Clone)]
pub struct GoalRepository {
    pool: SqlitePool,
}

impl GoalRepository {
    /// Creates a new GoalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GoalRepository { pool }
    }

    /// Inserts a goal.
    pub async fn insert(&self, goal: &Goal) -> DbResult<()> {
        debug!(id = %goal.id, seller_id = %goal.seller_id, metric = ?goal.metric, "Inserting goal");

        sqlx::query(
            r#"
            INSERT INTO goals (
                id, tenant_id, seller_id, metric, target_value,
                period_start, period_end, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&goal.id)
        .bind(&goal.tenant_id)
        .bind(&goal.seller_id)
        .bind(goal.metric)
        .bind(goal.target_value)
        .bind(goal.period_start)
        .bind(goal.period_end)
        .bind(goal.is_active)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a goal by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Goal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1");
        let goal = sqlx::query_as::<_, Goal>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(goal)
    }

    /// Lists active goals visible to a viewer.
    pub async fn list_active(&self, viewer: &Viewer) -> DbResult<Vec<Goal>> {
        let goals = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {GOAL_COLUMNS} FROM goals \
                 WHERE is_active = 1 ORDER BY period_start DESC"
            );
            sqlx::query_as::<_, Goal>(&sql).fetch_all(&self.pool).await?
        } else {
            let sql = format!(
                "SELECT {GOAL_COLUMNS} FROM goals \
                 WHERE is_active = 1 AND seller_id = ?1 ORDER BY period_start DESC"
            );
            sqlx::query_as::<_, Goal>(&sql)
                .bind(&viewer.user_id)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(goals)
    }

    /// Activates or deactivates a goal.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE goals SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Goal", id));
        }

        Ok(())
    }
}

/// Generates a new goal ID.
pub fn generate_goal_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
