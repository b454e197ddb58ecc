//! # Notification Repository
//!
//! Per-user notifications and the unread badge count.
//!
//! ## Badge Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The unread count is ALWAYS re-derived:                                 │
//! │                                                                         │
//! │      SELECT COUNT(*) FROM notifications                                 │
//! │      WHERE user_id = ? AND is_read = 0                                  │
//! │                                                                         │
//! │  Change events pushed to subscribers carry no counts; consumers call   │
//! │  unread_count() again. At-least-once delivery plus re-derivation       │
//! │  means a lost or duplicated event can never corrupt the badge.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::Notification;

const NOTIFICATION_COLUMNS: &str = "\
    id, tenant_id, user_id, kind, title, body, is_read, created_at";

/// Repository for notifications.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Inserts a notification.
    pub async fn insert(&self, notification: &Notification) -> DbResult<()> {
        debug!(
            id = %notification.id,
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "Inserting notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, tenant_id, user_id, kind, title, body, is_read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.tenant_id)
        .bind(&notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(notifications)
    }

    /// Re-derives the authoritative unread count for a user.
    pub async fn unread_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification read.
    pub async fn mark_read(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }

    /// Marks all of a user's notifications read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

/// Generates a new notification ID.
pub fn generate_notification_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::testutil::seed_user;
    use agrocrm_core::{NotificationKind, Role, DEFAULT_TENANT_ID};

    fn notification(id: &str, user_id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            user_id: user_id.to_string(),
            kind: NotificationKind::LowStock,
            title: "Low stock".to_string(),
            body: "Urea 50kg is down to 3 units".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unread_count_rederived() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-1", "Ana", Role::Seller).await;

        let repo = db.notifications();
        repo.insert(&notification("n-1", "u-1")).await.unwrap();
        repo.insert(&notification("n-2", "u-1")).await.unwrap();
        repo.insert(&notification("n-3", "u-1")).await.unwrap();

        assert_eq!(repo.unread_count("u-1").await.unwrap(), 3);

        repo.mark_read("n-1").await.unwrap();
        assert_eq!(repo.unread_count("u-1").await.unwrap(), 2);

        let changed = repo.mark_all_read("u-1").await.unwrap();
        assert_eq!(changed, 2);
        assert_eq!(repo.unread_count("u-1").await.unwrap(), 0);

        // Marking again is a no-op, not an error
        assert_eq!(repo.mark_all_read("u-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_is_per_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-1", "Ana", Role::Seller).await;
        seed_user(&db, "u-2", "Bia", Role::Seller).await;

        let repo = db.notifications();
        repo.insert(&notification("n-1", "u-1")).await.unwrap();
        repo.insert(&notification("n-2", "u-2")).await.unwrap();

        let own = repo.list_for_user("u-1", 10).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, "n-1");
    }
}
