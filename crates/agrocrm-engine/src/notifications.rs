//! Notification service: persisted per-user messages plus a
//! fire-and-forget change feed.
//!
//! ## Delivery Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  notify_user()                                                          │
//! │     │                                                                   │
//! │     ├── INSERT notifications row        (authoritative)                 │
//! │     │                                                                   │
//! │     └── broadcast ChangeEvent           (best-effort, at-least-once,   │
//! │                                          unordered, may be dropped     │
//! │                                          when a subscriber lags)       │
//! │                                                                         │
//! │  Subscribers NEVER apply deltas from events. An event is only a hint   │
//! │  to call unread_count() again; the count is re-derived from the       │
//! │  store every time, so lost or duplicated events cannot corrupt the     │
//! │  badge.                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::error::EngineResult;
use agrocrm_core::{Notification, NotificationKind, Role, DEFAULT_TENANT_ID};
use agrocrm_db::repository::notification::generate_notification_id;
use agrocrm_db::Database;

/// Capacity of the in-process change feed. Slow subscribers past this
/// lag lose events, which is acceptable: events carry no state.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOp {
    Insert,
    Update,
    Delete,
}

/// A row-change hint pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    /// Table-ish entity label ("notification", "commission", ...).
    pub entity: &'static str,
    pub entity_id: String,
    pub op: RowOp,
}

/// Notification service handle. Cheap to clone; all clones share the
/// same change feed.
#[derive(Clone)]
pub struct Notifier {
    db: Database,
    events: broadcast::Sender<ChangeEvent>,
}

impl Notifier {
    /// Creates a notifier over a database handle.
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Notifier { db, events }
    }

    /// Subscribes to the change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Subscribes as a Stream (for consumers that prefer combinators).
    pub fn event_stream(&self) -> BroadcastStream<ChangeEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Writes a notification for one user and publishes a change hint.
    pub async fn notify_user(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        body: &str,
    ) -> EngineResult<Notification> {
        let notification = Notification {
            id: generate_notification_id(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            user_id: user_id.to_string(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        self.db.notifications().insert(&notification).await?;
        self.publish(ChangeEvent {
            entity: "notification",
            entity_id: notification.id.clone(),
            op: RowOp::Insert,
        });

        debug!(user_id = %user_id, kind = ?kind, "Notification delivered");
        Ok(notification)
    }

    /// Writes the same notification to every active admin.
    ///
    /// Used for tenant-wide alerts (low stock). Returns how many admins
    /// were notified.
    pub async fn notify_admins(
        &self,
        kind: NotificationKind,
        title: &str,
        body: &str,
    ) -> EngineResult<usize> {
        let users = self.db.users().list(DEFAULT_TENANT_ID).await?;
        let admins: Vec<_> = users
            .into_iter()
            .filter(|u| u.role == Role::Admin)
            .collect();

        for admin in &admins {
            self.notify_user(&admin.id, kind, title, body).await?;
        }

        Ok(admins.len())
    }

    /// Re-derives the authoritative unread count for a user.
    pub async fn unread_count(&self, user_id: &str) -> EngineResult<i64> {
        Ok(self.db.notifications().unread_count(user_id).await?)
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> EngineResult<Vec<Notification>> {
        Ok(self.db.notifications().list_for_user(user_id, limit).await?)
    }

    /// Marks one notification read and publishes a change hint.
    pub async fn mark_read(&self, id: &str) -> EngineResult<()> {
        self.db.notifications().mark_read(id).await?;
        self.publish(ChangeEvent {
            entity: "notification",
            entity_id: id.to_string(),
            op: RowOp::Update,
        });
        Ok(())
    }

    /// Marks all of a user's notifications read.
    pub async fn mark_all_read(&self, user_id: &str) -> EngineResult<u64> {
        let changed = self.db.notifications().mark_all_read(user_id).await?;
        if changed > 0 {
            self.publish(ChangeEvent {
                entity: "notification",
                entity_id: user_id.to_string(),
                op: RowOp::Update,
            });
        }
        Ok(changed)
    }

    /// Publishes a change hint. Fire-and-forget: an error just means no
    /// subscriber is listening right now.
    pub(crate) fn publish(&self, event: ChangeEvent) {
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
