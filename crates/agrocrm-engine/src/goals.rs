//! Goal service: per-seller targets with progress derived from sales.
//!
//! Progress is never stored. Every read aggregates the seller's closed
//! sales inside the goal period (canceled sales excluded) and reports
//! attainment in basis points; 10_000 bps means the goal is met.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notifications::Notifier;
use agrocrm_core::{
    CoreError, Goal, GoalMetric, Money, NotificationKind, ValidationError, Viewer,
    DEFAULT_TENANT_ID,
};
use agrocrm_db::Database;
use chrono::{DateTime, Utc};

/// Operator input for creating a goal.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub seller_id: String,
    pub metric: GoalMetric,
    /// Cents for monetary metrics, a plain count for SalesCount.
    pub target_value: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

/// A goal with its derived progress.
#[derive(Debug, Clone)]
pub struct GoalProgress {
    pub goal: Goal,
    /// Cents for monetary metrics, a count for SalesCount.
    pub achieved_value: i64,
    /// achieved / target in basis points, saturating; 10_000 = reached.
    pub attainment_bps: u32,
}

impl GoalProgress {
    /// Whether the goal has been met or exceeded.
    #[inline]
    pub fn is_reached(&self) -> bool {
        self.attainment_bps >= 10_000
    }
}

/// Service for goal workflows.
#[derive(Clone)]
pub struct GoalService {
    db: Database,
    notifier: Notifier,
}

impl GoalService {
    /// Creates a new GoalService.
    pub fn new(db: Database, notifier: Notifier) -> Self {
        GoalService { db, notifier }
    }

    /// Creates a goal.
    pub async fn create_goal(&self, draft: GoalDraft) -> EngineResult<Goal> {
        if draft.target_value <= 0 {
            return Err(CoreError::Validation(ValidationError::MustBePositive {
                field: "target_value".to_string(),
            })
            .into());
        }
        if draft.period_end <= draft.period_start {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "period".to_string(),
                reason: "period_end must be after period_start".to_string(),
            })
            .into());
        }
        // Seller must exist; a goal for a ghost would never progress.
        self.db
            .users()
            .get_by_id(&draft.seller_id)
            .await?
            .ok_or_else(|| EngineError::not_found("User", &draft.seller_id))?;

        let now = Utc::now();
        let goal = Goal {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            seller_id: draft.seller_id,
            metric: draft.metric,
            target_value: draft.target_value,
            period_start: draft.period_start,
            period_end: draft.period_end,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.goals().insert(&goal).await?;
        info!(id = %goal.id, seller_id = %goal.seller_id, metric = ?goal.metric, "Goal created");
        Ok(goal)
    }

    /// Derives progress for one goal.
    pub async fn progress(&self, goal: &Goal) -> EngineResult<GoalProgress> {
        let aggregate = self
            .db
            .sales()
            .aggregate_closed_for_seller(&goal.seller_id, goal.period_start, goal.period_end)
            .await?;

        let achieved_value = match goal.metric {
            GoalMetric::Revenue => aggregate.revenue_cents,
            GoalMetric::Profit => aggregate.profit_cents,
            GoalMetric::SalesCount => aggregate.sales_count,
        };

        Ok(GoalProgress {
            attainment_bps: attainment_bps(goal.target_value, achieved_value),
            achieved_value,
            goal: goal.clone(),
        })
    }

    /// Lists the viewer's active goals with progress attached.
    pub async fn list_progress(&self, viewer: &Viewer) -> EngineResult<Vec<GoalProgress>> {
        let goals = self.db.goals().list_active(viewer).await?;

        let mut out = Vec::with_capacity(goals.len());
        for goal in &goals {
            out.push(self.progress(goal).await?);
        }
        Ok(out)
    }

    /// Scans active goals and notifies sellers whose goals are reached.
    ///
    /// Explicit action (wired to an admin button or a periodic task, not
    /// a hidden side effect of reading progress). Returns how many goals
    /// triggered a notification.
    pub async fn announce_reached_goals(&self, viewer: &Viewer) -> EngineResult<usize> {
        let mut announced = 0usize;

        for progress in self.list_progress(viewer).await? {
            if !progress.is_reached() {
                continue;
            }

            let achieved = match progress.goal.metric {
                GoalMetric::SalesCount => format!("{} sales", progress.achieved_value),
                _ => format!("{}", Money::from_cents(progress.achieved_value)),
            };
            let body = format!(
                "Goal reached at {}% with {}",
                progress.attainment_bps / 100,
                achieved
            );

            if let Err(e) = self
                .notifier
                .notify_user(
                    &progress.goal.seller_id,
                    NotificationKind::GoalReached,
                    "Goal reached",
                    &body,
                )
                .await
            {
                warn!(goal_id = %progress.goal.id, error = %e, "Goal notification failed");
                continue;
            }
            announced += 1;
        }

        Ok(announced)
    }
}

/// achieved / target in basis points, clamped to sane bounds.
fn attainment_bps(target: i64, achieved: i64) -> u32 {
    if target <= 0 {
        return 0;
    }
    let bps = achieved.max(0) as i128 * 10_000 / target as i128;
    bps.min(u32::MAX as i128) as u32
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agrocrm_core::{
        Client, ClientStatus, Role, Sale, SaleStatus, User, UserStatus,
    };
    use agrocrm_db::DbConfig;
    use chrono::Duration;

    async fn fixture() -> (GoalService, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        for (id, role) in [("u-admin", Role::Admin), ("u-seller", Role::Seller)] {
            db.users()
                .insert(&User {
                    id: id.to_string(),
                    tenant_id: DEFAULT_TENANT_ID.to_string(),
                    name: id.to_string(),
                    email: format!("{}@agro.example", id),
                    role,
                    status: UserStatus::Active,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        db.clients()
            .insert(&Client {
                id: "c-1".to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                owner_user_id: "u-seller".to_string(),
                name: "João Pereira".to_string(),
                farm_name: None,
                email: None,
                phone: None,
                city: None,
                region: None,
                status: ClientStatus::Active,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let notifier = Notifier::new(db.clone());
        (GoalService::new(db.clone(), notifier), db)
    }

    async fn seed_sale(db: &Database, id: &str, gross: i64, profit: i64) {
        let now = Utc::now();
        db.sales()
            .insert_with_items(
                &Sale {
                    id: id.to_string(),
                    tenant_id: DEFAULT_TENANT_ID.to_string(),
                    client_id: "c-1".to_string(),
                    seller_id: "u-seller".to_string(),
                    service_id: None,
                    status: SaleStatus::Closed,
                    gross_value_cents: gross,
                    total_cost_cents: gross - profit,
                    estimated_profit_cents: profit,
                    payment_received: false,
                    sold_at: now,
                    created_at: now,
                    updated_at: now,
                },
                &[],
            )
            .await
            .unwrap();
    }

    fn draft(metric: GoalMetric, target: i64) -> GoalDraft {
        let now = Utc::now();
        GoalDraft {
            seller_id: "u-seller".to_string(),
            metric,
            target_value: target,
            period_start: now - Duration::days(15),
            period_end: now + Duration::days(15),
        }
    }

    #[tokio::test]
    async fn test_revenue_goal_progress() {
        let (svc, db) = fixture().await;
        let goal = svc.create_goal(draft(GoalMetric::Revenue, 200_000)).await.unwrap();

        seed_sale(&db, "s-1", 100_000, 30_000).await;
        let progress = svc.progress(&goal).await.unwrap();
        assert_eq!(progress.achieved_value, 100_000);
        assert_eq!(progress.attainment_bps, 5_000); // half way
        assert!(!progress.is_reached());

        seed_sale(&db, "s-2", 150_000, 40_000).await;
        let progress = svc.progress(&goal).await.unwrap();
        assert_eq!(progress.achieved_value, 250_000);
        assert!(progress.is_reached());
    }

    #[tokio::test]
    async fn test_sales_count_goal() {
        let (svc, db) = fixture().await;
        let goal = svc.create_goal(draft(GoalMetric::SalesCount, 2)).await.unwrap();

        seed_sale(&db, "s-1", 10_000, 2_000).await;
        seed_sale(&db, "s-2", 10_000, 2_000).await;
        // A canceled sale must not count
        seed_sale(&db, "s-3", 10_000, 2_000).await;
        db.sales().cancel("s-3").await.unwrap();

        let progress = svc.progress(&goal).await.unwrap();
        assert_eq!(progress.achieved_value, 2);
        assert_eq!(progress.attainment_bps, 10_000);
    }

    #[tokio::test]
    async fn test_invalid_goal_rejected() {
        let (svc, _db) = fixture().await;

        let mut bad = draft(GoalMetric::Revenue, 0);
        assert!(svc.create_goal(bad.clone()).await.is_err());

        bad.target_value = 100;
        bad.period_end = bad.period_start - Duration::days(1);
        assert!(svc.create_goal(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_announce_reached_notifies_seller() {
        let (svc, db) = fixture().await;
        svc.create_goal(draft(GoalMetric::Revenue, 50_000)).await.unwrap();
        seed_sale(&db, "s-1", 100_000, 30_000).await;

        let admin = Viewer::new("u-admin", Role::Admin);
        let announced = svc.announce_reached_goals(&admin).await.unwrap();
        assert_eq!(announced, 1);

        assert_eq!(svc.notifier.unread_count("u-seller").await.unwrap(), 1);
    }

    #[test]
    fn test_attainment_bps_bounds() {
        assert_eq!(attainment_bps(100, 50), 5_000);
        assert_eq!(attainment_bps(100, 100), 10_000);
        assert_eq!(attainment_bps(100, 250), 25_000);
        assert_eq!(attainment_bps(100, -5), 0);
        assert_eq!(attainment_bps(0, 50), 0);
    }
}
