//! # Field Operation Repositories
//!
//! Visits, product demonstrations, and technician service orders. Plain
//! CRUD with viewer scoping; service orders additionally feed the
//! service-based commission bases through `get_by_id`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{Demonstration, ScheduleStatus, ServiceOrder, Viewer, Visit};

// =============================================================================
// Visits
// =============================================================================

const VISIT_COLUMNS: &str = "\
    id, tenant_id, client_id, seller_id, scheduled_for, status, notes, \
    created_at, updated_at";

/// Repository for client visits.
#[derive(Debug, Clone)]
pub struct VisitRepository {
    pool: SqlitePool,
}

impl VisitRepository {
    /// Creates a new VisitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VisitRepository { pool }
    }

    /// Inserts a visit.
    pub async fn insert(&self, visit: &Visit) -> DbResult<()> {
        debug!(id = %visit.id, client_id = %visit.client_id, "Inserting visit");

        sqlx::query(
            r#"
            INSERT INTO visits (
                id, tenant_id, client_id, seller_id, scheduled_for,
                status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&visit.id)
        .bind(&visit.tenant_id)
        .bind(&visit.client_id)
        .bind(&visit.seller_id)
        .bind(visit.scheduled_for)
        .bind(visit.status)
        .bind(&visit.notes)
        .bind(visit.created_at)
        .bind(visit.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a visit by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Visit>> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?1");
        let visit = sqlx::query_as::<_, Visit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(visit)
    }

    /// Moves a visit to a new status.
    pub async fn set_status(&self, id: &str, status: ScheduleStatus) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE visits SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Visit", id));
        }

        Ok(())
    }

    /// Lists visits visible to a viewer, next first.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Visit>> {
        let visits = if viewer.sees_all_rows() {
            let sql = format!("SELECT {VISIT_COLUMNS} FROM visits ORDER BY scheduled_for LIMIT ?1");
            sqlx::query_as::<_, Visit>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {VISIT_COLUMNS} FROM visits \
                 WHERE seller_id = ?1 ORDER BY scheduled_for LIMIT ?2"
            );
            sqlx::query_as::<_, Visit>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(visits)
    }
}

// =============================================================================
// Demonstrations
// =============================================================================

const DEMONSTRATION_COLUMNS: &str = "\
    id, tenant_id, client_id, product_id, seller_id, scheduled_for, status, \
    outcome, created_at, updated_at";

/// Repository for product demonstrations.
#[derive(Debug, Clone)]
pub struct DemonstrationRepository {
    pool: SqlitePool,
}

impl DemonstrationRepository {
    /// Creates a new DemonstrationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DemonstrationRepository { pool }
    }

    /// Inserts a demonstration.
    pub async fn insert(&self, demo: &Demonstration) -> DbResult<()> {
        debug!(id = %demo.id, product_id = %demo.product_id, "Inserting demonstration");

        sqlx::query(
            r#"
            INSERT INTO demonstrations (
                id, tenant_id, client_id, product_id, seller_id,
                scheduled_for, status, outcome, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&demo.id)
        .bind(&demo.tenant_id)
        .bind(&demo.client_id)
        .bind(&demo.product_id)
        .bind(&demo.seller_id)
        .bind(demo.scheduled_for)
        .bind(demo.status)
        .bind(&demo.outcome)
        .bind(demo.created_at)
        .bind(demo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a demonstration by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Demonstration>> {
        let sql = format!("SELECT {DEMONSTRATION_COLUMNS} FROM demonstrations WHERE id = ?1");
        let demo = sqlx::query_as::<_, Demonstration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(demo)
    }

    /// Marks a demonstration done and records its outcome.
    pub async fn complete(&self, id: &str, outcome: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE demonstrations SET
                status = 'done', outcome = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'scheduled'
            "#,
        )
        .bind(id)
        .bind(outcome)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Demonstration (scheduled)", id));
        }

        Ok(())
    }

    /// Lists demonstrations visible to a viewer.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Demonstration>> {
        let demos = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {DEMONSTRATION_COLUMNS} FROM demonstrations \
                 ORDER BY scheduled_for LIMIT ?1"
            );
            sqlx::query_as::<_, Demonstration>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {DEMONSTRATION_COLUMNS} FROM demonstrations \
                 WHERE seller_id = ?1 ORDER BY scheduled_for LIMIT ?2"
            );
            sqlx::query_as::<_, Demonstration>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(demos)
    }
}

// =============================================================================
// Service Orders
// =============================================================================

const SERVICE_ORDER_COLUMNS: &str = "\
    id, tenant_id, client_id, technician_id, kind, total_value_cents, status, \
    performed_at, notes, created_at, updated_at";

/// Repository for technician service orders.
#[derive(Debug, Clone)]
pub struct ServiceOrderRepository {
    pool: SqlitePool,
}

impl ServiceOrderRepository {
    /// Creates a new ServiceOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceOrderRepository { pool }
    }

    /// Inserts a service order.
    pub async fn insert(&self, order: &ServiceOrder) -> DbResult<()> {
        debug!(id = %order.id, kind = ?order.kind, "Inserting service order");

        sqlx::query(
            r#"
            INSERT INTO service_orders (
                id, tenant_id, client_id, technician_id, kind,
                total_value_cents, status, performed_at, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.client_id)
        .bind(&order.technician_id)
        .bind(order.kind)
        .bind(order.total_value_cents)
        .bind(order.status)
        .bind(order.performed_at)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a service order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ServiceOrder>> {
        let sql = format!("SELECT {SERVICE_ORDER_COLUMNS} FROM service_orders WHERE id = ?1");
        let order = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Marks a service order done and stamps performed_at.
    pub async fn complete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE service_orders SET
                status = 'done', performed_at = ?2, updated_at = ?2
            WHERE id = ?1 AND status = 'scheduled'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ServiceOrder (scheduled)", id));
        }

        Ok(())
    }

    /// Lists service orders visible to a viewer (technicians see own).
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<ServiceOrder>> {
        let orders = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {SERVICE_ORDER_COLUMNS} FROM service_orders \
                 ORDER BY created_at DESC LIMIT ?1"
            );
            sqlx::query_as::<_, ServiceOrder>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {SERVICE_ORDER_COLUMNS} FROM service_orders \
                 WHERE technician_id = ?1 ORDER BY created_at DESC LIMIT ?2"
            );
            sqlx::query_as::<_, ServiceOrder>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(orders)
    }
}

/// Generates a new visit ID.
pub fn generate_visit_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new demonstration ID.
pub fn generate_demonstration_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new service order ID.
pub fn generate_service_order_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::testutil::{seed_client, seed_user};
    use agrocrm_core::{Role, ServiceKind, DEFAULT_TENANT_ID};

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-seller", "Ana", Role::Seller).await;
        seed_user(&db, "u-tech", "Tomás", Role::Technician).await;
        seed_client(&db, "c-1", "u-seller", "Fazenda Boa Vista").await;
        db
    }

    #[tokio::test]
    async fn test_visit_status_flow() {
        let db = test_db().await;
        let now = Utc::now();

        db.visits()
            .insert(&Visit {
                id: "v-1".to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                client_id: "c-1".to_string(),
                seller_id: "u-seller".to_string(),
                scheduled_for: now,
                status: ScheduleStatus::Scheduled,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db.visits().set_status("v-1", ScheduleStatus::Done).await.unwrap();
        let loaded = db.visits().get_by_id("v-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduleStatus::Done);
    }

    #[tokio::test]
    async fn test_service_order_complete_stamps_performed_at() {
        let db = test_db().await;
        let now = Utc::now();

        db.service_orders()
            .insert(&ServiceOrder {
                id: "svc-1".to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                client_id: "c-1".to_string(),
                technician_id: "u-tech".to_string(),
                kind: ServiceKind::Spraying,
                total_value_cents: 50_000,
                status: ScheduleStatus::Scheduled,
                performed_at: None,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db.service_orders().complete("svc-1").await.unwrap();
        let loaded = db.service_orders().get_by_id("svc-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduleStatus::Done);
        assert!(loaded.performed_at.is_some());

        // Completing twice fails: no longer scheduled
        assert!(db.service_orders().complete("svc-1").await.is_err());
    }
}
