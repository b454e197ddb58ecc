//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (already closed)                                            │
//! │     └── insert_with_items() → Sale { status: Closed } + line snapshots │
//! │         totals computed once by the engine, stored as-is               │
//! │                                                                         │
//! │  2. (OPTIONAL) RECALC                                                  │
//! │     └── update_totals() → explicit reprocess from stored snapshots     │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── cancel() → Sale { status: Canceled }                           │
//! │                                                                         │
//! │  Commission eligibility: closed sales with no commission row yet.     │
//! │  list_closed_without_commission() feeds the batch processor.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{Sale, SaleItem, Viewer};

const SALE_COLUMNS: &str = "\
    id, tenant_id, client_id, seller_id, service_id, status, \
    gross_value_cents, total_cost_cents, estimated_profit_cents, \
    payment_received, sold_at, created_at, updated_at";

/// Aggregates over a seller's closed sales, used for goal progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedSalesAggregate {
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub sales_count: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Inserts a sale and its line items in one transaction.
    ///
    /// ## Snapshot Pattern
    /// Line items carry frozen product data (name, category, price, cost);
    /// the sale totals were computed from those snapshots by the engine.
    /// Either everything lands or nothing does.
    pub async fn insert_with_items(&self, sale: &Sale, items: &[SaleItem]) -> DbResult<()> {
        debug!(id = %sale.id, items = items.len(), "Inserting sale with items");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, client_id, seller_id, service_id, status,
                gross_value_cents, total_cost_cents, estimated_profit_cents,
                payment_received, sold_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.client_id)
        .bind(&sale.seller_id)
        .bind(&sale.service_id)
        .bind(sale.status)
        .bind(sale.gross_value_cents)
        .bind(sale.total_cost_cents)
        .bind(sale.estimated_profit_cents)
        .bind(sale.payment_received)
        .bind(sale.sold_at)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot, category_snapshot,
                    unit_price_cents, unit_cost_cents, quantity, discount_bps,
                    line_total_cents, line_cost_cents, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12
                )
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(&item.category_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.unit_cost_cents)
            .bind(item.quantity)
            .bind(item.discount_bps)
            .bind(item.line_total_cents)
            .bind(item.line_cost_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, category_snapshot,
                   unit_price_cents, unit_cost_cents, quantity, discount_bps,
                   line_total_cents, line_cost_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales visible to a viewer, newest first.
    ///
    /// Admins see all rows; sellers only rows where they are the seller.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {SALE_COLUMNS} FROM sales ORDER BY sold_at DESC LIMIT ?1"
            );
            sqlx::query_as::<_, Sale>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {SALE_COLUMNS} FROM sales \
                 WHERE seller_id = ?1 ORDER BY sold_at DESC LIMIT ?2"
            );
            sqlx::query_as::<_, Sale>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(sales)
    }

    /// Lists closed sales that have no commission yet.
    ///
    /// Feeds the batch processor; the anti-join keeps the operation
    /// idempotent: already-processed sales simply stop appearing.
    pub async fn list_closed_without_commission(&self) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {cols} FROM sales s \
             LEFT JOIN commissions c ON c.sale_id = s.id \
             WHERE s.status = 'closed' AND c.id IS NULL \
             ORDER BY s.sold_at",
            cols = "s.id, s.tenant_id, s.client_id, s.seller_id, s.service_id, s.status, \
                    s.gross_value_cents, s.total_cost_cents, s.estimated_profit_cents, \
                    s.payment_received, s.sold_at, s.created_at, s.updated_at"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql).fetch_all(&self.pool).await?;

        Ok(sales)
    }

    /// Overwrites a sale's stored totals (explicit recalc only).
    pub async fn update_totals(
        &self,
        sale_id: &str,
        gross_value_cents: i64,
        total_cost_cents: i64,
        estimated_profit_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                gross_value_cents = ?2,
                total_cost_cents = ?3,
                estimated_profit_cents = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(gross_value_cents)
        .bind(total_cost_cents)
        .bind(estimated_profit_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Cancels a sale.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = 'canceled',
                updated_at = ?2
            WHERE id = ?1 AND status = 'closed'
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (closed)", sale_id));
        }

        Ok(())
    }

    /// Flags whether payment for a sale has been received.
    pub async fn set_payment_received(&self, sale_id: &str, received: bool) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                payment_received = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(received)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Aggregates a seller's closed sales inside a period.
    ///
    /// Canceled sales are excluded; goal progress reads exactly this.
    pub async fn aggregate_closed_for_seller(
        &self,
        seller_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DbResult<ClosedSalesAggregate> {
        let row: (Option<i64>, Option<i64>, i64) = sqlx::query_as(
            r#"
            SELECT SUM(gross_value_cents), SUM(estimated_profit_cents), COUNT(*)
            FROM sales
            WHERE seller_id = ?1
              AND status = 'closed'
              AND sold_at >= ?2
              AND sold_at < ?3
            "#,
        )
        .bind(seller_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(ClosedSalesAggregate {
            revenue_cents: row.0.unwrap_or(0),
            profit_cents: row.1.unwrap_or(0),
            sales_count: row.2,
        })
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
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
    use agrocrm_core::{Role, SaleStatus, DEFAULT_TENANT_ID};

    fn sample_sale(id: &str, seller_id: &str, client_id: &str) -> Sale {
        let now = Utc::now();
        Sale {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            client_id: client_id.to_string(),
            seller_id: seller_id.to_string(),
            service_id: None,
            status: SaleStatus::Closed,
            gross_value_cents: 100_000,
            total_cost_cents: 70_000,
            estimated_profit_cents: 30_000,
            payment_received: false,
            sold_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_item(id: &str, sale_id: &str, product_id: &str) -> SaleItem {
        SaleItem {
            id: id.to_string(),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            name_snapshot: "Soybean seed 40kg".to_string(),
            category_snapshot: "seeds".to_string(),
            unit_price_cents: 50_000,
            unit_cost_cents: 35_000,
            quantity: 2,
            discount_bps: 0,
            line_total_cents: 100_000,
            line_cost_cents: 70_000,
            created_at: Utc::now(),
        }
    }

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_user(&db, "u-seller", "Ana", Role::Seller).await;
        seed_user(&db, "u-admin", "Rui", Role::Admin).await;
        seed_client(&db, "c-1", "u-seller", "Fazenda Boa Vista").await;
        db
    }

    async fn seed_product(db: &Database, id: &str) {
        use agrocrm_core::{PricingMode, Product};
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: id.to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                name: "Soybean seed 40kg".to_string(),
                category: "seeds".to_string(),
                description: None,
                cost_cents: 35_000,
                price_cents: 50_000,
                pricing_mode: PricingMode::Manual,
                margin_bps: 0,
                tax_bps: 0,
                stock: 100,
                low_stock_threshold: 10,
                max_discount_bps: 1000,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_with_items_round_trip() {
        let db = test_db().await;
        seed_product(&db, "p-1").await;

        let sale = sample_sale("s-1", "u-seller", "c-1");
        let items = vec![sample_item("i-1", "s-1", "p-1")];
        db.sales().insert_with_items(&sale, &items).await.unwrap();

        let loaded = db.sales().get_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SaleStatus::Closed);
        assert_eq!(loaded.estimated_profit_cents, 30_000);

        let loaded_items = db.sales().get_items("s-1").await.unwrap();
        assert_eq!(loaded_items.len(), 1);
        assert_eq!(loaded_items[0].category_snapshot, "seeds");
    }

    #[tokio::test]
    async fn test_list_scoped_by_viewer() {
        let db = test_db().await;
        seed_user(&db, "u-other", "Bia", Role::Seller).await;
        seed_client(&db, "c-2", "u-other", "Sítio São José").await;
        seed_product(&db, "p-1").await;

        db.sales()
            .insert_with_items(&sample_sale("s-1", "u-seller", "c-1"), &[])
            .await
            .unwrap();
        db.sales()
            .insert_with_items(&sample_sale("s-2", "u-other", "c-2"), &[])
            .await
            .unwrap();

        let admin = Viewer::new("u-admin", Role::Admin);
        assert_eq!(db.sales().list(&admin, 10).await.unwrap().len(), 2);

        let seller = Viewer::new("u-seller", Role::Seller);
        let own = db.sales().list(&seller, 10).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, "s-1");
    }

    #[tokio::test]
    async fn test_cancel_only_closed_sales() {
        let db = test_db().await;
        db.sales()
            .insert_with_items(&sample_sale("s-1", "u-seller", "c-1"), &[])
            .await
            .unwrap();

        db.sales().cancel("s-1").await.unwrap();
        let loaded = db.sales().get_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SaleStatus::Canceled);

        // Canceling again fails: no longer closed
        assert!(db.sales().cancel("s-1").await.is_err());
    }

    #[tokio::test]
    async fn test_aggregate_excludes_canceled() {
        let db = test_db().await;

        db.sales()
            .insert_with_items(&sample_sale("s-1", "u-seller", "c-1"), &[])
            .await
            .unwrap();
        db.sales()
            .insert_with_items(&sample_sale("s-2", "u-seller", "c-1"), &[])
            .await
            .unwrap();
        db.sales().cancel("s-2").await.unwrap();

        let start = Utc::now() - chrono::Duration::days(1);
        let end = Utc::now() + chrono::Duration::days(1);
        let agg = db
            .sales()
            .aggregate_closed_for_seller("u-seller", start, end)
            .await
            .unwrap();

        assert_eq!(agg.sales_count, 1);
        assert_eq!(agg.revenue_cents, 100_000);
        assert_eq!(agg.profit_cents, 30_000);
    }
}
