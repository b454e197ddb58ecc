//! Sales service: sale creation from line drafts, explicit total
//! recalculation, cancellation, payment flag.
//!
//! ## Snapshot Semantics
//! A sale freezes product name, category, price, and cost per line at
//! creation. `estimated_profit` is computed once from those snapshots and
//! is NOT touched when product costs change later. The only way totals
//! move is the explicit recalc operation, which re-derives them from the
//! stored snapshots (and therefore reproduces the same figures unless the
//! line rows themselves were corrected).

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::error::{EngineError, EngineResult};
use agrocrm_core::pricing::{line_cost, line_total, sale_totals};
use agrocrm_core::validation::{validate_quantity, validate_rate_bps, validate_sale_lines};
use agrocrm_core::{
    CoreError, Percent, Sale, SaleItem, SaleStatus, Viewer, DEFAULT_TENANT_ID,
};
use agrocrm_db::Database;

/// One line of a sale being submitted.
#[derive(Debug, Clone)]
pub struct SaleLineDraft {
    pub product_id: String,
    pub quantity: i64,
    /// Seller-granted discount in basis points; capped by the product's
    /// max_discount.
    pub discount_bps: u32,
}

/// Operator input for closing a sale.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub client_id: String,
    pub seller_id: String,
    /// Linked service order, when the sale originates from field service.
    pub service_id: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub lines: Vec<SaleLineDraft>,
}

/// Service for sale workflows.
#[derive(Clone)]
pub struct SalesService {
    db: Database,
    catalog: CatalogService,
}

impl SalesService {
    /// Creates a new SalesService.
    pub fn new(db: Database, catalog: CatalogService) -> Self {
        SalesService { db, catalog }
    }

    /// Closes a sale from a draft.
    ///
    /// Validates the client, every line's product, quantity, and discount
    /// cap before writing anything; then snapshots product data into line
    /// items, derives the totals once, stores sale + items atomically,
    /// and decrements stock per line (raising low-stock alerts as a side
    /// effect of the stock movement).
    pub async fn create_sale(&self, draft: SaleDraft) -> EngineResult<Sale> {
        validate_sale_lines(draft.lines.len()).map_err(CoreError::from)?;

        let client = self
            .db
            .clients()
            .get_by_id(&draft.client_id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(draft.client_id.clone()))?;

        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(draft.lines.len());

        for line in &draft.lines {
            validate_quantity(line.quantity).map_err(CoreError::from)?;
            validate_rate_bps("discount", line.discount_bps).map_err(CoreError::from)?;

            let product = self
                .db
                .products()
                .get_by_id(&line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if line.discount_bps > product.max_discount_bps {
                return Err(CoreError::DiscountExceedsMax {
                    product: product.name.clone(),
                    requested_bps: line.discount_bps,
                    max_bps: product.max_discount_bps,
                }
                .into());
            }

            let discount = Percent::from_bps(line.discount_bps);
            let total = line_total(product.price(), line.quantity, discount);
            let cost = line_cost(product.cost(), line.quantity);

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                category_snapshot: product.category.clone(),
                unit_price_cents: product.price_cents,
                unit_cost_cents: product.cost_cents,
                quantity: line.quantity,
                discount_bps: line.discount_bps,
                line_total_cents: total.cents(),
                line_cost_cents: cost.cents(),
                created_at: now,
            });
        }

        let totals = sale_totals(&items);

        let sale = Sale {
            id: sale_id,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            client_id: client.id,
            seller_id: draft.seller_id,
            service_id: draft.service_id,
            status: SaleStatus::Closed,
            gross_value_cents: totals.gross_value.cents(),
            total_cost_cents: totals.total_cost.cents(),
            estimated_profit_cents: totals.estimated_profit.cents(),
            payment_received: false,
            sold_at: draft.sold_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };

        self.db.sales().insert_with_items(&sale, &items).await?;

        // Stock moves after the sale is durable; the catalog raises
        // low-stock alerts as part of the adjustment.
        for item in &items {
            self.catalog
                .adjust_stock(&item.product_id, -item.quantity)
                .await?;
        }

        info!(
            sale_id = %sale.id,
            gross = %sale.gross_value(),
            profit = %sale.estimated_profit(),
            lines = items.len(),
            "Sale closed"
        );
        Ok(sale)
    }

    /// Recomputes a sale's totals from its stored line snapshots.
    ///
    /// The explicit reprocess action, and the only path that ever rewrites
    /// gross/cost/profit after creation.
    pub async fn recalc_sale_totals(&self, sale_id: &str) -> EngineResult<Sale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let items = self.db.sales().get_items(&sale.id).await?;
        let totals = sale_totals(&items);

        debug!(
            sale_id = %sale.id,
            gross = %totals.gross_value,
            "Recalculating sale totals"
        );

        self.db
            .sales()
            .update_totals(
                &sale.id,
                totals.gross_value.cents(),
                totals.total_cost.cents(),
                totals.estimated_profit.cents(),
            )
            .await?;

        self.db
            .sales()
            .get_by_id(&sale.id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", &sale.id))
    }

    /// Cancels a closed sale.
    pub async fn cancel_sale(&self, sale_id: &str) -> EngineResult<()> {
        self.db.sales().cancel(sale_id).await?;
        info!(sale_id = %sale_id, "Sale canceled");
        Ok(())
    }

    /// Flags whether payment for a sale was received.
    pub async fn set_payment_received(&self, sale_id: &str, received: bool) -> EngineResult<()> {
        self.db.sales().set_payment_received(sale_id, received).await?;
        Ok(())
    }

    /// Lists sales visible to a viewer.
    pub async fn list_sales(&self, viewer: &Viewer, limit: u32) -> EngineResult<Vec<Sale>> {
        Ok(self.db.sales().list(viewer, limit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductDraft;
    use crate::notifications::Notifier;
    use agrocrm_core::{Client, ClientStatus, PricingMode, Role, User, UserStatus};
    use agrocrm_db::DbConfig;

    struct Fixture {
        sales: SalesService,
        catalog: CatalogService,
        db: Database,
    }

    async fn fixture() -> Fixture {
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
        let catalog = CatalogService::new(db.clone(), notifier);
        let sales = SalesService::new(db.clone(), catalog.clone());
        Fixture { sales, catalog, db }
    }

    async fn seed_product(fx: &Fixture, price_cents: i64, cost_cents: i64) -> String {
        let product = fx
            .catalog
            .create_product(
                ProductDraft {
                    name: "Soybean seed 40kg".to_string(),
                    category: "seeds".to_string(),
                    description: None,
                    cost_cents,
                    price_cents,
                    pricing_mode: PricingMode::Manual,
                    margin_bps: 0,
                    tax_bps: 0,
                    stock: 100,
                    low_stock_threshold: 10,
                    max_discount_bps: 1000,
                },
                None,
            )
            .await
            .unwrap();
        product.id
    }

    fn draft(product_id: &str, quantity: i64, discount_bps: u32) -> SaleDraft {
        SaleDraft {
            client_id: "c-1".to_string(),
            seller_id: "u-seller".to_string(),
            service_id: None,
            sold_at: None,
            lines: vec![SaleLineDraft {
                product_id: product_id.to_string(),
                quantity,
                discount_bps,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_sale_totals_and_stock() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 50_000, 35_000).await;

        // 2 × 500.00 with 10% discount = 900.00 gross; cost 700.00
        let sale = fx.sales.create_sale(draft(&product_id, 2, 1000)).await.unwrap();
        assert_eq!(sale.gross_value_cents, 90_000);
        assert_eq!(sale.total_cost_cents, 70_000);
        assert_eq!(sale.estimated_profit_cents, 20_000);
        assert_eq!(sale.status, SaleStatus::Closed);

        // Stock decremented by quantity
        let product = fx.catalog.get_product(&product_id).await.unwrap();
        assert_eq!(product.stock, 98);
    }

    #[tokio::test]
    async fn test_discount_above_cap_rejected() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 50_000, 35_000).await;

        // Product allows 10%; seller asks 15%
        let err = fx.sales.create_sale(draft(&product_id, 1, 1500)).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::DiscountExceedsMax { .. })
        ));

        // Nothing was written
        let viewer = Viewer::new("u-seller", Role::Seller);
        assert!(fx.sales.list_sales(&viewer, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_client_rejected_before_write() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 50_000, 35_000).await;

        let mut bad = draft(&product_id, 1, 0);
        bad.client_id = "c-ghost".to_string();
        let err = fx.sales.create_sale(bad).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_sale_rejected() {
        let fx = fixture().await;
        let bad = SaleDraft {
            client_id: "c-1".to_string(),
            seller_id: "u-seller".to_string(),
            service_id: None,
            sold_at: None,
            lines: vec![],
        };
        assert!(fx.sales.create_sale(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_recalc_reproduces_snapshot_totals() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 50_000, 35_000).await;
        let sale = fx.sales.create_sale(draft(&product_id, 2, 0)).await.unwrap();

        // Change the product's cost AFTER the sale
        let mut edited = ProductDraft {
            name: "Soybean seed 40kg".to_string(),
            category: "seeds".to_string(),
            description: None,
            cost_cents: 48_000, // cost nearly doubled
            price_cents: 50_000,
            pricing_mode: PricingMode::Manual,
            margin_bps: 0,
            tax_bps: 0,
            stock: 98,
            low_stock_threshold: 10,
            max_discount_bps: 1000,
        };
        edited.price_cents = 50_000;
        fx.catalog.update_product(&product_id, edited, None).await.unwrap();

        // Recalc works from the frozen snapshots: totals are unchanged
        let recalced = fx.sales.recalc_sale_totals(&sale.id).await.unwrap();
        assert_eq!(recalced.gross_value_cents, sale.gross_value_cents);
        assert_eq!(recalced.total_cost_cents, sale.total_cost_cents);
        assert_eq!(recalced.estimated_profit_cents, sale.estimated_profit_cents);
    }

    #[tokio::test]
    async fn test_payment_flag() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 50_000, 35_000).await;
        let sale = fx.sales.create_sale(draft(&product_id, 1, 0)).await.unwrap();

        fx.sales.set_payment_received(&sale.id, true).await.unwrap();
        let loaded = fx.db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert!(loaded.payment_received);
    }
}
