//! Catalog service: the product save flow.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_product / update_product                                        │
//! │                                                                         │
//! │  1. validate draft          (reject before any write)                   │
//! │  2. derive price            (calculated mode only; manual passes       │
//! │                              the operator's price through)             │
//! │  3. write product           (source of truth, must succeed)            │
//! │  4. append price history    (best-effort: a failure here is logged     │
//! │                              and does NOT roll back the product)       │
//! │                                                                         │
//! │  Step 4 runs synchronously before the call returns, so no change      │
//! │  can slip past the audit trail unnoticed, but the product row wins    │
//! │  whenever the two disagree.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notifications::Notifier;
use agrocrm_core::pricing::{classify_change, diff_price_change, effective_price, PriceChange};
use agrocrm_core::validation::{
    validate_category, validate_money_cents, validate_name, validate_rate_bps, validate_stock,
};
use agrocrm_core::{
    CoreError, Money, NotificationKind, Percent, PriceHistoryEntry, PricingMode, Product,
    DEFAULT_TENANT_ID,
};
use agrocrm_db::Database;

/// Operator input for creating or updating a product.
///
/// `price_cents` is only honored in manual mode; calculated mode derives
/// the price and ignores it.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub pricing_mode: PricingMode,
    pub margin_bps: u32,
    pub tax_bps: u32,
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub max_discount_bps: u32,
}

impl ProductDraft {
    fn validate(&self) -> EngineResult<()> {
        validate_name(&self.name).map_err(CoreError::from)?;
        validate_category(&self.category).map_err(CoreError::from)?;
        validate_money_cents("cost", self.cost_cents).map_err(CoreError::from)?;
        validate_money_cents("price", self.price_cents).map_err(CoreError::from)?;
        validate_rate_bps("margin", self.margin_bps).map_err(CoreError::from)?;
        validate_rate_bps("tax", self.tax_bps).map_err(CoreError::from)?;
        validate_rate_bps("max_discount", self.max_discount_bps).map_err(CoreError::from)?;
        validate_stock(self.stock).map_err(CoreError::from)?;
        Ok(())
    }

    /// The price this draft resolves to under its pricing mode.
    fn resolved_price(&self) -> Money {
        effective_price(
            self.pricing_mode,
            Money::from_cents(self.cost_cents),
            Percent::from_bps(self.margin_bps),
            Percent::from_bps(self.tax_bps),
            Money::from_cents(self.price_cents),
        )
    }
}

/// Service for catalog management.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
    notifier: Notifier,
}

impl CatalogService {
    /// Creates a new CatalogService.
    pub fn new(db: Database, notifier: Notifier) -> Self {
        CatalogService { db, notifier }
    }

    /// Creates a product.
    ///
    /// The creation itself counts as a price change from a zero baseline,
    /// so the audit trail starts at the first save.
    pub async fn create_product(
        &self,
        draft: ProductDraft,
        changed_by: Option<&str>,
    ) -> EngineResult<Product> {
        draft.validate()?;

        let now = Utc::now();
        let price = draft.resolved_price();

        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: draft.name.trim().to_string(),
            category: draft.category.trim().to_string(),
            description: draft.description.clone(),
            cost_cents: draft.cost_cents,
            price_cents: price.cents(),
            pricing_mode: draft.pricing_mode,
            margin_bps: draft.margin_bps,
            tax_bps: draft.tax_bps,
            stock: draft.stock,
            low_stock_threshold: draft.low_stock_threshold,
            max_discount_bps: draft.max_discount_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.products().insert(&product).await?;

        let change = classify_change(
            Money::zero(),
            product.cost(),
            Money::zero(),
            product.price(),
        );
        if let Some(change) = change {
            self.record_history(&product, &change, changed_by).await;
        }

        info!(id = %product.id, name = %product.name, price = %product.price(), "Product created");
        Ok(product)
    }

    /// Updates a product.
    ///
    /// Calculated mode re-derives the price from the draft's
    /// cost/margin/tax on every save, including the save that switches a
    /// manual product back to calculated.
    pub async fn update_product(
        &self,
        id: &str,
        draft: ProductDraft,
        changed_by: Option<&str>,
    ) -> EngineResult<Product> {
        draft.validate()?;

        let before = self
            .db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        let price = draft.resolved_price();

        let after = Product {
            id: before.id.clone(),
            tenant_id: before.tenant_id.clone(),
            name: draft.name.trim().to_string(),
            category: draft.category.trim().to_string(),
            description: draft.description.clone(),
            cost_cents: draft.cost_cents,
            price_cents: price.cents(),
            pricing_mode: draft.pricing_mode,
            margin_bps: draft.margin_bps,
            tax_bps: draft.tax_bps,
            stock: draft.stock,
            low_stock_threshold: draft.low_stock_threshold,
            max_discount_bps: draft.max_discount_bps,
            is_active: before.is_active,
            created_at: before.created_at,
            updated_at: Utc::now(),
        };

        self.db.products().update(&after).await?;

        if let Some(change) = diff_price_change(&before, &after) {
            self.record_history(&after, &change, changed_by).await;
        }

        info!(id = %after.id, price = %after.price(), "Product updated");
        Ok(after)
    }

    /// Deactivates a product (soft delete).
    pub async fn deactivate_product(&self, id: &str) -> EngineResult<()> {
        self.db.products().soft_delete(id).await?;
        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Adjusts stock by a delta and raises a low-stock alert when the new
    /// level is at or below the product's threshold.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> EngineResult<Product> {
        let product = self.db.products().adjust_stock(id, delta).await?;

        if product.is_low_on_stock() {
            let body = format!(
                "{} is down to {} units (threshold {})",
                product.name, product.stock, product.low_stock_threshold
            );
            // Alert failures must not fail the stock movement itself.
            if let Err(e) = self
                .notifier
                .notify_admins(NotificationKind::LowStock, "Low stock", &body)
                .await
            {
                warn!(id = %product.id, error = %e, "Low-stock alert failed");
            }
        }

        Ok(product)
    }

    /// Returns a product or a typed not-found error.
    pub async fn get_product(&self, id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", id))
    }

    /// Lists a product's price history, newest first.
    pub async fn price_history(&self, product_id: &str) -> EngineResult<Vec<PriceHistoryEntry>> {
        Ok(self.db.products().history(product_id).await?)
    }

    /// Appends a history entry for an already-persisted change.
    ///
    /// Best-effort by contract: the product row is the source of truth
    /// and has already been written; audit failure is logged and
    /// swallowed.
    async fn record_history(&self, product: &Product, change: &PriceChange, changed_by: Option<&str>) {
        let entry = PriceHistoryEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: product.tenant_id.clone(),
            product_id: product.id.clone(),
            change_type: change.change_type,
            old_cost_cents: change.old_cost.cents(),
            new_cost_cents: change.new_cost.cents(),
            old_price_cents: change.old_price.cents(),
            new_price_cents: change.new_price.cents(),
            margin_bps: product.margin_bps,
            tax_bps: product.tax_bps,
            changed_by: changed_by.map(str::to_string),
            changed_at: Utc::now(),
        };

        if let Err(e) = self.db.products().append_history(&entry).await {
            warn!(
                product_id = %product.id,
                error = %e,
                "Price history write failed; product row already saved"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agrocrm_core::{PriceChangeType, Role, User, UserStatus};
    use agrocrm_db::DbConfig;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "NPK 20-05-20 25kg".to_string(),
            category: "fertilizers".to_string(),
            description: None,
            cost_cents: 10_000,
            price_cents: 0,
            pricing_mode: PricingMode::Calculated,
            margin_bps: 2000,
            tax_bps: 1000,
            stock: 40,
            low_stock_threshold: 5,
            max_discount_bps: 1000,
        }
    }

    async fn service() -> CatalogService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.users()
            .insert(&User {
                id: "u-admin".to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                name: "Rui".to_string(),
                email: "rui@agro.example".to_string(),
                role: Role::Admin,
                status: UserStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let notifier = Notifier::new(db.clone());
        CatalogService::new(db, notifier)
    }

    #[tokio::test]
    async fn test_create_derives_price_and_starts_history() {
        let svc = service().await;

        // cost 100.00, margin 20%, tax 10% → 142.86
        let product = svc.create_product(draft(), Some("u-admin")).await.unwrap();
        assert_eq!(product.price_cents, 14_286);

        let history = svc.price_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, PriceChangeType::Both);
        assert_eq!(history[0].old_cost_cents, 0);
        assert_eq!(history[0].new_price_cents, 14_286);
        assert_eq!(history[0].changed_by.as_deref(), Some("u-admin"));
    }

    #[tokio::test]
    async fn test_margin_edit_recomputes_price_and_appends_one_entry() {
        let svc = service().await;
        let product = svc.create_product(draft(), None).await.unwrap();

        // Edit margin 20% → 30%: price becomes 100 / 0.60 = 166.67
        let mut edited = draft();
        edited.margin_bps = 3000;
        let updated = svc.update_product(&product.id, edited, None).await.unwrap();
        assert_eq!(updated.price_cents, 16_667);

        let history = svc.price_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first: the margin edit changed only the price
        assert_eq!(history[0].change_type, PriceChangeType::Price);
        assert_eq!(history[0].old_price_cents, 14_286);
        assert_eq!(history[0].new_price_cents, 16_667);
        assert_eq!(history[0].margin_bps, 3000);
    }

    #[tokio::test]
    async fn test_no_change_save_appends_nothing() {
        let svc = service().await;
        let product = svc.create_product(draft(), None).await.unwrap();

        // Save again with identical cost/margin/tax: price unchanged,
        // history untouched
        svc.update_product(&product.id, draft(), None).await.unwrap();

        let history = svc.price_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_mode_toggle_round_trip() {
        let svc = service().await;
        let product = svc.create_product(draft(), None).await.unwrap();
        let calculated_price = product.price_cents;

        // Switch to manual keeping the same price
        let mut manual = draft();
        manual.pricing_mode = PricingMode::Manual;
        manual.price_cents = calculated_price;
        let product = svc.update_product(&product.id, manual, None).await.unwrap();
        assert_eq!(product.price_cents, calculated_price);

        // Switch back to calculated with unchanged cost/margin/tax:
        // identical price, and neither toggle wrote history
        let product = svc.update_product(&product.id, draft(), None).await.unwrap();
        assert_eq!(product.price_cents, calculated_price);

        let history = svc.price_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1); // only the creation entry
    }

    #[tokio::test]
    async fn test_manual_mode_keeps_operator_price() {
        let svc = service().await;

        let mut manual = draft();
        manual.pricing_mode = PricingMode::Manual;
        manual.price_cents = 9_999; // below cost, allowed in manual mode
        let product = svc.create_product(manual, None).await.unwrap();
        assert_eq!(product.price_cents, 9_999);
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_before_write() {
        let svc = service().await;

        let mut bad = draft();
        bad.name = "".to_string();
        assert!(svc.create_product(bad, None).await.is_err());

        let mut bad = draft();
        bad.cost_cents = -1;
        assert!(svc.create_product(bad, None).await.is_err());

        let mut bad = draft();
        bad.margin_bps = 10_001;
        assert!(svc.create_product(bad, None).await.is_err());
    }

    #[tokio::test]
    async fn test_low_stock_alert_on_adjust() {
        let svc = service().await;
        let product = svc.create_product(draft(), None).await.unwrap();

        // 40 − 37 = 3, below threshold 5 → admins get an alert
        let after = svc.adjust_stock(&product.id, -37).await.unwrap();
        assert_eq!(after.stock, 3);

        let unread = svc.notifier.unread_count("u-admin").await.unwrap();
        assert_eq!(unread, 1);
    }
}
