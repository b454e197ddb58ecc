//! # agrocrm-engine: Orchestration Services for AgroCRM
//!
//! This crate wires the pure logic of `agrocrm-core` to the repositories
//! of `agrocrm-db` into the CRM's actual workflows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                ★ agrocrm-engine (THIS CRATE) ★                          │
//! │                                                                         │
//! │   ┌────────────┐ ┌───────────┐ ┌─────────────┐ ┌────────┐ ┌────────┐  │
//! │   │  catalog   │ │   sales   │ │ commissions │ │ goals  │ │notifi- │  │
//! │   │ save flow  │ │ close +   │ │ resolve +   │ │progress│ │cations │  │
//! │   │ + history  │ │ recalc    │ │ batch       │ │        │ │ + feed │  │
//! │   └─────┬──────┘ └─────┬─────┘ └──────┬──────┘ └───┬────┘ └───┬────┘  │
//! │         │              │              │            │          │        │
//! │         ▼              ▼              ▼            ▼          ▼        │
//! │   agrocrm-core (pure math)    +    agrocrm-db (repositories)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every service is constructed over a [`Database`] handle and carries no
//! other state (the notifier adds a broadcast channel). [`Engine`] bundles
//! them for callers that want the whole surface.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod commissions;
pub mod error;
pub mod goals;
pub mod notifications;
pub mod sales;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{CatalogService, ProductDraft};
pub use commissions::{CommissionService, ProcessSummary};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use goals::{GoalDraft, GoalProgress, GoalService};
pub use notifications::{ChangeEvent, Notifier, RowOp};
pub use sales::{SaleDraft, SaleLineDraft, SalesService};

use agrocrm_db::Database;

// =============================================================================
// Engine Facade
// =============================================================================

/// All services over one database handle.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./agrocrm.db")).await?;
/// let engine = Engine::new(db);
///
/// let product = engine.catalog.create_product(draft, None).await?;
/// let summary = engine.commissions.process_all_closed_sales().await?;
/// ```
#[derive(Clone)]
pub struct Engine {
    pub notifier: Notifier,
    pub catalog: CatalogService,
    pub sales: SalesService,
    pub commissions: CommissionService,
    pub goals: GoalService,
}

impl Engine {
    /// Builds the full service set over a database handle.
    pub fn new(db: Database) -> Self {
        let notifier = Notifier::new(db.clone());
        let catalog = CatalogService::new(db.clone(), notifier.clone());
        let sales = SalesService::new(db.clone(), catalog.clone());
        let commissions = CommissionService::new(db.clone(), notifier.clone());
        let goals = GoalService::new(db, notifier.clone());

        Engine {
            notifier,
            catalog,
            sales,
            commissions,
            goals,
        }
    }
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agrocrm_core::{
        Client, ClientStatus, CommissionBase, CommissionRule, PayStatus, PriceChangeType,
        PricingMode, Role, RuleScope, User, UserStatus, Viewer, DEFAULT_TENANT_ID,
    };
    use agrocrm_db::DbConfig;
    use chrono::Utc;

    async fn engine() -> Engine {
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
        db.rules()
            .insert(&CommissionRule {
                id: "r-general".to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                name: "Default 5% gross".to_string(),
                base: CommissionBase::Gross,
                rate_bps: 500,
                scope: RuleScope::General,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        Engine::new(db)
    }

    /// The reference scenario: calculated product → margin edit →
    /// sale → commission batch → approval.
    #[tokio::test]
    async fn test_full_pipeline() {
        let engine = engine().await;

        // Product: cost 100.00, margin 20%, tax 10% → price 142.86
        let product = engine
            .catalog
            .create_product(
                ProductDraft {
                    name: "NPK 20-05-20 25kg".to_string(),
                    category: "fertilizers".to_string(),
                    description: None,
                    cost_cents: 10_000,
                    price_cents: 0,
                    pricing_mode: PricingMode::Calculated,
                    margin_bps: 2000,
                    tax_bps: 1000,
                    stock: 50,
                    low_stock_threshold: 5,
                    max_discount_bps: 1000,
                },
                Some("u-admin"),
            )
            .await
            .unwrap();
        assert_eq!(product.price_cents, 14_286);

        // Margin 20% → 30%: price 166.67, one new history entry
        let edited = engine
            .catalog
            .update_product(
                &product.id,
                ProductDraft {
                    name: "NPK 20-05-20 25kg".to_string(),
                    category: "fertilizers".to_string(),
                    description: None,
                    cost_cents: 10_000,
                    price_cents: 0,
                    pricing_mode: PricingMode::Calculated,
                    margin_bps: 3000,
                    tax_bps: 1000,
                    stock: 50,
                    low_stock_threshold: 5,
                    max_discount_bps: 1000,
                },
                Some("u-admin"),
            )
            .await
            .unwrap();
        assert_eq!(edited.price_cents, 16_667);

        let history = engine.catalog.price_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change_type, PriceChangeType::Price);

        // Sale: 3 units at 166.67 = 500.01 gross, cost 300.00
        let sale = engine
            .sales
            .create_sale(SaleDraft {
                client_id: "c-1".to_string(),
                seller_id: "u-seller".to_string(),
                service_id: None,
                sold_at: None,
                lines: vec![SaleLineDraft {
                    product_id: product.id.clone(),
                    quantity: 3,
                    discount_bps: 0,
                }],
            })
            .await
            .unwrap();
        assert_eq!(sale.gross_value_cents, 50_001);
        assert_eq!(sale.estimated_profit_cents, 20_001);

        // Batch: one sale processed; rerun is a no-op
        let summary = engine.commissions.process_all_closed_sales().await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);

        let summary = engine.commissions.process_all_closed_sales().await.unwrap();
        assert_eq!(summary.processed, 0);

        // 5% of 500.01 = 25.00 (half-up at the cent)
        let admin = Viewer::new("u-admin", Role::Admin);
        let commissions = engine.commissions.list_commissions(&admin, 10).await.unwrap();
        assert_eq!(commissions.len(), 1);
        assert_eq!(commissions[0].amount_cents, 2_500);

        // Approve: the seller's badge lights up
        engine
            .commissions
            .set_pay_status(&admin, &commissions[0].id, PayStatus::Approved)
            .await
            .unwrap();
        assert_eq!(engine.notifier.unread_count("u-seller").await.unwrap(), 1);
    }
}
