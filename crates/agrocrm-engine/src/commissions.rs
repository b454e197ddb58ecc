//! Commission service: attaches commissions to closed sales.
//!
//! ## Batch Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_all_closed_sales()                                             │
//! │                                                                         │
//! │  closed sales lacking a commission                                      │
//! │       │                                                                 │
//! │       ▼ one by one, sequentially                                        │
//! │  create_commission_for_sale(sale_id)                                    │
//! │       │                                                                 │
//! │       ├── rule resolved + amount computed → INSERT  (processed)        │
//! │       ├── no active rule matches          → nothing (skipped)          │
//! │       └── failure (e.g. missing service order)                         │
//! │              → logged, counters bumped, batch CONTINUES (failed)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProcessSummary { processed, skipped, failed }                          │
//! │                                                                         │
//! │  Idempotent: the anti-join only yields unprocessed sales, the          │
//! │  skip-if-exists check covers stragglers, and the unique index on       │
//! │  commissions.sale_id backstops both. Run it twice, get the same rows.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notifications::{ChangeEvent, Notifier, RowOp};
use agrocrm_core::commission::{
    apply_pay_status, compute_commission, resolve_rule, SoldProduct,
};
use agrocrm_core::{Commission, CoreError, NotificationKind, PayStatus, Viewer};
use agrocrm_db::Database;

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Sales that received a commission.
    pub processed: usize,
    /// Sales with no matching active rule (no commission created).
    pub skipped: usize,
    /// Sales whose processing failed; logged, not fatal.
    pub failed: usize,
}

/// Service for commission workflows.
#[derive(Clone)]
pub struct CommissionService {
    db: Database,
    notifier: Notifier,
}

impl CommissionService {
    /// Creates a new CommissionService.
    pub fn new(db: Database, notifier: Notifier) -> Self {
        CommissionService { db, notifier }
    }

    /// Creates the commission for one closed sale.
    ///
    /// The single-sale entry point the batch iterates over. Returns
    /// `Ok(None)` when the sale already has a commission or no active
    /// rule matches; both are normal outcomes, not errors.
    pub async fn create_commission_for_sale(
        &self,
        sale_id: &str,
    ) -> EngineResult<Option<Commission>> {
        // Skip-if-exists: makes the operation idempotent even when called
        // outside the batch's anti-join.
        if self.db.commissions().exists_for_sale(sale_id).await? {
            debug!(sale_id = %sale_id, "Commission already exists, skipping");
            return Ok(None);
        }

        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let items = self.db.sales().get_items(&sale.id).await?;
        let lines: Vec<SoldProduct> = items.iter().map(SoldProduct::from).collect();

        let rules = self.db.rules().list_active(&sale.tenant_id).await?;
        let rule = match resolve_rule(&lines, &rules) {
            Some(rule) => rule,
            None => {
                debug!(sale_id = %sale.id, "No active commission rule matches");
                return Ok(None);
            }
        };

        // Service-based rules read the linked service order's value.
        let service = match &sale.service_id {
            Some(service_id) if rule.base.service_kind().is_some() => {
                self.db.service_orders().get_by_id(service_id).await?
            }
            _ => None,
        };

        let amount = compute_commission(&sale, rule, service.as_ref())?;

        let now = Utc::now();
        let commission = Commission {
            id: Uuid::new_v4().to_string(),
            tenant_id: sale.tenant_id.clone(),
            sale_id: sale.id.clone(),
            seller_id: sale.seller_id.clone(),
            base: rule.base,
            rate_bps: rule.rate_bps,
            amount_cents: amount.cents(),
            pay_status: PayStatus::Pending,
            pay_status_date: None,
            created_at: now,
            updated_at: now,
        };

        self.db.commissions().insert(&commission).await?;
        self.notifier.publish(ChangeEvent {
            entity: "commission",
            entity_id: commission.id.clone(),
            op: RowOp::Insert,
        });

        info!(
            sale_id = %sale.id,
            rule = %rule.name,
            amount = %commission.amount(),
            "Commission created"
        );
        Ok(Some(commission))
    }

    /// Processes every closed sale that lacks a commission.
    ///
    /// Sequential, partial-failure tolerant, reported in aggregate. An
    /// interrupted run leaves some sales unprocessed; re-running picks
    /// them up without duplicating anything.
    pub async fn process_all_closed_sales(&self) -> EngineResult<ProcessSummary> {
        let pending = self.db.sales().list_closed_without_commission().await?;
        info!(count = pending.len(), "Processing closed sales without commission");

        let mut summary = ProcessSummary::default();

        for sale in &pending {
            match self.create_commission_for_sale(&sale.id).await {
                Ok(Some(_)) => summary.processed += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!(sale_id = %sale.id, error = %e, "Commission processing failed for sale");
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Commission batch complete"
        );
        Ok(summary)
    }

    /// Applies an explicit pay-status edit. Admin only.
    ///
    /// Validates the transition, stamps/clears pay_status_date, persists,
    /// and notifies the seller on approval.
    pub async fn set_pay_status(
        &self,
        viewer: &Viewer,
        commission_id: &str,
        to: PayStatus,
    ) -> EngineResult<Commission> {
        if !viewer.sees_all_rows() {
            return Err(EngineError::AdminOnly);
        }

        let mut commission = self
            .db
            .commissions()
            .get_by_id(commission_id)
            .await?
            .ok_or_else(|| CoreError::CommissionNotFound(commission_id.to_string()))?;

        apply_pay_status(&mut commission, to, Utc::now())?;
        self.db.commissions().update_pay_status(&commission).await?;
        self.notifier.publish(ChangeEvent {
            entity: "commission",
            entity_id: commission.id.clone(),
            op: RowOp::Update,
        });

        if to == PayStatus::Approved {
            let body = format!("Commission of {} was approved", commission.amount());
            if let Err(e) = self
                .notifier
                .notify_user(
                    &commission.seller_id,
                    NotificationKind::CommissionApproved,
                    "Commission approved",
                    &body,
                )
                .await
            {
                warn!(commission_id = %commission.id, error = %e, "Approval notification failed");
            }
        }

        info!(commission_id = %commission.id, pay_status = ?to, "Pay status updated");
        Ok(commission)
    }

    /// Lists commissions visible to a viewer.
    pub async fn list_commissions(
        &self,
        viewer: &Viewer,
        limit: u32,
    ) -> EngineResult<Vec<Commission>> {
        Ok(self.db.commissions().list(viewer, limit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
