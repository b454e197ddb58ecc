//! # Commission Resolver
//!
//! Determines which commission rule applies to a closed sale and computes
//! the commission amount from the rule's base and rate.
//!
//! ## Resolution Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Rule Resolution (highest wins)                         │
//! │                                                                         │
//! │  1. PRODUCT scope   rule targets a product present in the sale's lines │
//! │          │                                                              │
//! │          ▼ no match                                                     │
//! │  2. CATEGORY scope  rule targets a line product's category             │
//! │          │                                                              │
//! │          ▼ no match                                                     │
//! │  3. GENERAL scope   rule applies to any sale                           │
//! │          │                                                              │
//! │          ▼ no match                                                     │
//! │  None: no commission is created for the sale                           │
//! │                                                                         │
//! │  Only active rules participate. Ties inside one level resolve to the   │
//! │  most recently created rule; the write path rejects overlapping       │
//! │  active rules so ties are a legacy-data case, not a normal one.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    Commission, CommissionBase, CommissionRule, PayStatus, RuleScope, Sale, SaleItem, SaleStatus,
};
use crate::crm::ServiceOrder;

// =============================================================================
// Resolution Input
// =============================================================================

/// The projection of a sale line the resolver needs: which product was
/// sold and what category it belonged to at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldProduct {
    pub product_id: String,
    pub category: String,
}

impl From<&SaleItem> for SoldProduct {
    fn from(item: &SaleItem) -> Self {
        SoldProduct {
            product_id: item.product_id.clone(),
            category: item.category_snapshot.clone(),
        }
    }
}

// =============================================================================
// Rule Resolution
// =============================================================================

/// Picks the applicable rule for a sale, or `None` when no active rule
/// matches at any precedence level (no commission is created then).
///
/// Pure over its inputs: the caller fetches the candidate rules (already
/// scoped to the tenant by the data layer) and the sale's line
/// projections.
pub fn resolve_rule<'a>(
    lines: &[SoldProduct],
    candidates: &'a [CommissionRule],
) -> Option<&'a CommissionRule> {
    // Most recently created wins inside a level. Write-time overlap
    // rejection makes this a deterministic backstop, not a policy.
    fn most_recent<'a>(
        iter: impl Iterator<Item = &'a CommissionRule>,
    ) -> Option<&'a CommissionRule> {
        iter.max_by_key(|r| (r.created_at, r.id.clone()))
    }

    let active = || candidates.iter().filter(|r| r.is_active);

    // Level 1: product-scoped
    if let Some(rule) = most_recent(active().filter(|r| match &r.scope {
        RuleScope::Product(pid) => lines.iter().any(|l| &l.product_id == pid),
        _ => false,
    })) {
        return Some(rule);
    }

    // Level 2: category-scoped
    if let Some(rule) = most_recent(active().filter(|r| match &r.scope {
        RuleScope::Category(cat) => lines.iter().any(|l| &l.category == cat),
        _ => false,
    })) {
        return Some(rule);
    }

    // Level 3: general
    most_recent(active().filter(|r| r.scope == RuleScope::General))
}

// =============================================================================
// Amount Computation
// =============================================================================

/// Computes the commission amount for a sale under a rule.
///
/// - base `gross` → gross_value × rate
/// - base `profit` → estimated_profit × rate
/// - service bases → linked service order's total value × rate; the sale
///   must carry a service order of the matching kind or the computation
///   fails (the batch treats that as a per-item failure, not a halt).
///
/// Amounts are ≥ 0 whenever the inputs are ≥ 0; rates are whole
/// percentages stored as basis points.
pub fn compute_commission(
    sale: &Sale,
    rule: &CommissionRule,
    service: Option<&ServiceOrder>,
) -> CoreResult<Money> {
    if sale.status != SaleStatus::Closed {
        return Err(CoreError::SaleNotCommissionable {
            sale_id: sale.id.clone(),
            status: format!("{:?}", sale.status),
        });
    }

    let base_amount = if let Some(kind) = rule.base.service_kind() {
        match service {
            Some(order) if order.kind == kind => order.total_value(),
            _ => {
                return Err(CoreError::ServiceBaseUnavailable {
                    sale_id: sale.id.clone(),
                    kind: format!("{:?}", kind),
                })
            }
        }
    } else if rule.base == CommissionBase::Profit {
        sale.estimated_profit()
    } else {
        sale.gross_value()
    };

    Ok(base_amount.apply_rate(rule.rate()))
}

// =============================================================================
// Pay-Status Administration
// =============================================================================

/// Applies an explicit pay-status edit to a commission.
///
/// Validates the transition against the state machine, then stamps
/// `pay_status_date` on paid/canceled and clears it when moving back to
/// pending. The caller persists the mutated commission.
pub fn apply_pay_status(
    commission: &mut Commission,
    to: PayStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let from = commission.pay_status;

    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidPayTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        });
    }

    commission.pay_status = to;
    commission.pay_status_date = if to.stamps_date() {
        Some(now)
    } else if to == PayStatus::Pending {
        None
    } else {
        commission.pay_status_date
    };
    commission.updated_at = now;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
