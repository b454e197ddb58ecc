//! # Pricing Engine
//!
//! Derives sell prices from cost, target margin, and tax, and classifies
//! cost/price changes for the append-only audit trail.
//!
//! ## The Gross-Up Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price = cost / (1 - (margin + tax) / 100)                              │
//! │                                                                         │
//! │  cost = 100.00, margin = 20%, tax = 10%                                 │
//! │  price = 100.00 / (1 - 0.30) = 142.86                                   │
//! │                                                                         │
//! │  The margin is a share of the PRICE, not a markup on cost: selling at  │
//! │  142.86 leaves 20% of the price as profit after the 10% tax share.     │
//! │                                                                         │
//! │  FALLBACK: margin + tax ≥ 100% would divide by zero or invert the      │
//! │  price, so the function returns cost unchanged. No panic, no           │
//! │  negative, no infinity.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mode Toggle
//! ```text
//! pricing_mode = calculated ──► price recomputed on every cost/margin/tax
//! │                             change (each edit re-derives from the
//! │                             other two)
//! ▼
//! pricing_mode = manual ──────► price is a free operator input; the
//!                               formula is not applied
//!
//! manual ──► calculated: price immediately re-derived from current
//! cost/margin/tax, so the toggle round-trips losslessly.
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Percent, PriceChangeType, PricingMode, Product, SaleItem};

// =============================================================================
// Price Derivation
// =============================================================================

/// Derives the sell price from cost, target margin, and tax share.
///
/// ## Guarantees
/// - Pure and deterministic, no side effects.
/// - For margin + tax < 100% and cost ≥ 0: result ≥ cost, finite,
///   rounded half-up at the cent.
/// - For margin + tax ≥ 100%: returns `cost` unchanged (documented
///   fallback, keeps the operation total).
///
/// ## Example
/// ```rust
/// use agrocrm_core::money::Money;
/// use agrocrm_core::pricing::derive_price;
/// use agrocrm_core::types::Percent;
///
/// let cost = Money::from_cents(10_000); // 100.00
/// let price = derive_price(cost, Percent::from_bps(2000), Percent::from_bps(1000));
/// assert_eq!(price.cents(), 14_286); // 142.86
/// ```
pub fn derive_price(cost: Money, margin: Percent, tax: Percent) -> Money {
    let combined = margin.saturating_add(tax);

    // Fallback: a combined share at or past 100% has no meaningful
    // gross-up. Also pass negative costs through untouched; validation
    // rejects them before they get here.
    if combined.bps() >= Percent::ONE_HUNDRED_BPS || cost.is_negative() {
        return cost;
    }

    // price = cost * 10000 / (10000 - combined_bps), half-up at the cent.
    // i128 intermediate prevents overflow for any representable cost.
    let denominator = (Percent::ONE_HUNDRED_BPS - combined.bps()) as i128;
    let numerator = cost.cents() as i128 * Percent::ONE_HUNDRED_BPS as i128;
    let cents = (numerator + denominator / 2) / denominator;

    Money::from_cents(cents as i64)
}

/// Returns the price a product should carry given its pricing mode.
///
/// Calculated mode derives from cost/margin/tax; manual mode keeps the
/// operator-supplied price untouched. This is the single decision point
/// the save flow calls, so the mode-toggle round-trip property holds by
/// construction.
pub fn effective_price(
    mode: PricingMode,
    cost: Money,
    margin: Percent,
    tax: Percent,
    manual_price: Money,
) -> Money {
    match mode {
        PricingMode::Calculated => derive_price(cost, margin, tax),
        PricingMode::Manual => manual_price,
    }
}

// =============================================================================
// Change Classification
// =============================================================================

/// A classified cost/price change, ready to be written as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub change_type: PriceChangeType,
    pub old_cost: Money,
    pub new_cost: Money,
    pub old_price: Money,
    pub new_price: Money,
}

/// Compares before/after cost and price and classifies the change.
///
/// Returns `None` when neither changed; the caller writes no history
/// entry in that case (idempotent no-op). This is the gate that keeps the
/// audit trail free of vacuous entries when a product is saved with only
/// its name or stock touched.
pub fn diff_price_change(before: &Product, after: &Product) -> Option<PriceChange> {
    classify_change(
        Money::from_cents(before.cost_cents),
        Money::from_cents(after.cost_cents),
        Money::from_cents(before.price_cents),
        Money::from_cents(after.price_cents),
    )
}

/// Raw-value variant of [`diff_price_change`] for flows that have no
/// `before` product yet (creation treats the baseline as zero).
pub fn classify_change(
    old_cost: Money,
    new_cost: Money,
    old_price: Money,
    new_price: Money,
) -> Option<PriceChange> {
    let cost_changed = old_cost != new_cost;
    let price_changed = old_price != new_price;

    let change_type = match (cost_changed, price_changed) {
        (false, false) => return None,
        (true, false) => PriceChangeType::Cost,
        (false, true) => PriceChangeType::Price,
        (true, true) => PriceChangeType::Both,
    };

    Some(PriceChange {
        change_type,
        old_cost,
        new_cost,
        old_price,
        new_price,
    })
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Totals derived from a sale's line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    /// Σ line (price × qty × (1 − discount)).
    pub gross_value: Money,
    /// Σ line (cost × qty).
    pub total_cost: Money,
    /// gross − cost.
    pub estimated_profit: Money,
}

/// Net line total: unit price × quantity, minus the per-line discount.
pub fn line_total(unit_price: Money, quantity: i64, discount: Percent) -> Money {
    unit_price.multiply_quantity(quantity).apply_discount(discount)
}

/// Line cost: unit cost × quantity. No discount applies to cost.
pub fn line_cost(unit_cost: Money, quantity: i64) -> Money {
    unit_cost.multiply_quantity(quantity)
}

/// Sums stored line snapshots into sale totals.
///
/// Works from the frozen `line_total_cents`/`line_cost_cents`, so a
/// recalculation reproduces the creation-time figures. Product cost
/// changes after the sale do not leak in.
pub fn sale_totals(items: &[SaleItem]) -> SaleTotals {
    let mut gross = Money::zero();
    let mut cost = Money::zero();

    for item in items {
        gross += item.line_total();
        cost += item.line_cost();
    }

    SaleTotals {
        gross_value: gross,
        total_cost: cost,
        estimated_profit: gross - cost,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(cost_cents: i64, price_cents: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            tenant_id: "t-1".to_string(),
            name: "Soybean seed 40kg".to_string(),
            category: "seeds".to_string(),
            description: None,
            cost_cents,
            price_cents,
            pricing_mode: PricingMode::Calculated,
            margin_bps: 2000,
            tax_bps: 1000,
            stock: 10,
            low_stock_threshold: 2,
            max_discount_bps: 500,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_derive_price_reference_case() {
        // cost 100.00, margin 20%, tax 10% → 100 / 0.70 = 142.86
        let price = derive_price(
            Money::from_cents(10_000),
            Percent::from_bps(2000),
            Percent::from_bps(1000),
        );
        assert_eq!(price.cents(), 14_286);
    }

    #[test]
    fn test_derive_price_margin_edit() {
        // margin 20% → 30% with tax 10%: 100 / 0.60 = 166.67
        let price = derive_price(
            Money::from_cents(10_000),
            Percent::from_bps(3000),
            Percent::from_bps(1000),
        );
        assert_eq!(price.cents(), 16_667);
    }

    #[test]
    fn test_derive_price_is_at_least_cost() {
        let costs = [0i64, 1, 99, 10_000, 123_456_789];
        let rates = [0u32, 1, 500, 2000, 4999, 9999];

        for &cost in &costs {
            for &margin in &rates {
                for &tax in &rates {
                    if margin + tax >= 10_000 {
                        continue;
                    }
                    let price = derive_price(
                        Money::from_cents(cost),
                        Percent::from_bps(margin),
                        Percent::from_bps(tax),
                    );
                    assert!(
                        price.cents() >= cost,
                        "price {} < cost {} at margin {} tax {}",
                        price.cents(),
                        cost,
                        margin,
                        tax
                    );
                }
            }
        }
    }

    #[test]
    fn test_derive_price_fallback_at_or_past_one_hundred() {
        let cost = Money::from_cents(10_000);

        // Exactly 100%
        assert_eq!(
            derive_price(cost, Percent::from_bps(5000), Percent::from_bps(5000)),
            cost
        );
        // Past 100%
        assert_eq!(
            derive_price(cost, Percent::from_bps(9000), Percent::from_bps(3000)),
            cost
        );
        // Saturating inputs
        assert_eq!(
            derive_price(cost, Percent::from_bps(u32::MAX), Percent::from_bps(u32::MAX)),
            cost
        );
    }

    #[test]
    fn test_derive_price_zero_rates_is_identity() {
        let cost = Money::from_cents(4_550);
        assert_eq!(derive_price(cost, Percent::zero(), Percent::zero()), cost);
    }

    #[test]
    fn test_effective_price_mode_toggle_round_trip() {
        let cost = Money::from_cents(10_000);
        let margin = Percent::from_bps(2000);
        let tax = Percent::from_bps(1000);

        let calculated = effective_price(PricingMode::Calculated, cost, margin, tax, Money::zero());

        // Switch to manual: whatever the operator typed wins
        let manual = effective_price(PricingMode::Manual, cost, margin, tax, calculated);
        assert_eq!(manual, calculated);

        // Switch back to calculated with unchanged cost/margin/tax:
        // same price as before the toggle
        let back = effective_price(PricingMode::Calculated, cost, margin, tax, manual);
        assert_eq!(back, calculated);
    }

    #[test]
    fn test_diff_no_change_is_none() {
        let before = product(10_000, 14_286);
        let after = product(10_000, 14_286);
        assert_eq!(diff_price_change(&before, &after), None);
    }

    #[test]
    fn test_diff_cost_only() {
        let before = product(10_000, 14_286);
        let after = product(11_000, 14_286);

        let change = diff_price_change(&before, &after).unwrap();
        assert_eq!(change.change_type, PriceChangeType::Cost);
        assert_eq!(change.old_cost.cents(), 10_000);
        assert_eq!(change.new_cost.cents(), 11_000);
    }

    #[test]
    fn test_diff_price_only() {
        let before = product(10_000, 14_286);
        let after = product(10_000, 16_667);

        let change = diff_price_change(&before, &after).unwrap();
        assert_eq!(change.change_type, PriceChangeType::Price);
        assert_eq!(change.old_price.cents(), 14_286);
        assert_eq!(change.new_price.cents(), 16_667);
    }

    #[test]
    fn test_diff_both() {
        let before = product(10_000, 14_286);
        let after = product(12_000, 17_143);

        let change = diff_price_change(&before, &after).unwrap();
        assert_eq!(change.change_type, PriceChangeType::Both);
    }

    #[test]
    fn test_line_total_with_discount() {
        // 45.50 × 3 = 136.50, minus 10% = 122.85
        let total = line_total(Money::from_cents(4_550), 3, Percent::from_bps(1000));
        assert_eq!(total.cents(), 12_285);
    }

    #[test]
    fn test_sale_totals() {
        let now = Utc::now();
        let item = |price: i64, cost: i64, qty: i64, discount: u32| {
            let total = line_total(Money::from_cents(price), qty, Percent::from_bps(discount));
            let lcost = line_cost(Money::from_cents(cost), qty);
            SaleItem {
                id: "i".to_string(),
                sale_id: "s".to_string(),
                product_id: "p".to_string(),
                name_snapshot: "x".to_string(),
                category_snapshot: "seeds".to_string(),
                unit_price_cents: price,
                unit_cost_cents: cost,
                quantity: qty,
                discount_bps: discount,
                line_total_cents: total.cents(),
                line_cost_cents: lcost.cents(),
                created_at: now,
            }
        };

        let items = vec![
            item(14_286, 10_000, 2, 0),    // 285.72 gross, 200.00 cost
            item(5_000, 4_000, 1, 1000),   // 45.00 gross, 40.00 cost
        ];

        let totals = sale_totals(&items);
        assert_eq!(totals.gross_value.cents(), 33_072);
        assert_eq!(totals.total_cost.cents(), 24_000);
        assert_eq!(totals.estimated_profit.cents(), 9_072);
    }

    #[test]
    fn test_sale_totals_empty() {
        let totals = sale_totals(&[]);
        assert!(totals.gross_value.is_zero());
        assert!(totals.total_cost.is_zero());
        assert!(totals.estimated_profit.is_zero());
    }
}
