//! # Domain Types
//!
//! Core domain types for the catalog, sales, and commission subsystems.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   Commission    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  cost_cents     │   │  gross_value    │   │  sale_id (FK)   │       │
//! │  │  price_cents    │   │  total_cost     │   │  rate_bps       │       │
//! │  │  pricing_mode   │   │  est. profit    │   │  pay_status     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │ CommissionRule  │   │ PriceHistory    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  scope (sum)    │   │  append-only    │       │
//! │  │  500 = 5%       │   │  base, rate     │   │  audit trail    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID v4 `id` (immutable, used for relations) and a
//! human-facing field (product name, client name) that may change freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 500 bps = 5% (a typical commission rate)
/// 2000 bps = 20% (a typical target margin)
///
/// Storing rates as integers keeps all derived arithmetic exact until the
/// single rounding point in [`Money::apply_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Percent(u32);

impl Percent {
    /// One hundred percent, in basis points.
    pub const ONE_HUNDRED_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a display value (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Sum of two percentages, saturating at u32::MAX.
    ///
    /// Used to combine margin + tax before the gross-up check; saturation
    /// keeps the ≥100% fallback path well-defined for absurd inputs.
    #[inline]
    pub const fn saturating_add(self, other: Percent) -> Percent {
        Percent(self.0.saturating_add(other.0))
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

// =============================================================================
// Pricing Mode
// =============================================================================

/// How a product's sell price is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Price is operator-entered and unconstrained relative to cost.
    Manual,
    /// Price is derived from cost, margin, and tax (see pricing module).
    Calculated,
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Manual
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product (seed, fertilizer, crop protection, equipment...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Display name shown in the catalog and on sale lines.
    pub name: String,

    /// Category the product belongs to (free-form, admin-defined).
    /// Category-scoped commission rules match on this value.
    pub category: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Acquisition cost in cents.
    pub cost_cents: i64,

    /// Sell price in cents. Derived when pricing_mode = Calculated.
    pub price_cents: i64,

    /// Whether price is operator-entered or formula-derived.
    pub pricing_mode: PricingMode,

    /// Target profit margin in basis points (2000 = 20%).
    pub margin_bps: u32,

    /// Tax share in basis points (1000 = 10%).
    pub tax_bps: u32,

    /// Current stock level, in sale units.
    pub stock: i64,

    /// Stock level at or below which a low-stock alert is raised.
    pub low_stock_threshold: i64,

    /// Maximum per-line discount a seller may grant, in basis points.
    pub max_discount_bps: u32,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the target margin.
    #[inline]
    pub fn margin(&self) -> Percent {
        Percent::from_bps(self.margin_bps)
    }

    /// Returns the tax share.
    #[inline]
    pub fn tax(&self) -> Percent {
        Percent::from_bps(self.tax_bps)
    }

    /// Returns the maximum discount a seller may grant on this product.
    #[inline]
    pub fn max_discount(&self) -> Percent {
        Percent::from_bps(self.max_discount_bps)
    }

    /// Whether the current stock level is at or below the alert threshold.
    #[inline]
    pub fn is_low_on_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

// =============================================================================
// Price History
// =============================================================================

/// What changed in a price history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PriceChangeType {
    /// Only the cost changed.
    Cost,
    /// Only the sell price changed.
    Price,
    /// Cost and sell price both changed.
    Both,
}

/// Immutable snapshot of a product's cost/price change.
///
/// Append-only: created once per product edit that touches cost or price,
/// never mutated or deleted. The margin/tax captured are the values in
/// effect at save time, regardless of pricing mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriceHistoryEntry {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub change_type: PriceChangeType,
    pub old_cost_cents: i64,
    pub new_cost_cents: i64,
    pub old_price_cents: i64,
    pub new_price_cents: i64,
    /// Margin in effect at save time.
    pub margin_bps: u32,
    /// Tax share in effect at save time.
    pub tax_bps: u32,
    /// User who performed the edit, when known.
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Sales enter the system already closed (the pipeline lives in
/// Opportunity); cancellation is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is finalized and eligible for commission.
    Closed,
    /// Sale was canceled after the fact.
    Canceled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Closed
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A closed (or canceled) sale.
///
/// `estimated_profit_cents` is computed once at creation from line items
/// and is NOT recomputed when product costs change later. The sale is a
/// snapshot of what was sold at the prices and costs of that day. The
/// explicit recalc operation re-derives totals from the stored line
/// snapshots on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub seller_id: String,
    /// Linked service order, when the sale originates from field service.
    /// Required for service-based commission rules.
    pub service_id: Option<String>,
    pub status: SaleStatus,
    /// Pre-cost revenue: Σ line (price × qty × (1 − discount)).
    pub gross_value_cents: i64,
    /// Σ line (cost × qty).
    pub total_cost_cents: i64,
    /// gross_value − total_cost, snapshot at creation.
    pub estimated_profit_cents: i64,
    pub payment_received: bool,
    pub sold_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the gross value as Money.
    #[inline]
    pub fn gross_value(&self) -> Money {
        Money::from_cents(self.gross_value_cents)
    }

    /// Returns the total cost as Money.
    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    /// Returns the estimated profit as Money.
    #[inline]
    pub fn estimated_profit(&self) -> Money {
        Money::from_cents(self.estimated_profit_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Product category at time of sale (frozen); commission resolution
    /// for historical sales matches on this, not the live category.
    pub category_snapshot: String,
    /// Unit sell price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Unit cost in cents at time of sale (frozen).
    pub unit_cost_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Per-line discount granted, in basis points.
    pub discount_bps: u32,
    /// price × qty × (1 − discount), rounded at the cent.
    pub line_total_cents: i64,
    /// cost × qty.
    pub line_cost_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Returns the line cost as Money.
    #[inline]
    pub fn line_cost(&self) -> Money {
        Money::from_cents(self.line_cost_cents)
    }
}

// =============================================================================
// Commission Rules
// =============================================================================

/// Kind of field service a technician performs.
///
/// Service-based commission rules pay a percentage of the linked service
/// order's total value instead of the sale's gross or profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Maintenance,
    Revision,
    Spraying,
}

/// Which monetary figure a commission rate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CommissionBase {
    /// Pre-cost sale revenue.
    Gross,
    /// Estimated profit (gross − cost).
    Profit,
    /// Linked maintenance service order value.
    Maintenance,
    /// Linked revision service order value.
    Revision,
    /// Linked spraying service order value.
    Spraying,
}

impl CommissionBase {
    /// Returns the service kind this base reads from, if service-linked.
    pub const fn service_kind(&self) -> Option<ServiceKind> {
        match self {
            CommissionBase::Maintenance => Some(ServiceKind::Maintenance),
            CommissionBase::Revision => Some(ServiceKind::Revision),
            CommissionBase::Spraying => Some(ServiceKind::Spraying),
            CommissionBase::Gross | CommissionBase::Profit => None,
        }
    }
}

/// The specificity level a commission rule applies at.
///
/// Modelled as a sum type so an inconsistent row (e.g. scope = category
/// with no category value) cannot exist past the data-access boundary.
/// Resolution precedence is Product > Category > General.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Applies to any sale.
    General,
    /// Applies to sales containing a product of this category.
    Category(String),
    /// Applies to sales containing this specific product.
    Product(String),
}

impl RuleScope {
    /// Stable label used for storage and logging.
    pub const fn label(&self) -> &'static str {
        match self {
            RuleScope::General => "general",
            RuleScope::Category(_) => "category",
            RuleScope::Product(_) => "product",
        }
    }

    /// The scope target (category name or product id), if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            RuleScope::General => None,
            RuleScope::Category(c) => Some(c),
            RuleScope::Product(p) => Some(p),
        }
    }
}

/// A commission rule configured by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: String,
    pub tenant_id: String,
    /// Human-facing label ("Spring seeds push", "Default 2%").
    pub name: String,
    pub base: CommissionBase,
    /// Rate in basis points (500 = 5%).
    pub rate_bps: u32,
    pub scope: RuleScope,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionRule {
    /// Returns the rate.
    #[inline]
    pub fn rate(&self) -> Percent {
        Percent::from_bps(self.rate_bps)
    }
}

// =============================================================================
// Commission
// =============================================================================

/// Payment status of a commission.
///
/// ## State Machine
/// ```text
/// pending ──► approved ──► paid ──► canceled
///    │            │                    ▲
///    │            └──► pending         │
///    └─────────────────────────────────┘
///
/// paid / canceled stamp pay_status_date; back to pending clears it.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PayStatus {
    Pending,
    Approved,
    Paid,
    Canceled,
}

impl PayStatus {
    /// Whether an explicit admin edit may move this status to `to`.
    ///
    /// Allowed: pending → approved → paid, pending → canceled,
    /// paid → canceled, and approved → pending as the correction path.
    /// Canceled is terminal. Self-transitions are not edits.
    pub const fn can_transition_to(self, to: PayStatus) -> bool {
        matches!(
            (self, to),
            (PayStatus::Pending, PayStatus::Approved)
                | (PayStatus::Pending, PayStatus::Canceled)
                | (PayStatus::Approved, PayStatus::Paid)
                | (PayStatus::Approved, PayStatus::Pending)
                | (PayStatus::Paid, PayStatus::Canceled)
        )
    }

    /// Whether entering this status stamps pay_status_date.
    pub const fn stamps_date(self) -> bool {
        matches!(self, PayStatus::Paid | PayStatus::Canceled)
    }
}

impl Default for PayStatus {
    fn default() -> Self {
        PayStatus::Pending
    }
}

/// A commission attached to a closed sale. At most one per sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Commission {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub seller_id: String,
    /// Base the amount was computed from (frozen at creation).
    pub base: CommissionBase,
    /// Rate applied, in basis points (frozen at creation).
    pub rate_bps: u32,
    pub amount_cents: i64,
    pub pay_status: PayStatus,
    /// Stamped when pay_status becomes paid or canceled; cleared when it
    /// moves back to pending.
    pub pay_status_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commission {
    /// Returns the commission amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
