//! # agrocrm-core: Pure Business Logic for AgroCRM
//!
//! This crate is the **heart** of AgroCRM. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AgroCRM Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 agrocrm-engine (Services)                       │   │
//! │  │   save product, close sale, process commissions, notify         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agrocrm-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │commission │  │   │
//! │  │   │  Product  │  │   Money   │  │ derive_   │  │ resolve_  │  │   │
//! │  │   │   Sale    │  │  Percent  │  │  price    │  │   rule    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   agrocrm-db (Database Layer)                   │   │
//! │  │             SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog/sales/commission domain types
//! - [`crm`] - Supporting CRM entities (clients, pipeline, goals, alerts)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Price derivation and change classification
//! - [`commission`] - Rule resolution and amount computation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64), all rates
//!    in basis points (u32), to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use agrocrm_core::money::Money;
//! use agrocrm_core::pricing::derive_price;
//! use agrocrm_core::types::Percent;
//!
//! // cost 100.00, margin 20%, tax 10%
//! let price = derive_price(
//!     Money::from_cents(10_000),
//!     Percent::from_bps(2000),
//!     Percent::from_bps(1000),
//! );
//!
//! // 100 / (1 - 0.30) = 142.86
//! assert_eq!(price.cents(), 14_286);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod crm;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use agrocrm_core::Money` instead of
// `use agrocrm_core::money::Money`

pub use crm::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID for single-tenant deployments.
///
/// ## Why a constant?
/// The schema carries tenant_id on every table so a hosted multi-tenant
/// deployment needs no migration; standalone installs run under this
/// fixed tenant until dynamic tenant resolution lands.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum quantity on a single sale line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum lines allowed on a single sale.
///
/// ## Business Reason
/// Keeps transaction sizes reasonable; a real order book never gets close.
pub const MAX_SALE_LINES: usize = 200;
