//! # Error Types
//!
//! Domain-specific error types for agrocrm-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agrocrm-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  agrocrm-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  agrocrm-engine errors (separate crate)                                 │
//! │  └── EngineError      - What callers of the services see                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, field names)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are returned to
/// the caller, surfaced as a message, and never retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (wrong id or soft-deactivated).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Client cannot be found.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Commission cannot be found.
    #[error("Commission not found: {0}")]
    CommissionNotFound(String),

    /// Commission rule cannot be found.
    #[error("Commission rule not found: {0}")]
    RuleNotFound(String),

    /// A commission was requested for a sale that is not closed.
    #[error("Sale {sale_id} is {status}, not eligible for commission")]
    SaleNotCommissionable { sale_id: String, status: String },

    /// A service-based rule matched a sale with no usable service order.
    ///
    /// ## When This Occurs
    /// - The sale carries no service_id
    /// - The linked order is of a different kind than the rule's base
    #[error("Sale {sale_id} has no {kind} service order to base the commission on")]
    ServiceBaseUnavailable { sale_id: String, kind: String },

    /// A pay-status edit outside the allowed state machine.
    #[error("Pay status cannot move from {from} to {to}")]
    InvalidPayTransition { from: String, to: String },

    /// A seller granted more discount than the product allows.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale form: discount 15% on "NPK 20-05-20"
    ///      │
    ///      ▼
    /// max_discount for product is 10%
    ///      │
    ///      ▼
    /// DiscountExceedsMax → inline message, sale not submitted
    /// ```
    #[error("Discount {requested_bps}bps on {product} exceeds maximum {max_bps}bps")]
    DiscountExceedsMax {
        product: String,
        requested_bps: u32,
        max_bps: u32,
    },

    /// An active rule already covers the same scope target.
    ///
    /// Overlapping active rules at one precedence level are rejected at
    /// write time so resolution never has to guess between them.
    #[error("An active {scope} rule already exists for '{target}'")]
    OverlappingRule { scope: String, target: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs; the operation is
/// not attempted when one is raised.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate user email).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DiscountExceedsMax {
            product: "NPK 20-05-20".to_string(),
            requested_bps: 1500,
            max_bps: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Discount 1500bps on NPK 20-05-20 exceeds maximum 1000bps"
        );

        let err = CoreError::ServiceBaseUnavailable {
            sale_id: "s-1".to_string(),
            kind: "Spraying".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sale s-1 has no Spraying service order to base the commission on"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: 10000,
        };
        assert_eq!(err.to_string(), "rate must be between 0 and 10000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
