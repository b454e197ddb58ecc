//! Engine error type.
//!
//! Wraps core and database errors into the single error callers handle,
//! with a machine-readable code for programmatic branching and a
//! human-readable message for display. Every failure path in the engine
//! resolves to one of these; nothing here is fatal to the application.

use serde::Serialize;
use thiserror::Error;

use agrocrm_core::CoreError;
use agrocrm_db::DbError;

/// Error codes for engine responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,
    /// Input validation failed
    ValidationError,
    /// Database operation failed
    DatabaseError,
    /// Business rule violation (bad transition, overlap, discount cap)
    BusinessRule,
    /// Operation restricted to admins
    Forbidden,
    /// Anything else
    Internal,
}

/// Unified error returned by engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule or validation failure from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Entity lookup came up empty.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The viewer's role does not permit the operation.
    #[error("operation requires the admin role")]
    AdminOnly,
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            EngineError::Core(
                CoreError::ProductNotFound(_)
                | CoreError::ClientNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::CommissionNotFound(_)
                | CoreError::RuleNotFound(_),
            ) => ErrorCode::NotFound,
            EngineError::Core(_) => ErrorCode::BusinessRule,
            EngineError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            EngineError::Db(DbError::UniqueViolation { .. }) => ErrorCode::BusinessRule,
            EngineError::Db(_) => ErrorCode::DatabaseError,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::AdminOnly => ErrorCode::Forbidden,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
