//! # agrocrm-db: Database Layer for AgroCRM
//!
//! This crate provides database access for AgroCRM.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AgroCRM Data Flow                                │
//! │                                                                         │
//! │  Engine service (save_product, process_commissions, ...)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    agrocrm-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs,  │    │  (embedded)  │  │   │
//! │  │   │               │    │  sale.rs ...) │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ WAL + FK on   │    │ SaleRepo ...  │    │ 002_idx.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: in tests)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (one per aggregate)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agrocrm_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./agrocrm.db")).await?;
//!
//! let catalog = db.products().list_active(100).await?;
//! let unread = db.notifications().unread_count(&user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::{ClientRepository, OpportunityRepository};
pub use repository::commission::{CommissionRepository, CommissionRuleRepository};
pub use repository::field::{DemonstrationRepository, ServiceOrderRepository, VisitRepository};
pub use repository::goal::GoalRepository;
pub use repository::notification::NotificationRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{ClosedSalesAggregate, SaleRepository};
pub use repository::user::UserRepository;
