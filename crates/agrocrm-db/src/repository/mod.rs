//! # Repository Module
//!
//! Database repository implementations for AgroCRM.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine service                                                        │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(&id)                                  │
//! │       │  db.commissions().exists_for_sale(&sale_id)                    │
//! │       ▼                                                                 │
//! │  Repository structs (one per aggregate)                                │
//! │       │                                                                 │
//! │       │  SQL query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place per aggregate                          │
//! │  • Services are testable against an in-memory database                 │
//! │  • Row scoping (Viewer) lives in exactly one layer                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD + price history
//! - [`sale::SaleRepository`] - Sales, line items, aggregates
//! - [`commission::CommissionRuleRepository`] - Rule configuration
//! - [`commission::CommissionRepository`] - Commissions per sale
//! - [`client::ClientRepository`] / [`client::OpportunityRepository`]
//! - [`field::VisitRepository`] / [`field::DemonstrationRepository`] /
//!   [`field::ServiceOrderRepository`]
//! - [`goal::GoalRepository`]
//! - [`notification::NotificationRepository`]
//! - [`user::UserRepository`]

pub mod client;
pub mod commission;
pub mod field;
pub mod goal;
pub mod notification;
pub mod product;
pub mod sale;
pub mod user;

#[cfg(test)]
pub(crate) mod testutil;
