//! # CRM Entities
//!
//! Supporting entities around the pricing/commission core: people, leads,
//! the opportunity pipeline, field operations, goals, and notifications.
//! These are plain records with role-scoped visibility (a seller sees own
//! rows, an admin sees all). The scoping itself is expressed by [`Viewer`]
//! and applied at the data-access layer.
//!
//! Status fields are tagged enums validated at the boundary, never strings
//! trusted at point of use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::ServiceKind;

// =============================================================================
// Users & Row Scoping
// =============================================================================

/// Application role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full visibility, manages catalog, rules, users, and pay statuses.
    Admin,
    /// Sees and works own clients, sales, and commissions.
    Seller,
    /// Executes field service orders.
    Technician,
}

/// Lifecycle status of a user account. An invite is a user row that has
/// not been accepted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Invited,
    Active,
    Disabled,
}

/// A user account (or pending invite).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The identity a query runs as: user id + role.
///
/// Repositories take a `Viewer` for list operations and translate it into
/// row filters: admins see every row, sellers only rows they own. The
/// core never computes access itself; it only carries the capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: String,
    pub role: Role,
}

impl Viewer {
    /// Creates a viewer.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Viewer {
            user_id: user_id.into(),
            role,
        }
    }

    /// Admin viewers see all rows.
    #[inline]
    pub fn sees_all_rows(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

// =============================================================================
// Clients & Leads
// =============================================================================

/// Lead/client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Prospect not yet converted.
    Lead,
    /// Buying client.
    Active,
    /// No longer buying; kept for history.
    Inactive,
}

/// A client or lead, owned by the seller who works the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    /// Seller who owns the account; drives row scoping.
    pub owner_user_id: String,
    pub name: String,
    pub farm_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub status: ClientStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Opportunity Pipeline
// =============================================================================

/// Stage of a sales opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStage {
    New,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl OpportunityStage {
    /// Whether the opportunity has reached a terminal stage.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OpportunityStage::Won | OpportunityStage::Lost)
    }
}

/// A sales opportunity being worked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Opportunity {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub seller_id: String,
    pub title: String,
    pub stage: OpportunityStage,
    pub expected_value_cents: i64,
    pub expected_close_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Returns the expected value as Money.
    #[inline]
    pub fn expected_value(&self) -> Money {
        Money::from_cents(self.expected_value_cents)
    }
}

// =============================================================================
// Field Operations
// =============================================================================

/// Status shared by scheduled field activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Done,
    Canceled,
}

/// A seller's visit to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Visit {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub seller_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product demonstration at a client's farm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Demonstration {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub product_id: String,
    pub seller_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: ScheduleStatus,
    /// Recorded result once the demonstration is done.
    pub outcome: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A technician service order (maintenance, revision, spraying).
///
/// Service-based commission rules read `total_value_cents` of the order a
/// sale is linked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ServiceOrder {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub technician_id: String,
    pub kind: ServiceKind,
    pub total_value_cents: i64,
    pub status: ScheduleStatus,
    pub performed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOrder {
    /// Returns the order value as Money.
    #[inline]
    pub fn total_value(&self) -> Money {
        Money::from_cents(self.total_value_cents)
    }
}

// =============================================================================
// Goals
// =============================================================================

/// Metric a goal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    /// Sum of gross value of closed sales, in cents.
    Revenue,
    /// Sum of estimated profit of closed sales, in cents.
    Profit,
    /// Count of closed sales.
    SalesCount,
}

/// A per-seller target over a period.
///
/// `target_value` is cents for monetary metrics and a plain count for
/// SalesCount; progress is always derived from sales, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Goal {
    pub id: String,
    pub tenant_id: String,
    pub seller_id: String,
    pub metric: GoalMetric,
    pub target_value: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    SaleClosed,
    CommissionApproved,
    GoalReached,
    General,
}

/// A per-user notification. The unread badge is always re-derived by
/// counting unread rows, never maintained incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: String,
    pub tenant_id: String,
    /// Recipient.
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_scoping() {
        let admin = Viewer::new("u-admin", Role::Admin);
        assert!(admin.sees_all_rows());

        let seller = Viewer::new("u-seller", Role::Seller);
        assert!(!seller.sees_all_rows());

        let tech = Viewer::new("u-tech", Role::Technician);
        assert!(!tech.sees_all_rows());
    }

    #[test]
    fn test_opportunity_terminal_stages() {
        assert!(OpportunityStage::Won.is_terminal());
        assert!(OpportunityStage::Lost.is_terminal());
        assert!(!OpportunityStage::Negotiation.is_terminal());
        assert!(!OpportunityStage::New.is_terminal());
    }
}
