//! # Commission Repositories
//!
//! Database operations for commission rules and commissions.
//!
//! ## Scope Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             RuleScope (domain)  ↔  commission_rules (storage)           │
//! │                                                                         │
//! │  RuleScope::General          scope='general',  category=NULL, pid=NULL │
//! │  RuleScope::Category("x")    scope='category', category='x',  pid=NULL │
//! │  RuleScope::Product("p-1")   scope='product',  category=NULL, pid='p-1'│
//! │                                                                         │
//! │  Decoding validates the combination and fails with CorruptRow on an    │
//! │  inconsistent row. Scope is a sum type past this boundary, never a     │
//! │  string + two nullable columns the caller has to cross-check.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Uniqueness Guards
//! - `commissions.sale_id` is unique: at most one commission per sale.
//! - One ACTIVE rule per exact scope target (partial index): overlap is
//!   rejected at write time so resolution never guesses.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{Commission, CommissionBase, CommissionRule, RuleScope, Viewer};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw commission_rules row; converted into [`CommissionRule`] at the
/// boundary so inconsistent scope combinations cannot escape this module.
#[derive(Debug, sqlx::FromRow)]
struct CommissionRuleRow {
    id: String,
    tenant_id: String,
    name: String,
    base: CommissionBase,
    rate_bps: u32,
    scope: String,
    category: Option<String>,
    product_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CommissionRuleRow> for CommissionRule {
    type Error = DbError;

    fn try_from(row: CommissionRuleRow) -> Result<Self, Self::Error> {
        let scope = match (row.scope.as_str(), row.category, row.product_id) {
            ("general", None, None) => RuleScope::General,
            ("category", Some(category), None) => RuleScope::Category(category),
            ("product", None, Some(product_id)) => RuleScope::Product(product_id),
            (scope, category, product_id) => {
                return Err(DbError::corrupt_row(
                    "CommissionRule",
                    &row.id,
                    format!(
                        "scope '{}' with category={:?} product_id={:?}",
                        scope, category, product_id
                    ),
                ))
            }
        };

        Ok(CommissionRule {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            base: row.base,
            rate_bps: row.rate_bps,
            scope,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RULE_COLUMNS: &str = "\
    id, tenant_id, name, base, rate_bps, scope, category, product_id, \
    is_active, created_at, updated_at";

// =============================================================================
// Commission Rule Repository
// =============================================================================

/// Repository for commission rule configuration.
#[derive(Debug, Clone)]
pub struct CommissionRuleRepository {
    pool: SqlitePool,
}

impl CommissionRuleRepository {
    /// Creates a new CommissionRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRuleRepository { pool }
    }

    /// Inserts a rule.
    ///
    /// The partial unique index on active rows rejects a second active
    /// rule for the same scope target; callers surface that as an
    /// overlapping-rule error.
    pub async fn insert(&self, rule: &CommissionRule) -> DbResult<()> {
        debug!(id = %rule.id, scope = rule.scope.label(), "Inserting commission rule");

        let (category, product_id) = scope_columns(&rule.scope);

        sqlx::query(
            r#"
            INSERT INTO commission_rules (
                id, tenant_id, name, base, rate_bps,
                scope, category, product_id, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11
            )
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.tenant_id)
        .bind(&rule.name)
        .bind(rule.base)
        .bind(rule.rate_bps)
        .bind(rule.scope.label())
        .bind(category)
        .bind(product_id)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a rule by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CommissionRule>> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM commission_rules WHERE id = ?1");
        let row = sqlx::query_as::<_, CommissionRuleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CommissionRule::try_from).transpose()
    }

    /// Lists all rules of a tenant (admin configuration view).
    pub async fn list_all(&self, tenant_id: &str) -> DbResult<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM commission_rules \
             WHERE tenant_id = ?1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, CommissionRuleRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CommissionRule::try_from).collect()
    }

    /// Lists active rules of a tenant (the resolver candidate set).
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM commission_rules \
             WHERE tenant_id = ?1 AND is_active = 1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, CommissionRuleRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CommissionRule::try_from).collect()
    }

    /// Finds an active rule with the same scope target, if any.
    ///
    /// The write path calls this to reject overlap with a typed error
    /// before the unique index would.
    pub async fn find_active_conflict(
        &self,
        tenant_id: &str,
        scope: &RuleScope,
    ) -> DbResult<Option<CommissionRule>> {
        let (category, product_id) = scope_columns(scope);

        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM commission_rules \
             WHERE tenant_id = ?1 AND is_active = 1 AND scope = ?2 \
               AND COALESCE(category, '') = COALESCE(?3, '') \
               AND COALESCE(product_id, '') = COALESCE(?4, '')"
        );
        let row = sqlx::query_as::<_, CommissionRuleRow>(&sql)
            .bind(tenant_id)
            .bind(scope.label())
            .bind(category)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CommissionRule::try_from).transpose()
    }

    /// Activates or deactivates a rule.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = active, "Toggling commission rule");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE commission_rules
            SET is_active = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CommissionRule", id));
        }

        Ok(())
    }
}

/// Splits a scope into its storage columns (category, product_id).
fn scope_columns(scope: &RuleScope) -> (Option<&str>, Option<&str>) {
    match scope {
        RuleScope::General => (None, None),
        RuleScope::Category(category) => (Some(category.as_str()), None),
        RuleScope::Product(product_id) => (None, Some(product_id.as_str())),
    }
}

// =============================================================================
// Commission Repository
// =============================================================================

const COMMISSION_COLUMNS: &str = "\
    id, tenant_id, sale_id, seller_id, base, rate_bps, amount_cents, \
    pay_status, pay_status_date, created_at, updated_at";

/// Repository for commissions attached to sales.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    /// Creates a new CommissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    /// Inserts a commission.
    ///
    /// The unique index on sale_id turns a double-create into
    /// `DbError::UniqueViolation`. The skip-if-exists check in the engine
    /// makes that path unreachable in practice, the index makes it safe
    /// anyway.
    pub async fn insert(&self, commission: &Commission) -> DbResult<()> {
        debug!(
            id = %commission.id,
            sale_id = %commission.sale_id,
            amount = %commission.amount_cents,
            "Inserting commission"
        );

        sqlx::query(
            r#"
            INSERT INTO commissions (
                id, tenant_id, sale_id, seller_id, base, rate_bps,
                amount_cents, pay_status, pay_status_date,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11
            )
            "#,
        )
        .bind(&commission.id)
        .bind(&commission.tenant_id)
        .bind(&commission.sale_id)
        .bind(&commission.seller_id)
        .bind(commission.base)
        .bind(commission.rate_bps)
        .bind(commission.amount_cents)
        .bind(commission.pay_status)
        .bind(commission.pay_status_date)
        .bind(commission.created_at)
        .bind(commission.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Checks whether a sale already has a commission.
    pub async fn exists_for_sale(&self, sale_id: &str) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM commissions WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Gets a commission by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Commission>> {
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commissions WHERE id = ?1");
        let commission = sqlx::query_as::<_, Commission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(commission)
    }

    /// Gets the commission for a sale, if one exists.
    pub async fn get_by_sale(&self, sale_id: &str) -> DbResult<Option<Commission>> {
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commissions WHERE sale_id = ?1");
        let commission = sqlx::query_as::<_, Commission>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(commission)
    }

    /// Lists commissions visible to a viewer, newest first.
    pub async fn list(&self, viewer: &Viewer, limit: u32) -> DbResult<Vec<Commission>> {
        let commissions = if viewer.sees_all_rows() {
            let sql = format!(
                "SELECT {COMMISSION_COLUMNS} FROM commissions \
                 ORDER BY created_at DESC LIMIT ?1"
            );
            sqlx::query_as::<_, Commission>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {COMMISSION_COLUMNS} FROM commissions \
                 WHERE seller_id = ?1 ORDER BY created_at DESC LIMIT ?2"
            );
            sqlx::query_as::<_, Commission>(&sql)
                .bind(&viewer.user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(commissions)
    }

    /// Persists a pay-status edit (status, date, updated_at).
    pub async fn update_pay_status(&self, commission: &Commission) -> DbResult<()> {
        debug!(
            id = %commission.id,
            pay_status = ?commission.pay_status,
            "Updating commission pay status"
        );

        let result = sqlx::query(
            r#"
            UPDATE commissions SET
                pay_status = ?2,
                pay_status_date = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&commission.id)
        .bind(commission.pay_status)
        .bind(commission.pay_status_date)
        .bind(commission.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Commission", &commission.id));
        }

        Ok(())
    }

    /// Counts all commissions (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commissions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new commission ID.
pub fn generate_commission_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new commission rule ID.
pub fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
