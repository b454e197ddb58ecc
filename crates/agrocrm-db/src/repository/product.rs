//! # Product Repository
//!
//! Database operations for the catalog and its price history.
//!
//! ## Price History
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 How the Audit Trail Fills Up                            │
//! │                                                                         │
//! │  Product edit (cost 100 → 110)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products ...            ← source of truth, must succeed        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO price_history ...  ← best-effort audit, appended by the   │
//! │                                   save flow AFTER the product write    │
//! │                                                                         │
//! │  price_history has no UPDATE or DELETE path in this crate; entries     │
//! │  are immutable once written.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agrocrm_core::{PriceHistoryEntry, Product};

/// All product columns, in schema order. Shared by the SELECT statements
/// so FromRow always sees the full shape.
const PRODUCT_COLUMNS: &str = "\
    id, tenant_id, name, category, description, \
    cost_cents, price_cents, pricing_mode, margin_bps, tax_bps, \
    stock, low_stock_threshold, max_discount_bps, is_active, \
    created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let catalog = repo.list_active(100).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists every product including deactivated ones (admin view).
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists active products of one category.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND category = ?1 ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id generated beforehand)
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, category, description,
                cost_cents, price_cents, pricing_mode, margin_bps, tax_bps,
                stock, low_stock_threshold, max_discount_bps, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.pricing_mode)
        .bind(product.margin_bps)
        .bind(product.tax_bps)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.max_discount_bps)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                description = ?4,
                cost_cents = ?5,
                price_cents = ?6,
                pricing_mode = ?7,
                margin_bps = ?8,
                tax_bps = ?9,
                stock = ?10,
                low_stock_threshold = ?11,
                max_discount_bps = ?12,
                is_active = ?13,
                updated_at = ?14
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.pricing_mode)
        .bind(product.margin_bps)
        .bind(product.tax_bps)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(product.max_discount_bps)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adjusts product stock by a delta and returns the updated row.
    ///
    /// ## Delta Pattern
    /// `stock = stock + delta` instead of an absolute write, so two
    /// concurrent sales cannot clobber each other's decrement.
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `delta` - Change in stock (negative for sales, positive for restock)
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// - Historical sales and price history still reference this product
    /// - Can be restored if deactivated by mistake
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics and the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Price History
    // =========================================================================

    /// Appends an immutable price history entry.
    ///
    /// The save flow calls this after the product write; a failure here is
    /// logged by the caller and does NOT roll back the product.
    pub async fn append_history(&self, entry: &PriceHistoryEntry) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            change_type = ?entry.change_type,
            "Appending price history entry"
        );

        sqlx::query(
            r#"
            INSERT INTO price_history (
                id, tenant_id, product_id, change_type,
                old_cost_cents, new_cost_cents, old_price_cents, new_price_cents,
                margin_bps, tax_bps, changed_by, changed_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12
            )
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.product_id)
        .bind(entry.change_type)
        .bind(entry.old_cost_cents)
        .bind(entry.new_cost_cents)
        .bind(entry.old_price_cents)
        .bind(entry.new_price_cents)
        .bind(entry.margin_bps)
        .bind(entry.tax_bps)
        .bind(&entry.changed_by)
        .bind(entry.changed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists a product's history, newest first.
    pub async fn history(&self, product_id: &str) -> DbResult<Vec<PriceHistoryEntry>> {
        let entries = sqlx::query_as::<_, PriceHistoryEntry>(
            r#"
            SELECT id, tenant_id, product_id, change_type,
                   old_cost_cents, new_cost_cents, old_price_cents, new_price_cents,
                   margin_bps, tax_bps, changed_by, changed_at
            FROM price_history
            WHERE product_id = ?1
            ORDER BY changed_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts history entries for a product.
    pub async fn history_count(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM price_history WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
