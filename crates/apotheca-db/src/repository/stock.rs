//! # Stock Ledger
//!
//! Authoritative per-branch, per-product available quantity.
//!
//! ## Atomic Reserve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(branch 1, product 7, qty 3)                                    │
//! │                                                                         │
//! │  UPDATE stock                                                           │
//! │     SET quantity_in_stock = quantity_in_stock - 3                       │
//! │   WHERE branch_id = 1 AND product_id = 7                                │
//! │     AND quantity_in_stock >= 3          ◄── check and write are ONE     │
//! │  RETURNING quantity_in_stock                statement                   │
//! │       │                                                                 │
//! │       ├── row returned  → reserved, remaining quantity                  │
//! │       └── no row        → read once to tell NotCarried from             │
//! │                           InsufficientStock { available, requested }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite runs one writer at a time, so two reservations for the last unit
//! are serialized and the second sees zero stock. Different SKUs share no
//! application-level lock.
//!
//! The `*_on` functions take a plain connection so the Order Builder can
//! reserve inside its checkout transaction.

use apotheca_core::validation::{validate_restock_delta, validate_stock_quantity};
use apotheca_core::{
    BranchId, CoreError, InventoryLine, InventoryValuation, Product, ProductId, StockRecord,
    ValidationError,
};
use chrono::{Days, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// Repository for the per-branch stock counts.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current available quantity.
    ///
    /// A SKU the branch does not carry reads as 0, same as one that is sold out.
    pub async fn get_available(&self, branch_id: BranchId, product_id: ProductId) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        available_on(&mut conn, branch_id, product_id).await
    }

    /// The stock record of a SKU, if the branch carries it.
    pub async fn find(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
    ) -> DbResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT branch_id, product_id, quantity_in_stock, last_restocked
            FROM stock
            WHERE branch_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Everything a branch carries, with catalog data, ordered by product name.
    pub async fn branch_inventory(&self, branch_id: BranchId) -> DbResult<Vec<InventoryLine>> {
        let lines = sqlx::query_as::<_, InventoryLine>(
            r#"
            SELECT
                s.branch_id,
                s.product_id,
                p.name AS product_name,
                p.category,
                p.unit_price,
                p.requires_prescription,
                s.quantity_in_stock,
                s.last_restocked
            FROM stock s
            INNER JOIN products p ON p.product_id = s.product_id
            WHERE s.branch_id = ?1
            ORDER BY p.name
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// SKUs at or below `threshold`, lowest first.
    pub async fn low_stock(
        &self,
        branch_id: BranchId,
        threshold: i64,
    ) -> DbResult<Vec<InventoryLine>> {
        let lines = sqlx::query_as::<_, InventoryLine>(
            r#"
            SELECT
                s.branch_id,
                s.product_id,
                p.name AS product_name,
                p.category,
                p.unit_price,
                p.requires_prescription,
                s.quantity_in_stock,
                s.last_restocked
            FROM stock s
            INNER JOIN products p ON p.product_id = s.product_id
            WHERE s.branch_id = ?1 AND s.quantity_in_stock <= ?2
            ORDER BY s.quantity_in_stock, p.name
            "#,
        )
        .bind(branch_id)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        debug!(branch_id, threshold, count = lines.len(), "Low stock query");
        Ok(lines)
    }

    /// SKUs whose product name contains `term`, ordered by name.
    ///
    /// Matching is case-insensitive for ASCII letters.
    pub async fn search(&self, branch_id: BranchId, term: &str) -> DbResult<Vec<InventoryLine>> {
        let lines = sqlx::query_as::<_, InventoryLine>(
            r#"
            SELECT
                s.branch_id,
                s.product_id,
                p.name AS product_name,
                p.category,
                p.unit_price,
                p.requires_prescription,
                s.quantity_in_stock,
                s.last_restocked
            FROM stock s
            INNER JOIN products p ON p.product_id = s.product_id
            WHERE s.branch_id = ?1 AND p.name LIKE '%' || ?2 || '%'
            ORDER BY p.name
            "#,
        )
        .bind(branch_id)
        .bind(term.trim())
        .fetch_all(&self.pool)
        .await?;

        debug!(branch_id, term, count = lines.len(), "Inventory search");
        Ok(lines)
    }

    /// Catalog products the branch has no SKU for, ordered by name.
    pub async fn not_carried(&self, branch_id: BranchId) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.product_id, p.name, p.description, p.category, p.manufacturer,
                   p.unit_price, p.requires_prescription, p.created_at
            FROM products p
            WHERE NOT EXISTS (
                SELECT 1 FROM stock s
                WHERE s.branch_id = ?1 AND s.product_id = p.product_id
            )
            ORDER BY p.name
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// SKUs restocked or recounted in the last `days` days, most recent first.
    pub async fn restocked_since(
        &self,
        branch_id: BranchId,
        days: u32,
    ) -> DbResult<Vec<InventoryLine>> {
        let since = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);

        let lines = sqlx::query_as::<_, InventoryLine>(
            r#"
            SELECT
                s.branch_id,
                s.product_id,
                p.name AS product_name,
                p.category,
                p.unit_price,
                p.requires_prescription,
                s.quantity_in_stock,
                s.last_restocked
            FROM stock s
            INNER JOIN products p ON p.product_id = s.product_id
            WHERE s.branch_id = ?1 AND s.last_restocked >= ?2
            ORDER BY s.last_restocked DESC, p.name
            "#,
        )
        .bind(branch_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        debug!(branch_id, %since, count = lines.len(), "Restock history");
        Ok(lines)
    }

    /// Value of a branch's stock at current list prices.
    pub async fn inventory_value(&self, branch_id: BranchId) -> DbResult<InventoryValuation> {
        let valuation = sqlx::query_as::<_, InventoryValuation>(
            r#"
            SELECT
                COUNT(*) AS sku_count,
                COALESCE(SUM(s.quantity_in_stock), 0) AS total_units,
                COALESCE(SUM(s.quantity_in_stock * p.unit_price), 0) AS value
            FROM stock s
            INNER JOIN products p ON p.product_id = s.product_id
            WHERE s.branch_id = ?1
            "#,
        )
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(valuation)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Atomically takes `quantity` units if at least that many are available.
    ///
    /// Returns the remaining quantity. Fails with `InsufficientStock` or
    /// `NotCarried` without touching the record.
    pub async fn reserve(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        reserve_on(&mut conn, branch_id, product_id, quantity).await
    }

    /// Atomically returns `quantity` units. Returns the new quantity.
    pub async fn release(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        release_on(&mut conn, branch_id, product_id, quantity).await
    }

    /// Adds a delivery of `delta` units and stamps `last_restocked` with today.
    pub async fn restock(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
        delta: i64,
    ) -> DbResult<StockRecord> {
        validate_restock_delta(delta)?;

        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            UPDATE stock
            SET quantity_in_stock = quantity_in_stock + ?3,
                last_restocked = ?4
            WHERE branch_id = ?1 AND product_id = ?2
            RETURNING branch_id, product_id, quantity_in_stock, last_restocked
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(delta)
        .bind(Utc::now().date_naive())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::NotCarried {
            branch_id,
            product_id,
        })?;

        info!(
            branch_id,
            product_id,
            delta,
            quantity = record.quantity_in_stock,
            "Restocked"
        );
        Ok(record)
    }

    /// Starts carrying a product at a branch.
    ///
    /// The `UNIQUE (branch_id, product_id)` constraint rejects a second
    /// record for the same SKU, also under concurrent calls.
    pub async fn add_sku(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
        initial_quantity: i64,
    ) -> DbResult<StockRecord> {
        validate_stock_quantity(initial_quantity)?;

        let inserted = sqlx::query_as::<_, StockRecord>(
            r#"
            INSERT INTO stock (branch_id, product_id, quantity_in_stock, last_restocked)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING branch_id, product_id, quantity_in_stock, last_restocked
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(initial_quantity)
        .bind(Utc::now().date_naive())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from);

        match inserted {
            Ok(record) => {
                info!(branch_id, product_id, initial_quantity, "SKU added");
                Ok(record)
            }
            Err(err) if err.is_unique_violation() => {
                warn!(branch_id, product_id, "SKU already exists");
                Err(CoreError::DuplicateSku {
                    branch_id,
                    product_id,
                }
                .into())
            }
            Err(DbError::ForeignKeyViolation { .. }) => {
                Err(self.missing_reference(branch_id, product_id).await?.into())
            }
            Err(err) => Err(err),
        }
    }

    /// Replaces the count after a physical stock take.
    pub async fn set_quantity(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<StockRecord> {
        validate_stock_quantity(quantity)?;

        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            UPDATE stock
            SET quantity_in_stock = ?3,
                last_restocked = ?4
            WHERE branch_id = ?1 AND product_id = ?2
            RETURNING branch_id, product_id, quantity_in_stock, last_restocked
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now().date_naive())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::NotCarried {
            branch_id,
            product_id,
        })?;

        info!(branch_id, product_id, quantity, "Stock count corrected");
        Ok(record)
    }

    /// Stops carrying a product. Only an empty SKU can be removed.
    pub async fn remove_sku(&self, branch_id: BranchId, product_id: ProductId) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM stock
            WHERE branch_id = ?1 AND product_id = ?2 AND quantity_in_stock = 0
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.find(branch_id, product_id).await? {
                Some(record) => CoreError::StockRemaining {
                    branch_id,
                    product_id,
                    remaining: record.quantity_in_stock,
                },
                None => CoreError::NotCarried {
                    branch_id,
                    product_id,
                },
            }
            .into());
        }

        info!(branch_id, product_id, "SKU removed");
        Ok(())
    }

    async fn missing_reference(
        &self,
        branch_id: BranchId,
        product_id: ProductId,
    ) -> DbResult<CoreError> {
        let product_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE product_id = ?1)")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(if product_exists {
            CoreError::UnknownBranch(branch_id)
        } else {
            CoreError::UnknownProduct(product_id)
        })
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub(crate) async fn available_on(
    conn: &mut SqliteConnection,
    branch_id: BranchId,
    product_id: ProductId,
) -> DbResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity_in_stock FROM stock WHERE branch_id = ?1 AND product_id = ?2",
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

pub(crate) async fn reserve_on(
    conn: &mut SqliteConnection,
    branch_id: BranchId,
    product_id: ProductId,
    quantity: i64,
) -> DbResult<i64> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity").into());
    }

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE stock
        SET quantity_in_stock = quantity_in_stock - ?3
        WHERE branch_id = ?1 AND product_id = ?2 AND quantity_in_stock >= ?3
        RETURNING quantity_in_stock
        "#,
    )
    .bind(branch_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        debug!(branch_id, product_id, quantity, remaining, "Stock reserved");
        return Ok(remaining);
    }

    let available: Option<i64> = sqlx::query_scalar(
        "SELECT quantity_in_stock FROM stock WHERE branch_id = ?1 AND product_id = ?2",
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let err = match available {
        Some(available) => CoreError::InsufficientStock {
            branch_id,
            product_id,
            available,
            requested: quantity,
        },
        None => CoreError::NotCarried {
            branch_id,
            product_id,
        },
    };

    debug!(branch_id, product_id, quantity, error = %err, "Reservation refused");
    Err(err.into())
}

pub(crate) async fn release_on(
    conn: &mut SqliteConnection,
    branch_id: BranchId,
    product_id: ProductId,
    quantity: i64,
) -> DbResult<i64> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity").into());
    }

    let quantity_now: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE stock
        SET quantity_in_stock = quantity_in_stock + ?3
        WHERE branch_id = ?1 AND product_id = ?2
        RETURNING quantity_in_stock
        "#,
    )
    .bind(branch_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    let quantity_now = quantity_now.ok_or(CoreError::NotCarried {
        branch_id,
        product_id,
    })?;

    debug!(branch_id, product_id, quantity, quantity_now, "Stock released");
    Ok(quantity_now)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{branch, file_db, memory_db, pharmacy, product};
    use apotheca_core::Money;

    #[tokio::test]
    async fn test_get_available_missing_record_is_zero() {
        let db = memory_db().await;
        let b = branch(&db, "Central").await;
        let p = product(&db, "Ibuprofen 200mg", 300, false).await;

        assert_eq!(db.stock().get_available(b, p).await.unwrap(), 0);
        assert_eq!(db.stock().get_available(99, 99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected_and_stock_kept() {
        let db = memory_db().await;
        let b = branch(&db, "Central").await;
        let p = product(&db, "Ibuprofen 200mg", 300, false).await;

        db.stock().add_sku(b, p, 10).await.unwrap();
        let err = db.stock().add_sku(b, p, 10).await.unwrap_err();

        assert_eq!(
            err.rejection(),
            Some(&CoreError::DuplicateSku {
                branch_id: b,
                product_id: p
            })
        );
        assert_eq!(db.stock().get_available(b, p).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_add_sku_unknown_references() {
        let db = memory_db().await;
        let b = branch(&db, "Central").await;
        let p = product(&db, "Ibuprofen 200mg", 300, false).await;

        let err = db.stock().add_sku(b, 404, 1).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownProduct(404)));

        let err = db.stock().add_sku(404, p, 1).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownBranch(404)));

        let err = db.stock().add_sku(b, p, -1).await.unwrap_err();
        assert!(matches!(err.rejection(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let stock = shop.db.stock();

        assert_eq!(stock.reserve(shop.branch, shop.product_a, 4).await.unwrap(), 6);
        assert_eq!(stock.release(shop.branch, shop.product_a, 1).await.unwrap(), 7);
        assert_eq!(stock.get_available(shop.branch, shop.product_a).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_reserve_refusals_leave_stock_unchanged() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let stock = shop.db.stock();

        let err = stock.reserve(shop.branch, shop.product_b, 6).await.unwrap_err();
        assert_eq!(
            err.rejection(),
            Some(&CoreError::InsufficientStock {
                branch_id: shop.branch,
                product_id: shop.product_b,
                available: 5,
                requested: 6,
            })
        );
        assert_eq!(stock.get_available(shop.branch, shop.product_b).await.unwrap(), 5);

        let err = stock.reserve(404, shop.product_b, 1).await.unwrap_err();
        assert!(matches!(err.rejection(), Some(CoreError::NotCarried { .. })));

        let err = stock.release(404, shop.product_b, 1).await.unwrap_err();
        assert!(matches!(err.rejection(), Some(CoreError::NotCarried { .. })));

        assert!(stock.reserve(shop.branch, shop.product_b, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_reserve_exact_quantity_empties_sku() {
        let shop = pharmacy(memory_db().await, 3, 5).await;
        let stock = shop.db.stock();

        assert_eq!(stock.reserve(shop.branch, shop.product_a, 3).await.unwrap(), 0);
        assert!(stock.reserve(shop.branch, shop.product_a, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_restock_and_set_quantity() {
        let shop = pharmacy(memory_db().await, 2, 5).await;
        let stock = shop.db.stock();

        let record = stock.restock(shop.branch, shop.product_a, 48).await.unwrap();
        assert_eq!(record.quantity_in_stock, 50);
        assert_eq!(record.last_restocked, Utc::now().date_naive());

        assert!(stock.restock(shop.branch, shop.product_a, 0).await.is_err());
        assert!(stock.restock(404, shop.product_a, 5).await.is_err());

        let record = stock.set_quantity(shop.branch, shop.product_a, 7).await.unwrap();
        assert_eq!(record.quantity_in_stock, 7);
        assert!(stock.set_quantity(shop.branch, shop.product_a, -1).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_sku_only_when_empty() {
        let shop = pharmacy(memory_db().await, 2, 5).await;
        let stock = shop.db.stock();

        let err = stock.remove_sku(shop.branch, shop.product_a).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::StockRemaining { remaining: 2, .. })
        ));

        stock.set_quantity(shop.branch, shop.product_a, 0).await.unwrap();
        stock.remove_sku(shop.branch, shop.product_a).await.unwrap();
        assert!(stock.find(shop.branch, shop.product_a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_branch_listings_and_value() {
        let shop = pharmacy(memory_db().await, 40, 5).await;
        let stock = shop.db.stock();

        let all = stock.branch_inventory(shop.branch).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].product_name, "Amoxicillin 250mg");
        assert!(all[0].requires_prescription);

        let low = stock.low_stock(shop.branch, 10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, shop.product_b);

        let value = stock.inventory_value(shop.branch).await.unwrap();
        assert_eq!(value.sku_count, 2);
        assert_eq!(value.total_units, 45);
        assert_eq!(value.value, Money::from_minor(40 * 10 + 5 * 5));

        let empty = stock.inventory_value(404).await.unwrap();
        assert_eq!(empty.sku_count, 0);
        assert_eq!(empty.value, Money::zero());
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let stock = shop.db.stock();

        let found = stock.search(shop.branch, "amox").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_id, shop.product_b);

        let all = stock.search(shop.branch, " mg ").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].product_name, "Amoxicillin 250mg");

        assert!(stock.search(shop.branch, "insulin").await.unwrap().is_empty());
        assert!(stock.search(404, "amox").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_carried_lists_products_without_sku() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let stock = shop.db.stock();
        let cetirizine = product(&shop.db, "Cetirizine 10mg", 150, false).await;

        let missing = stock.not_carried(shop.branch).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].product_id, cetirizine);

        stock.add_sku(shop.branch, cetirizine, 0).await.unwrap();
        assert!(stock.not_carried(shop.branch).await.unwrap().is_empty());

        let other = branch(&shop.db, "Riverside").await;
        assert_eq!(stock.not_carried(other).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_restocked_since_skips_old_deliveries() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let stock = shop.db.stock();

        sqlx::query("UPDATE stock SET last_restocked = ?1 WHERE product_id = ?2")
            .bind(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap())
            .bind(shop.product_b)
            .execute(shop.db.pool())
            .await
            .unwrap();

        let recent = stock.restocked_since(shop.branch, 30).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].product_id, shop.product_a);

        let today = stock.restocked_since(shop.branch, 0).await.unwrap();
        assert_eq!(today.len(), 1);

        let everything = stock.restocked_since(shop.branch, u32::MAX).await.unwrap();
        assert_eq!(everything.len(), 2);
        assert_eq!(everything[1].product_id, shop.product_b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let shop = pharmacy(file_db(&dir).await, 10, 0).await;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let stock = shop.db.stock();
            let (b, p) = (shop.branch, shop.product_a);
            handles.push(tokio::spawn(async move { stock.reserve(b, p, 1).await }));
        }

        let mut reserved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => reserved += 1,
                Err(err) => assert!(matches!(
                    err.rejection(),
                    Some(CoreError::InsufficientStock { .. })
                )),
            }
        }

        assert_eq!(reserved, 10);
        assert_eq!(
            shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap(),
            0
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uneven_reservations_stay_within_stock() {
        let dir = tempfile::tempdir().unwrap();
        let shop = pharmacy(file_db(&dir).await, 20, 0).await;

        let mut handles = Vec::new();
        for qty in [3, 7, 5, 9, 4, 6, 2, 8] {
            let stock = shop.db.stock();
            let (b, p) = (shop.branch, shop.product_a);
            handles.push(tokio::spawn(async move {
                stock.reserve(b, p, qty).await.map(|_| qty)
            }));
        }

        let mut total = 0;
        for handle in handles {
            if let Ok(qty) = handle.await.unwrap() {
                total += qty;
            }
        }

        let left = shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap();
        assert!(total <= 20);
        assert_eq!(total + left, 20);
    }
}
