//! # Cart Store
//!
//! Per-customer pending purchase quantities, one row per (customer, product).
//!
//! ## Add to Cart
//! ```text
//! add(customer 42, product 7, qty 3)      cart already holds 2
//!      │
//!      ├── validate_cart_quantity(2, 3) → cumulative 5 (≤ 999)
//!      ├── new line? validate_cart_size (≤ 100 products)
//!      ├── advisory check at the home branch:
//!      │       no stock record   → UnknownProduct
//!      │       available < 5     → InsufficientStock
//!      └── INSERT ... ON CONFLICT (customer_id, product_id)
//!              DO UPDATE SET quantity = quantity + 3
//!              WHERE quantity + 3 <= 999
//!          no row back → QuantityTooLarge or CartTooLarge
//! ```
//!
//! The advisory check reserves nothing. Two customers can both be told a
//! product is in stock and one of them loses at checkout; the Order
//! Builder's reservation is the only binding check.

use apotheca_core::validation::{validate_cart_quantity, validate_cart_size};
use apotheca_core::{
    BranchId, CartLine, CartLineView, CartTotals, CoreError, CustomerId, ProductId,
    DEFAULT_HOME_BRANCH_ID, MAX_CART_ITEMS, MAX_ITEM_QUANTITY,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Repository for customer carts.
#[derive(Debug, Clone)]
pub struct CartStore {
    pool: SqlitePool,
    home_branch: BranchId,
}

impl CartStore {
    pub fn new(pool: SqlitePool) -> Self {
        CartStore {
            pool,
            home_branch: DEFAULT_HOME_BRANCH_ID,
        }
    }

    /// Uses `branch_id` for the advisory stock check.
    pub fn with_home_branch(mut self, branch_id: BranchId) -> Self {
        self.home_branch = branch_id;
        self
    }

    pub fn home_branch(&self) -> BranchId {
        self.home_branch
    }

    /// Adds `quantity` of a product to the customer's cart.
    ///
    /// Repeated adds accumulate into the same line. Returns the resulting line.
    pub async fn add(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<CartLine> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_lines WHERE customer_id = ?1 AND product_id = ?2",
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let cumulative = validate_cart_quantity(existing.unwrap_or(0), quantity)?;

        if existing.is_none() {
            let lines: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE customer_id = ?1")
                    .bind(customer_id)
                    .fetch_one(&self.pool)
                    .await?;
            validate_cart_size(lines as usize)?;
        }

        self.advisory_check(product_id, cumulative).await?;

        // The caps are checked again inside the statement, so concurrent adds
        // for the same customer cannot pass them between the reads above and
        // this write.
        let line = sqlx::query_as::<_, CartLine>(
            r#"
            INSERT INTO cart_lines (customer_id, product_id, quantity, reserved_at)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (
                    SELECT 1 FROM cart_lines WHERE customer_id = ?1 AND product_id = ?2
                )
               OR (SELECT COUNT(*) FROM cart_lines WHERE customer_id = ?1) < ?6
            ON CONFLICT (customer_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + excluded.quantity
            WHERE cart_lines.quantity + excluded.quantity <= ?5
            RETURNING customer_id, product_id, quantity, reserved_at
            "#,
        )
        .bind(customer_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .bind(MAX_ITEM_QUANTITY)
        .bind(MAX_CART_ITEMS as i64)
        .fetch_optional(&self.pool)
        .await?;

        let Some(line) = line else {
            return Err(self.cap_exceeded(customer_id, product_id, quantity).await?.into());
        };

        info!(
            customer_id,
            product_id,
            added = quantity,
            quantity = line.quantity,
            "Added to cart"
        );
        Ok(line)
    }

    /// Tells which cap refused a write that returned no row.
    async fn cap_exceeded(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<CoreError> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_lines WHERE customer_id = ?1 AND product_id = ?2",
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let err = match existing {
            Some(existing) => CoreError::QuantityTooLarge {
                requested: existing.saturating_add(quantity),
                max: MAX_ITEM_QUANTITY,
            },
            None => CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            },
        };

        debug!(customer_id, product_id, error = %err, "Cart cap reached");
        Ok(err)
    }

    async fn advisory_check(&self, product_id: ProductId, requested: i64) -> DbResult<()> {
        let available: Option<i64> = sqlx::query_scalar(
            "SELECT quantity_in_stock FROM stock WHERE branch_id = ?1 AND product_id = ?2",
        )
        .bind(self.home_branch)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        match available {
            None => Err(CoreError::UnknownProduct(product_id).into()),
            Some(available) if available < requested => {
                debug!(product_id, available, requested, "Advisory check failed");
                Err(CoreError::InsufficientStock {
                    branch_id: self.home_branch,
                    product_id,
                    available,
                    requested,
                }
                .into())
            }
            Some(_) => Ok(()),
        }
    }

    /// Cart lines priced at current catalog prices. No side effects.
    pub async fn get_lines(&self, customer_id: CustomerId) -> DbResult<Vec<CartLineView>> {
        let lines = sqlx::query_as::<_, CartLineView>(
            r#"
            SELECT
                c.product_id,
                p.name AS product_name,
                c.quantity,
                p.unit_price,
                c.quantity * p.unit_price AS line_subtotal,
                p.requires_prescription
            FROM cart_lines c
            INNER JOIN products p ON p.product_id = c.product_id
            WHERE c.customer_id = ?1
            ORDER BY c.product_id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Raw stored lines, without pricing.
    pub async fn raw_lines(&self, customer_id: CustomerId) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT customer_id, product_id, quantity, reserved_at
            FROM cart_lines
            WHERE customer_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    pub async fn totals(&self, customer_id: CustomerId) -> DbResult<CartTotals> {
        let lines = self.get_lines(customer_id).await?;
        Ok(CartTotals::from_lines(&lines))
    }

    /// Removes one product from the cart. Returns whether a line existed.
    pub async fn remove(&self, customer_id: CustomerId, product_id: ProductId) -> DbResult<bool> {
        let result =
            sqlx::query("DELETE FROM cart_lines WHERE customer_id = ?1 AND product_id = ?2")
                .bind(customer_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;

        debug!(customer_id, product_id, removed = result.rows_affected(), "Cart line removed");
        Ok(result.rows_affected() > 0)
    }

    /// Empties the cart. Returns the number of lines deleted.
    pub async fn clear(&self, customer_id: CustomerId) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE customer_id = ?1")
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        info!(customer_id, lines = result.rows_affected(), "Cart cleared");
        Ok(result.rows_affected())
    }
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
    async fn test_repeated_add_accumulates_into_one_line() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let carts = shop.db.carts();

        carts.add(42, shop.product_a, 2).await.unwrap();
        let line = carts.add(42, shop.product_a, 3).await.unwrap();

        assert_eq!(line.quantity, 5);
        let lines = carts.raw_lines(42).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_does_not_touch_stock() {
        let shop = pharmacy(memory_db().await, 10, 5).await;

        shop.db.carts().add(42, shop.product_a, 4).await.unwrap();

        assert_eq!(
            shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_advisory_check_uses_cumulative_quantity() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let carts = shop.db.carts();

        carts.add(42, shop.product_b, 3).await.unwrap();
        let err = carts.add(42, shop.product_b, 3).await.unwrap_err();

        assert_eq!(
            err.rejection(),
            Some(&CoreError::InsufficientStock {
                branch_id: shop.branch,
                product_id: shop.product_b,
                available: 5,
                requested: 6,
            })
        );
        assert_eq!(carts.raw_lines(42).await.unwrap()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_unstocked_product_is_unknown() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let unstocked = product(&shop.db, "Cetirizine 10mg", 150, false).await;

        let err = shop.db.carts().add(42, unstocked, 1).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownProduct(unstocked)));
    }

    #[tokio::test]
    async fn test_home_branch_drives_advisory_check() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let other = branch(&shop.db, "Riverside").await;
        shop.db.stock().add_sku(other, shop.product_a, 1).await.unwrap();

        let carts = shop.db.carts().with_home_branch(other);
        assert!(carts.add(42, shop.product_a, 1).await.is_ok());
        assert!(carts.add(42, shop.product_a, 1).await.is_err());

        // product B is only carried at the default branch
        let err = carts.add(42, shop.product_b, 1).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownProduct(shop.product_b)));
    }

    #[tokio::test]
    async fn test_invalid_quantities_rejected_without_mutation() {
        let shop = pharmacy(memory_db().await, 2000, 5).await;
        let carts = shop.db.carts();

        assert!(carts.add(42, shop.product_a, 0).await.is_err());
        assert!(carts.add(42, shop.product_a, -2).await.is_err());

        let err = carts
            .add(42, shop.product_a, MAX_ITEM_QUANTITY + 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::QuantityTooLarge { .. })
        ));

        assert!(carts.raw_lines(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lines_are_priced_live() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let carts = shop.db.carts();

        carts.add(42, shop.product_a, 2).await.unwrap();
        carts.add(42, shop.product_b, 1).await.unwrap();

        let totals = carts.totals(42).await.unwrap();
        assert_eq!(totals.subtotal, Money::from_minor(25));
        assert!(totals.requires_prescription);

        shop.db
            .products()
            .update(
                shop.product_a,
                &apotheca_core::ProductPatch {
                    unit_price: Some(Money::from_minor(12)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let lines = carts.get_lines(42).await.unwrap();
        assert_eq!(lines[0].unit_price, Money::from_minor(12));
        assert_eq!(lines[0].line_subtotal, Money::from_minor(24));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let carts = shop.db.carts();

        carts.add(42, shop.product_a, 1).await.unwrap();
        carts.add(42, shop.product_b, 1).await.unwrap();
        carts.add(7, shop.product_a, 1).await.unwrap();

        assert!(carts.remove(42, shop.product_a).await.unwrap());
        assert!(!carts.remove(42, shop.product_a).await.unwrap());

        assert_eq!(carts.clear(42).await.unwrap(), 1);
        assert!(carts.get_lines(42).await.unwrap().is_empty());
        assert_eq!(carts.get_lines(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_size_cap() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let carts = shop.db.carts();

        for n in 0..MAX_CART_ITEMS {
            let filler = product(&shop.db, &format!("Filler {n}"), 1, false).await;
            shop.db.stock().add_sku(shop.branch, filler, 1).await.unwrap();
            carts.add(42, filler, 1).await.unwrap();
        }

        let err = carts.add(42, shop.product_a, 1).await.unwrap_err();
        assert_eq!(
            err.rejection(),
            Some(&CoreError::CartTooLarge {
                max: MAX_CART_ITEMS
            })
        );
        assert_eq!(carts.raw_lines(42).await.unwrap().len(), MAX_CART_ITEMS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_stay_within_line_cap() {
        let dir = tempfile::tempdir().unwrap();
        let shop = pharmacy(file_db(&dir).await, 5000, 5).await;

        let mut handles = Vec::new();
        for _ in 0..15 {
            let carts = shop.db.carts();
            let product_id = shop.product_a;
            handles.push(tokio::spawn(async move { carts.add(42, product_id, 100).await }));
        }

        let mut added = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => added += 1,
                Err(err) => assert!(matches!(
                    err.rejection(),
                    Some(CoreError::QuantityTooLarge { .. })
                )),
            }
        }

        let lines = shop.db.carts().raw_lines(42).await.unwrap();
        assert_eq!(added, 9);
        assert_eq!(lines[0].quantity, 900);
    }
}
