//! # Order Builder
//!
//! Converts a customer's cart into an order, and drives the order lifecycle.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(customer 42, branch 1)                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. DELETE FROM cart_lines WHERE customer_id = 42 RETURNING ...        │
//! │        └── no lines → ROLLBACK, EmptyCart                               │
//! │   2. branch exists?           └── no → ROLLBACK, UnknownBranch          │
//! │   3. reserve line 1 ✓  reserve line 2 ✓  reserve line 3 ✗               │
//! │        └── ROLLBACK: lines 1..2 restored, cart restored,                │
//! │            InsufficientStock for line 3 returned as is                  │
//! │   4. price lines at current catalog prices, sum total                   │
//! │   5. INSERT orders (Pending), INSERT order_items                        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement is a write, so the transaction holds the database
//! write lock from its start. Nothing another writer does can slip between
//! reading the cart and committing the order. A crash before COMMIT leaves
//! the pre-checkout state.

use apotheca_core::pricing::{build_order_draft, PricedLine};
use apotheca_core::{
    BranchId, CheckoutReceipt, CoreError, CustomerId, Money, Order, OrderId, OrderItem,
    OrderStatus, PaymentId, ProductId,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, instrument, warn};

use crate::error::{DbError, DbResult};
use crate::repository::stock::{release_on, reserve_on};

/// Repository for checkout and orders.
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct TakenLine {
    product_id: ProductId,
    quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogPrice {
    unit_price: Money,
    requires_prescription: bool,
}

impl OrderBuilder {
    pub fn new(pool: SqlitePool) -> Self {
        OrderBuilder { pool }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns the customer's cart into a Pending order at `branch_id`.
    ///
    /// All or nothing: on any error the cart and every stock record are as
    /// they were before the call.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        customer_id: CustomerId,
        branch_id: BranchId,
    ) -> DbResult<CheckoutReceipt> {
        let mut tx = self.pool.begin().await?;

        match checkout_in(&mut tx, customer_id, branch_id).await {
            Ok(receipt) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

                info!(
                    order_id = receipt.order_id,
                    total = %receipt.total_amount,
                    lines = receipt.line_count,
                    "Checkout committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Checkout rollback failed");
                }
                warn!(error = %err, "Checkout rolled back");
                Err(err)
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, order_id: OrderId) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, customer_id, branch_id, order_date, order_status, total_amount
            FROM orders
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn items(&self, order_id: OrderId) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_item_id, order_id, product_id, quantity, unit_price, subtotal
            FROM order_items
            WHERE order_id = ?1
            ORDER BY order_item_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// A customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, customer_id, branch_id, order_date, order_status, total_amount
            FROM orders
            WHERE customer_id = ?1
            ORDER BY order_date DESC, order_id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Moves an order along Pending → Processing → Ready → Completed.
    ///
    /// Moving to `Cancelled` goes through [`OrderBuilder::cancel`] so the
    /// reserved stock is returned.
    pub async fn update_status(&self, order_id: OrderId, next: OrderStatus) -> DbResult<Order> {
        if next == OrderStatus::Cancelled {
            return self.cancel(order_id).await;
        }

        let current = self
            .get(order_id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;

        if !current.order_status.can_transition_to(next) {
            return Err(CoreError::InvalidOrderTransition {
                order_id,
                from: current.order_status,
                to: next,
            }
            .into());
        }

        // Conditional on the status just read; a concurrent change makes it miss.
        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET order_status = ?3
            WHERE order_id = ?1 AND order_status = ?2
            RETURNING order_id, customer_id, branch_id, order_date, order_status, total_amount
            "#,
        )
        .bind(order_id)
        .bind(current.order_status)
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(order) => {
                info!(
                    order_id,
                    from = current.order_status.as_str(),
                    to = next.as_str(),
                    "Order status changed"
                );
                Ok(order)
            }
            None => {
                let now = self
                    .get(order_id)
                    .await?
                    .ok_or(CoreError::OrderNotFound(order_id))?;
                Err(CoreError::InvalidOrderTransition {
                    order_id,
                    from: now.order_status,
                    to: next,
                }
                .into())
            }
        }
    }

    /// Cancels a non-terminal order and returns its quantities to the branch.
    ///
    /// Status change and stock release commit together. An order with a
    /// Completed payment is refused with `OrderPaid` until the payment is
    /// refunded.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        match cancel_in(&mut tx, order_id).await {
            Ok(order) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                info!(order_id, branch_id = order.branch_id, "Order cancelled, stock released");
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Cancel rollback failed");
                }
                Err(err)
            }
        }
    }
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn checkout_in(
    conn: &mut SqliteConnection,
    customer_id: CustomerId,
    branch_id: BranchId,
) -> DbResult<CheckoutReceipt> {
    // Taking the cart first makes this transaction a writer from the start.
    let mut lines = sqlx::query_as::<_, TakenLine>(
        "DELETE FROM cart_lines WHERE customer_id = ?1 RETURNING product_id, quantity",
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    if lines.is_empty() {
        return Err(CoreError::EmptyCart { customer_id }.into());
    }

    let branch_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM branches WHERE branch_id = ?1)")
            .bind(branch_id)
            .fetch_one(&mut *conn)
            .await?;
    if !branch_exists {
        return Err(CoreError::UnknownBranch(branch_id).into());
    }

    lines.sort_by_key(|line| line.product_id);

    for line in &lines {
        reserve_on(conn, branch_id, line.product_id, line.quantity).await?;
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let price = sqlx::query_as::<_, CatalogPrice>(
            "SELECT unit_price, requires_prescription FROM products WHERE product_id = ?1",
        )
        .bind(line.product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CoreError::UnknownProduct(line.product_id))?;

        priced.push(PricedLine::new(
            line.product_id,
            line.quantity,
            price.unit_price,
            price.requires_prescription,
        ));
    }

    let draft = build_order_draft(&priced)?;

    let order_id: OrderId = sqlx::query_scalar(
        r#"
        INSERT INTO orders (customer_id, branch_id, order_date, order_status, total_amount)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING order_id
        "#,
    )
    .bind(customer_id)
    .bind(branch_id)
    .bind(Utc::now())
    .bind(OrderStatus::Pending)
    .bind(draft.total)
    .fetch_one(&mut *conn)
    .await?;

    for item in &draft.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price, subtotal)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .execute(&mut *conn)
        .await?;
    }

    Ok(CheckoutReceipt {
        order_id,
        branch_id,
        total_amount: draft.total,
        line_count: draft.items.len(),
        requires_prescription: draft.requires_prescription,
    })
}

async fn cancel_in(conn: &mut SqliteConnection, order_id: OrderId) -> DbResult<Order> {
    let cancelled = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET order_status = 'Cancelled'
        WHERE order_id = ?1
          AND order_status IN ('Pending', 'Processing', 'Ready')
          AND NOT EXISTS (
              SELECT 1 FROM payments
              WHERE order_id = ?1 AND payment_status = 'Completed'
          )
        RETURNING order_id, customer_id, branch_id, order_date, order_status, total_amount
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    let order = match cancelled {
        Some(order) => order,
        None => return Err(cancel_refusal(conn, order_id).await?.into()),
    };

    let items = sqlx::query_as::<_, TakenLine>(
        "SELECT product_id, quantity FROM order_items WHERE order_id = ?1 ORDER BY product_id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    for item in &items {
        release_on(conn, order.branch_id, item.product_id, item.quantity).await?;
    }

    Ok(order)
}

async fn cancel_refusal(conn: &mut SqliteConnection, order_id: OrderId) -> DbResult<CoreError> {
    let status: Option<OrderStatus> =
        sqlx::query_scalar("SELECT order_status FROM orders WHERE order_id = ?1")
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(from) = status else {
        return Ok(CoreError::OrderNotFound(order_id));
    };

    if from.can_transition_to(OrderStatus::Cancelled) {
        let paid: Option<PaymentId> = sqlx::query_scalar(
            "SELECT payment_id FROM payments WHERE order_id = ?1 AND payment_status = 'Completed'",
        )
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(payment_id) = paid {
            warn!(order_id, payment_id, "Cancel refused, order is paid");
            return Ok(CoreError::OrderPaid {
                order_id,
                payment_id,
            });
        }
    }

    Ok(CoreError::InvalidOrderTransition {
        order_id,
        from,
        to: OrderStatus::Cancelled,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
