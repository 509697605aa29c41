//! # Payment Recorder
//!
//! Attaches the single payment of an order, and refunds it.
//!
//! ```text
//! record_payment(order 9, Cash, 25)
//!      │
//!      ├── amount > 0?                 no → Validation
//!      ├── method exists?              no → PaymentMethodNotFound
//!      └── INSERT payments (Completed) SELECT FROM orders
//!              WHERE order 9 is not Cancelled
//!              no row                → OrderNotFound or OrderCancelled
//!              UNIQUE(order_id) hit  → DuplicatePayment, first payment untouched
//! ```
//!
//! The amount is not compared to the order total; the counter passes the
//! order's own total. Refunds do not return stock to the branch. A paid
//! order is cancelled by refunding it first; the cancel then returns the
//! stock.

use apotheca_core::validation::validate_payment_amount;
use apotheca_core::{
    CoreError, Money, OrderId, OrderStatus, Payment, PaymentId, PaymentMethod, PaymentMethodId,
    PaymentStatus,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::error::{DbError, DbResult};

/// Repository for order payments.
#[derive(Debug, Clone)]
pub struct PaymentRecorder {
    pool: SqlitePool,
}

impl PaymentRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRecorder { pool }
    }

    /// Records the payment of an order as Completed.
    #[instrument(skip(self, reference))]
    pub async fn record_payment(
        &self,
        order_id: OrderId,
        method_id: PaymentMethodId,
        amount: Money,
        reference: Option<String>,
    ) -> DbResult<Payment> {
        validate_payment_amount(amount)?;

        let method_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payment_methods WHERE method_id = ?1)",
        )
        .bind(method_id)
        .fetch_one(&self.pool)
        .await?;
        if !method_exists {
            return Err(CoreError::PaymentMethodNotFound(method_id).into());
        }

        // Order status is checked by the insert itself; a cancel committed
        // just before leaves nothing to select.
        let inserted = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                order_id, method_id, amount, payment_date, payment_status, transaction_reference
            )
            SELECT o.order_id, ?2, ?3, ?4, ?5, ?6
            FROM orders o
            WHERE o.order_id = ?1 AND o.order_status <> 'Cancelled'
            RETURNING payment_id, order_id, method_id, amount, payment_date,
                      payment_status, transaction_reference
            "#,
        )
        .bind(order_id)
        .bind(method_id)
        .bind(amount)
        .bind(Utc::now())
        .bind(PaymentStatus::Completed)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from);

        match inserted {
            Ok(Some(payment)) => {
                info!(
                    payment_id = payment.payment_id,
                    order_id,
                    amount = %amount,
                    "Payment recorded"
                );
                Ok(payment)
            }
            Err(err) if err.is_unique_violation() => {
                warn!(order_id, "Order already paid");
                Err(CoreError::DuplicatePayment { order_id }.into())
            }
            Ok(None) => {
                let status: Option<OrderStatus> =
                    sqlx::query_scalar("SELECT order_status FROM orders WHERE order_id = ?1")
                        .bind(order_id)
                        .fetch_optional(&self.pool)
                        .await?;

                Err(match status {
                    Some(_) => {
                        warn!(order_id, "Payment refused for cancelled order");
                        CoreError::OrderCancelled(order_id)
                    }
                    None => CoreError::OrderNotFound(order_id),
                }
                .into())
            }
            Err(err) => Err(err),
        }
    }

    /// Marks a Completed payment as Refunded.
    #[instrument(skip(self))]
    pub async fn refund(&self, payment_id: PaymentId) -> DbResult<Payment> {
        let refunded = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET payment_status = 'Refunded'
            WHERE payment_id = ?1 AND payment_status = 'Completed'
            RETURNING payment_id, order_id, method_id, amount, payment_date,
                      payment_status, transaction_reference
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(payment) = refunded {
            info!(payment_id, order_id = payment.order_id, "Payment refunded");
            return Ok(payment);
        }

        let current = self
            .get(payment_id)
            .await?
            .ok_or(CoreError::PaymentNotFound(payment_id))?;

        Err(CoreError::InvalidPaymentTransition {
            payment_id,
            from: current.payment_status,
            to: PaymentStatus::Refunded,
        }
        .into())
    }

    pub async fn get(&self, payment_id: PaymentId) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, method_id, amount, payment_date,
                   payment_status, transaction_reference
            FROM payments
            WHERE payment_id = ?1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn for_order(&self, order_id: OrderId) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, order_id, method_id, amount, payment_date,
                   payment_status, transaction_reference
            FROM payments
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Payment methods offered at the counter, by id.
    pub async fn methods(&self) -> DbResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            "SELECT method_id, method_name, description FROM payment_methods ORDER BY method_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{file_db, memory_db, pharmacy, Pharmacy};

    async fn paid_order_fixture(shop: &Pharmacy) -> (OrderId, Money) {
        shop.db.carts().add(42, shop.product_a, 2).await.unwrap();
        shop.db.carts().add(42, shop.product_b, 1).await.unwrap();
        let receipt = shop.db.orders().checkout(42, shop.branch).await.unwrap();
        (receipt.order_id, receipt.total_amount)
    }

    #[tokio::test]
    async fn test_seeded_methods() {
        let db = memory_db().await;
        let names: Vec<String> = db
            .payments()
            .methods()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.method_name)
            .collect();
        assert_eq!(names, ["Cash", "Credit Card", "Debit Card", "E-Wallet"]);
    }

    #[tokio::test]
    async fn test_record_payment_completed() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let (order_id, total) = paid_order_fixture(&shop).await;

        let payment = shop
            .db
            .payments()
            .record_payment(order_id, 1, total, Some("TXN-1".into()))
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Completed);
        assert_eq!(payment.amount, Money::from_minor(25));
        assert_eq!(payment.transaction_reference.as_deref(), Some("TXN-1"));
        assert_eq!(
            shop.db.payments().for_order(order_id).await.unwrap(),
            Some(payment)
        );
    }

    #[tokio::test]
    async fn test_second_payment_is_duplicate_and_first_untouched() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let (order_id, total) = paid_order_fixture(&shop).await;
        let payments = shop.db.payments();

        let first = payments.record_payment(order_id, 1, total, None).await.unwrap();
        let err = payments
            .record_payment(order_id, 2, Money::from_minor(1), Some("again".into()))
            .await
            .unwrap_err();

        assert_eq!(err.rejection(), Some(&CoreError::DuplicatePayment { order_id }));
        assert_eq!(payments.get(first.payment_id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_record_payment_rejections() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let (order_id, total) = paid_order_fixture(&shop).await;
        let payments = shop.db.payments();

        let err = payments.record_payment(404, 1, total, None).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::OrderNotFound(404)));

        let err = payments.record_payment(order_id, 99, total, None).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::PaymentMethodNotFound(99)));

        let err = payments
            .record_payment(order_id, 1, Money::zero(), None)
            .await
            .unwrap_err();
        assert!(matches!(err.rejection(), Some(CoreError::Validation(_))));

        assert!(payments.for_order(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refund_only_once_and_keeps_stock() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        let (order_id, total) = paid_order_fixture(&shop).await;
        let payments = shop.db.payments();
        let payment = payments.record_payment(order_id, 1, total, None).await.unwrap();

        let refunded = payments.refund(payment.payment_id).await.unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

        let err = payments.refund(payment.payment_id).await.unwrap_err();
        assert_eq!(
            err.rejection(),
            Some(&CoreError::InvalidPaymentTransition {
                payment_id: payment.payment_id,
                from: PaymentStatus::Refunded,
                to: PaymentStatus::Refunded,
            })
        );

        let err = payments.refund(404).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::PaymentNotFound(404)));

        // refunds leave the reservation in place
        assert_eq!(
            shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap(),
            8
        );
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_paid() {
        let shop = pharmacy(memory_db().await, 10, 5).await;
        shop.db.carts().add(42, shop.product_a, 2).await.unwrap();
        let receipt = shop.db.orders().checkout(42, shop.branch).await.unwrap();
        shop.db.orders().cancel(receipt.order_id).await.unwrap();

        let err = shop
            .db
            .payments()
            .record_payment(receipt.order_id, 1, receipt.total_amount, None)
            .await
            .unwrap_err();

        assert_eq!(err.rejection(), Some(&CoreError::OrderCancelled(receipt.order_id)));
        assert!(shop.db.payments().for_order(receipt.order_id).await.unwrap().is_none());
        assert_eq!(
            shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap(),
            10
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_payment_racing_cancel_never_leaves_paid_cancelled_order() {
        let dir = tempfile::tempdir().unwrap();
        let shop = pharmacy(file_db(&dir).await, 100, 5).await;
        let mut paid_orders = 0;

        for customer in 1..=8 {
            shop.db.carts().add(customer, shop.product_a, 2).await.unwrap();
            let receipt = shop.db.orders().checkout(customer, shop.branch).await.unwrap();

            let payments = shop.db.payments();
            let orders = shop.db.orders();
            let (order_id, total) = (receipt.order_id, receipt.total_amount);
            let pay = tokio::spawn(async move {
                payments.record_payment(order_id, 1, total, None).await
            });
            let cancel = tokio::spawn(async move { orders.cancel(order_id).await });

            let paid = pay.await.unwrap();
            let cancelled = cancel.await.unwrap();
            assert!(paid.is_ok() != cancelled.is_ok());

            let payment = shop.db.payments().for_order(order_id).await.unwrap();
            let order = shop.db.orders().get(order_id).await.unwrap().unwrap();
            match payment {
                Some(_) => {
                    assert_eq!(order.order_status, OrderStatus::Pending);
                    paid_orders += 1;
                }
                None => assert_eq!(order.order_status, OrderStatus::Cancelled),
            }
        }

        // each paid order still holds its 2 units
        assert_eq!(
            shop.db.stock().get_available(shop.branch, shop.product_a).await.unwrap(),
            100 - 2 * paid_orders
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_only_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let shop = pharmacy(file_db(&dir).await, 10, 5).await;
        let (order_id, total) = paid_order_fixture(&shop).await;

        let mut handles = Vec::new();
        for method in 1..=4 {
            let payments = shop.db.payments();
            handles.push(tokio::spawn(async move {
                payments.record_payment(order_id, method, total, None).await
            }));
        }

        let mut recorded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => recorded += 1,
                Err(err) => assert_eq!(
                    err.rejection(),
                    Some(&CoreError::DuplicatePayment { order_id })
                ),
            }
        }
        assert_eq!(recorded, 1);
    }
}
