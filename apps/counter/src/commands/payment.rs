//! # Payment Commands
//!
//! Every order takes exactly one payment. Refunding it does not return
//! stock; cancel the order for that.

use apotheca_core::{CoreError, Money, OrderId, PaymentId, PaymentMethodId};
use tracing::{debug, info};

use crate::commands::Outcome;
use crate::error::ApiError;
use crate::state::{CounterConfig, DbState};

/// Records the order's payment. Without an explicit `amount` the order
/// total is charged.
pub async fn record_payment(
    db: &DbState,
    config: &CounterConfig,
    order_id: OrderId,
    method_id: PaymentMethodId,
    amount: Option<Money>,
    reference: Option<String>,
) -> Result<Outcome, ApiError> {
    debug!(order_id, method_id, "record_payment command");

    let order = db
        .inner()
        .orders()
        .get(order_id)
        .await?
        .ok_or(CoreError::OrderNotFound(order_id))?;
    let amount = amount.unwrap_or(order.total_amount);

    let payment = db
        .inner()
        .payments()
        .record_payment(order_id, method_id, amount, reference)
        .await?;
    info!(payment_id = payment.payment_id, order_id, "Payment taken");

    Outcome {
        order_id: Some(order_id),
        total_amount: Some(order.total_amount),
        payment_id: Some(payment.payment_id),
        ..Outcome::ok()
    }
    .with_message(format!("Paid {}", config.format_currency(payment.amount)))
    .with_data(&payment)
}

pub async fn refund(
    db: &DbState,
    config: &CounterConfig,
    payment_id: PaymentId,
) -> Result<Outcome, ApiError> {
    debug!(payment_id, "refund command");

    let payment = db.inner().payments().refund(payment_id).await?;

    Outcome {
        order_id: Some(payment.order_id),
        payment_id: Some(payment.payment_id),
        ..Outcome::ok()
    }
    .with_message(format!("Refunded {}", config.format_currency(payment.amount)))
    .with_data(&payment)
}

pub async fn payment_methods(db: &DbState) -> Result<Outcome, ApiError> {
    let methods = db.inner().payments().methods().await?;
    Outcome::ok().with_data(&methods)
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::counter;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_payment_methods() {
        let shop = counter().await;
        let outcome = shop.send(json!({"command": "payment_methods"})).await;

        let data = outcome.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 4);
        assert_eq!(data[0]["method_name"], json!("Cash"));
    }

    #[tokio::test]
    async fn test_pay_then_refund_once() {
        let shop = counter().await;
        shop.send(json!({"command": "add_to_cart", "customer_id": 42, "product_id": shop.otc}))
            .await;
        let order_id = shop
            .send(json!({"command": "checkout", "customer_id": 42}))
            .await
            .order_id
            .unwrap();

        let paid = shop
            .send(json!({
                "command": "record_payment",
                "order_id": order_id,
                "method_id": 3,
                "reference": "POS-0001"
            }))
            .await;
        assert_eq!(paid.message.as_deref(), Some("Paid 10 VND"));
        let payment_id = paid.payment_id.unwrap();

        let refunded = shop.send(json!({"command": "refund", "payment_id": payment_id})).await;
        assert!(refunded.success);
        assert_eq!(refunded.data.unwrap()["payment_status"], json!("Refunded"));

        let again = shop.send(json!({"command": "refund", "payment_id": payment_id})).await;
        assert_eq!(again.code, Some(ErrorCode::InvalidTransition));
    }

    #[tokio::test]
    async fn test_cancelled_order_is_not_charged() {
        let shop = counter().await;
        shop.send(json!({"command": "add_to_cart", "customer_id": 42, "product_id": shop.otc, "quantity": 2}))
            .await;
        let order_id = shop
            .send(json!({"command": "checkout", "customer_id": 42}))
            .await
            .order_id
            .unwrap();
        shop.send(json!({"command": "cancel_order", "order_id": order_id})).await;

        let outcome = shop
            .send(json!({"command": "record_payment", "order_id": order_id, "method_id": 1}))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(ErrorCode::InvalidTransition));
        assert!(outcome.payment_id.is_none());
    }

    #[tokio::test]
    async fn test_payment_for_unknown_order() {
        let shop = counter().await;
        let outcome = shop
            .send(json!({"command": "record_payment", "order_id": 404, "method_id": 1}))
            .await;
        assert_eq!(outcome.code, Some(ErrorCode::NotFound));
    }
}
