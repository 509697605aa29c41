//! # Order Commands
//!
//! Checkout turns a cart into a Pending order in one transaction; the
//! rest of the lifecycle is driven by `order_status` and `cancel_order`.

use apotheca_core::{BranchId, CustomerId, Order, OrderId, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::Outcome;
use crate::error::ApiError;
use crate::state::{CounterConfig, DbState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub formatted_total: String,
}

async fn order_outcome(
    db: &DbState,
    config: &CounterConfig,
    order: Order,
) -> Result<Outcome, ApiError> {
    let items = db.inner().orders().items(order.order_id).await?;

    let outcome = Outcome {
        order_id: Some(order.order_id),
        total_amount: Some(order.total_amount),
        ..Outcome::ok()
    }
    .with_message(order.order_status.as_str());

    outcome.with_data(&OrderResponse {
        formatted_total: config.format_currency(order.total_amount),
        order,
        items,
    })
}

/// Converts the customer's cart into an order at `branch_id`, or at the
/// home branch when none is given.
pub async fn checkout(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
    branch_id: Option<BranchId>,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(customer_id, branch_id, "checkout command");

    let receipt = db.inner().orders().checkout(customer_id, branch_id).await?;
    info!(
        order_id = receipt.order_id,
        total = %config.format_currency(receipt.total_amount),
        "Checkout complete"
    );

    let message = if receipt.requires_prescription.is_empty() {
        format!("Order {} created", receipt.order_id)
    } else {
        format!(
            "Order {} created; {} line(s) need a prescription",
            receipt.order_id,
            receipt.requires_prescription.len()
        )
    };

    Outcome {
        order_id: Some(receipt.order_id),
        total_amount: Some(receipt.total_amount),
        ..Outcome::ok()
    }
    .with_message(message)
    .with_data(&receipt)
}

/// Cancels an order and returns its reserved units to the branch.
pub async fn cancel_order(
    db: &DbState,
    config: &CounterConfig,
    order_id: OrderId,
) -> Result<Outcome, ApiError> {
    debug!(order_id, "cancel_order command");

    let order = db.inner().orders().cancel(order_id).await?;
    order_outcome(db, config, order).await
}

/// Shows an order, or advances it to `status` when one is given.
pub async fn order_status(
    db: &DbState,
    config: &CounterConfig,
    order_id: OrderId,
    status: Option<OrderStatus>,
) -> Result<Outcome, ApiError> {
    debug!(order_id, ?status, "order_status command");

    let orders = db.inner().orders();
    let order = match status {
        Some(next) => orders.update_status(order_id, next).await?,
        None => orders
            .get(order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?,
    };

    order_outcome(db, config, order).await
}
