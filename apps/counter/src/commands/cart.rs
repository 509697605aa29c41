//! # Cart Commands
//!
//! ## Cart Lifecycle
//! ```text
//! ┌──────────┐  add_to_cart   ┌──────────┐   checkout    ┌──────────┐
//! │  Empty   │───────────────►│ In Cart  │──────────────►│  Order   │
//! │  Cart    │◄───────────────│          │               │ (Pending)│
//! └──────────┘   clear_cart   └──────────┘               └──────────┘
//!                                  │ ▲
//!                  remove_from_cart│ │add_to_cart (accumulates)
//!                                  ▼ │
//! ```
//!
//! Cart lines are always priced at today's catalog price. The price is only
//! frozen when the order is created.

use apotheca_core::{CartLineView, CartTotals, CustomerId, ProductId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::Outcome;
use crate::error::ApiError;
use crate::state::{CounterConfig, DbState};

/// Cart response including lines and totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
    pub formatted_subtotal: String,
}

async fn cart_outcome(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
) -> Result<Outcome, ApiError> {
    let lines = db.carts(config).get_lines(customer_id).await?;
    let totals = CartTotals::from_lines(&lines);

    let response = CartResponse {
        customer_id,
        formatted_subtotal: config.format_currency(totals.subtotal),
        lines,
        totals,
    };

    let outcome = Outcome {
        total_amount: Some(totals.subtotal),
        ..Outcome::ok()
    };
    outcome.with_data(&response)
}

/// Adds a product to the cart. Repeated adds increase the line quantity.
pub async fn add_to_cart(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
    product_id: ProductId,
    quantity: i64,
) -> Result<Outcome, ApiError> {
    debug!(customer_id, product_id, quantity, "add_to_cart command");

    let line = db
        .carts(config)
        .add(customer_id, product_id, quantity)
        .await?;

    Ok(cart_outcome(db, config, customer_id)
        .await?
        .with_message(format!("{} in cart", line.quantity)))
}

pub async fn view_cart(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
) -> Result<Outcome, ApiError> {
    debug!(customer_id, "view_cart command");
    cart_outcome(db, config, customer_id).await
}

pub async fn remove_from_cart(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
    product_id: ProductId,
) -> Result<Outcome, ApiError> {
    debug!(customer_id, product_id, "remove_from_cart command");

    if !db.carts(config).remove(customer_id, product_id).await? {
        return Err(ApiError::not_found("Cart line for product", product_id));
    }

    cart_outcome(db, config, customer_id).await
}

pub async fn clear_cart(
    db: &DbState,
    config: &CounterConfig,
    customer_id: CustomerId,
) -> Result<Outcome, ApiError> {
    debug!(customer_id, "clear_cart command");

    let removed = db.carts(config).clear(customer_id).await?;
    Ok(Outcome::ok().with_message(format!("Removed {} lines", removed)))
}
