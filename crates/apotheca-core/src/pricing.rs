//! # Order Pricing
//!
//! Turns cart lines priced at the catalog's current prices into the frozen
//! line items and total of an order.
//!
//! ```text
//! (product, qty, live unit_price) ──► DraftItem { unit_price, subtotal }
//!                                          │
//!                                          ▼
//!                               OrderDraft.total = Σ subtotal
//! ```
//!
//! Pricing happens inside the checkout transaction, after stock has been
//! reserved, so the snapshot price is the one in the catalog at commit time.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::ProductId;
use crate::validation::validate_quantity;

/// A cart line joined with the product's current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub requires_prescription: bool,
}

impl PricedLine {
    pub fn new(
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
        requires_prescription: bool,
    ) -> Self {
        PricedLine {
            product_id,
            quantity,
            unit_price,
            requires_prescription,
        }
    }
}

/// An order line ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Lines and total of an order about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<DraftItem>,
    pub total: Money,
    pub requires_prescription: Vec<ProductId>,
}

/// Prices every line and sums the order total.
///
/// Fails when a quantity is not positive or an amount overflows. An empty
/// slice yields an empty draft; rejecting empty carts is the caller's job
/// because only the caller knows the customer.
pub fn build_order_draft(lines: &[PricedLine]) -> CoreResult<OrderDraft> {
    let mut draft = OrderDraft {
        items: Vec::with_capacity(lines.len()),
        ..OrderDraft::default()
    };

    for line in lines {
        validate_quantity(line.quantity)?;

        let subtotal = line
            .unit_price
            .checked_times(line.quantity)
            .ok_or_else(|| overflow(line.product_id))?;

        draft.total = draft
            .total
            .checked_add(subtotal)
            .ok_or_else(|| overflow(line.product_id))?;

        draft.items.push(DraftItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal,
        });

        if line.requires_prescription {
            draft.requires_prescription.push(line.product_id);
        }
    }

    Ok(draft)
}

fn overflow(product_id: ProductId) -> CoreError {
    CoreError::InvalidAmount {
        reason: format!("order total overflows at product {product_id}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
