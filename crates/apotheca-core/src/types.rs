//! # Domain Types
//!
//! Core domain types of the pharmacy inventory and checkout subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockRecord    │   │    CartLine     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  branch_id  ┐   │   │  customer_id ┐  │   │  order_id       │       │
//! │  │  product_id ┘key│   │  product_id  ┘  │   │  customer_id    │       │
//! │  │  quantity ≥ 0   │   │  quantity > 0   │   │  branch_id      │       │
//! │  │  last_restocked │   │  reserved_at    │   │  order_status   │       │
//! │  └─────────────────┘   └─────────────────┘   │  total_amount   │       │
//! │                                              └────────┬────────┘       │
//! │                                     ┌─────────────────┼──────────┐     │
//! │                                     ▼                 ▼          ▼     │
//! │                          ┌─────────────────┐ ┌──────────────┐ ┌─────┐ │
//! │                          │   OrderItem     │ │   Payment    │ │ Rx  │ │
//! │                          │  (price frozen) │ │  (1 : 1)     │ │     │ │
//! │                          └─────────────────┘ └──────────────┘ └─────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Live Price vs Frozen Price
//! A [`CartLineView`] always carries the product's *current* price. An
//! [`OrderItem`] freezes the price at checkout and is never rewritten, so
//! later catalog edits cannot alter historical orders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

pub type BranchId = i64;
pub type ProductId = i64;
pub type CustomerId = i64;
pub type OrderId = i64;
pub type OrderItemId = i64;
pub type PaymentId = i64;
pub type PaymentMethodId = i64;
pub type PrescriptionId = i64;
pub type PharmacistId = i64;

// =============================================================================
// Product Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    /// Current list price. Carts read this live; orders snapshot it.
    pub unit_price: Money,
    /// Dispensing requires a validated prescription.
    pub requires_prescription: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub unit_price: Money,
    #[serde(default)]
    pub requires_prescription: bool,
}

/// Administrative edit of a product.
///
/// Only fields that are `Some` are written; the repository emits one
/// `SET` clause per present field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub unit_price: Option<Money>,
    pub requires_prescription: Option<bool>,
}

impl ProductPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.manufacturer.is_none()
            && self.unit_price.is_none()
            && self.requires_prescription.is_none()
    }
}

// =============================================================================
// Branch Directory
// =============================================================================

/// A physical pharmacy location with its own stock counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub branch_id: BranchId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBranch {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Stock of one product at one branch (a SKU).
///
/// `quantity_in_stock` is never negative; the storage layer enforces it with
/// a `CHECK` constraint in addition to the conditional decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockRecord {
    pub branch_id: BranchId,
    pub product_id: ProductId,
    pub quantity_in_stock: i64,
    #[ts(as = "String")]
    pub last_restocked: NaiveDate,
}

/// A stock record joined with its catalog data, for branch listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryLine {
    pub branch_id: BranchId,
    pub product_id: ProductId,
    pub product_name: String,
    pub category: Option<String>,
    pub unit_price: Money,
    pub requires_prescription: bool,
    pub quantity_in_stock: i64,
    #[ts(as = "String")]
    pub last_restocked: NaiveDate,
}

/// Stock valuation of one branch at current list prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryValuation {
    pub sku_count: i64,
    pub total_units: i64,
    pub value: Money,
}

// =============================================================================
// Cart Store
// =============================================================================

/// Pending purchase quantity of one product by one customer.
///
/// `reserved_at` records when the line was first added. Nothing is
/// reserved in the Stock Ledger until checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: i64,
    #[ts(as = "String")]
    pub reserved_at: DateTime<Utc>,
}

/// A cart line priced at the product's current list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_subtotal: Money,
    pub requires_prescription: bool,
}

/// Summary of a cart at live prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    /// Distinct products.
    pub line_count: usize,
    /// Sum of quantities.
    pub item_count: i64,
    pub subtotal: Money,
    pub requires_prescription: bool,
}

impl CartTotals {
    pub fn from_lines(lines: &[CartLineView]) -> Self {
        CartTotals {
            line_count: lines.len(),
            item_count: lines.iter().map(|l| l.quantity).sum(),
            subtotal: lines.iter().map(|l| l.line_subtotal).sum(),
            requires_prescription: lines.iter().any(|l| l.requires_prescription),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
///  Pending ──► Processing ──► Ready ──► Completed
///     │            │            │
///     └────────────┴────────────┴──────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Processing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Completed and Cancelled orders never change again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub const fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Ready)
                | (Ready, Completed)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Ready, Cancelled)
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order created by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub branch_id: BranchId,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub total_amount: Money,
}

/// A line of an order. Snapshot pattern: written once at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub order_item_id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price at time of checkout (frozen).
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub subtotal: Money,
}

/// What checkout hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub branch_id: BranchId,
    pub total_amount: Money,
    pub line_count: usize,
    /// Products in the order that must be dispensed against a prescription.
    pub requires_prescription: Vec<ProductId>,
}

// =============================================================================
// Payment
// =============================================================================

/// Lifecycle of a payment.
///
/// ```text
///  Pending ──► Completed ──► Refunded
///     │
///     └──────► Failed
/// ```
///
/// Payments are currently always created as `Completed`; `Pending` and
/// `Failed` are reachable only through a payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
#[ts(export)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }
}

/// A payment method offered at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub method_id: PaymentMethodId,
    pub method_name: String,
    pub description: Option<String>,
}

/// The single payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub method_id: PaymentMethodId,
    pub amount: Money,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    /// External reference (card auth code, wallet transaction id).
    pub transaction_reference: Option<String>,
}

// =============================================================================
// Prescriptions
// =============================================================================

/// Review state of a prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
#[ts(export)]
pub enum ValidationStatus {
    Pending,
    Validated,
    Rejected,
}

/// A prescription presented for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Prescription {
    pub prescription_id: PrescriptionId,
    pub order_id: OrderId,
    pub pharmacist_id: Option<PharmacistId>,
    pub prescription_number: String,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    pub validation_status: ValidationStatus,
    #[ts(as = "Option<String>")]
    pub validation_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPrescription {
    pub order_id: OrderId,
    pub prescription_number: String,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_forward_path() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Completed));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_order_status_cancellation() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            assert!(all.iter().all(|to| !from.can_transition_to(*to)));
        }
    }

    #[test]
    fn test_payment_refund_only_from_completed() {
        assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn test_status_serializes_as_pascal_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"Processing\""
        );
        assert_eq!(OrderStatus::Cancelled.as_str(), "Cancelled");
        let status: PaymentStatus = serde_json::from_str("\"Refunded\"").unwrap();
        assert_eq!(status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_cart_totals_from_lines() {
        let lines = vec![
            CartLineView {
                product_id: 1,
                product_name: "Paracetamol 500mg".into(),
                quantity: 2,
                unit_price: Money::from_minor(10),
                line_subtotal: Money::from_minor(20),
                requires_prescription: false,
            },
            CartLineView {
                product_id: 2,
                product_name: "Amoxicillin 250mg".into(),
                quantity: 1,
                unit_price: Money::from_minor(5),
                line_subtotal: Money::from_minor(5),
                requires_prescription: true,
            },
        ];

        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.subtotal, Money::from_minor(25));
        assert!(totals.requires_prescription);
        assert_eq!(CartTotals::from_lines(&[]), CartTotals::default());
    }

    #[test]
    fn test_product_patch_is_empty() {
        assert!(ProductPatch::default().is_empty());
        let patch = ProductPatch {
            unit_price: Some(Money::from_minor(1200)),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
