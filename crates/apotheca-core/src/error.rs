//! # Error Types
//!
//! Domain-specific error types for apotheca-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  apotheca-core errors (this file)                                       │
//! │  ├── CoreError        - Recoverable business rejections                 │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  apotheca-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures + Rejected(CoreError)          │
//! │                                                                         │
//! │  counter errors (in app)                                                │
//! │  └── ApiError         - What the UI layer sees (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant of [`CoreError`] is recoverable: it is returned before any
//! mutation is committed, so callers can always assume state is untouched.

use thiserror::Error;

use crate::types::{
    BranchId, CustomerId, OrderId, OrderStatus, PaymentId, PaymentStatus, PrescriptionId,
    ProductId, ValidationStatus,
};

// =============================================================================
// Core Error
// =============================================================================

/// Core business errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Not enough stock to satisfy a reservation or an advisory check.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (line qty: 100)
    ///      │
    ///      ▼
    /// reserve(branch 1, product 7, 100): available=5
    ///      │
    ///      ▼
    /// InsufficientStock { available: 5, requested: 100 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 units of product 7 in stock"
    /// ```
    #[error(
        "Insufficient stock for product {product_id} at branch {branch_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        branch_id: BranchId,
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// The branch has no stock record for the product.
    #[error("Product {product_id} is not carried at branch {branch_id}")]
    NotCarried {
        branch_id: BranchId,
        product_id: ProductId,
    },

    /// The product is unknown to the catalog or has never been stocked.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The branch is unknown to the branch directory.
    #[error("Unknown branch: {0}")]
    UnknownBranch(BranchId),

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty for customer {customer_id}")]
    EmptyCart { customer_id: CustomerId },

    /// The (branch, product) SKU already has a stock record.
    #[error("Product {product_id} is already stocked at branch {branch_id}")]
    DuplicateSku {
        branch_id: BranchId,
        product_id: ProductId,
    },

    /// The order already has its one payment.
    #[error("Order {order_id} already has a payment")]
    DuplicatePayment { order_id: OrderId },

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Payment cannot be found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Payment method cannot be found.
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(i64),

    /// Prescription cannot be found.
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(PrescriptionId),

    /// Order status change not allowed by the order lifecycle.
    #[error("Order {order_id} cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// A cancelled order has returned its stock and cannot be paid.
    #[error("Order {0} is cancelled")]
    OrderCancelled(OrderId),

    /// An order with a completed payment cannot be cancelled until the
    /// payment is refunded.
    #[error("Order {order_id} has completed payment {payment_id}; refund it first")]
    OrderPaid {
        order_id: OrderId,
        payment_id: PaymentId,
    },

    /// Payment status change not allowed by the payment lifecycle.
    #[error("Payment {payment_id} cannot move from {from:?} to {to:?}")]
    InvalidPaymentTransition {
        payment_id: PaymentId,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Prescription numbers are unique across all orders.
    #[error("Prescription number '{0}' is already registered")]
    DuplicatePrescription(String),

    /// Prescription has already been reviewed.
    #[error("Prescription {prescription_id} is already {status:?}")]
    PrescriptionAlreadyReviewed {
        prescription_id: PrescriptionId,
        status: ValidationStatus,
    },

    /// A SKU still holding stock cannot be removed from a branch.
    #[error("Product {product_id} at branch {branch_id} still has {remaining} units")]
    StockRemaining {
        branch_id: BranchId,
        product_id: ProductId,
        remaining: i64,
    },

    /// Cart has exceeded maximum allowed distinct products.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A monetary amount could not be represented.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., prescription number with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            branch_id: 1,
            product_id: 7,
            available: 5,
            requested: 100,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 7 at branch 1: available 5, requested 100"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_transition_message_names_both_states() {
        let err = CoreError::InvalidPaymentTransition {
            payment_id: 3,
            from: PaymentStatus::Failed,
            to: PaymentStatus::Refunded,
        };
        assert_eq!(err.to_string(), "Payment 3 cannot move from Failed to Refunded");
    }

    #[test]
    fn test_paid_order_message_points_to_refund() {
        let err = CoreError::OrderPaid {
            order_id: 9,
            payment_id: 4,
        };
        assert_eq!(err.to_string(), "Order 9 has completed payment 4; refund it first");
    }
}
