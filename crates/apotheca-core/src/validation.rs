//! # Validation Module
//!
//! Input validation for the counter and storage layers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Counter command (serde)                                       │
//! │  └── Type validation (deserialization)                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Business rules, checked before any storage access                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity_in_stock >= 0), CHECK (quantity > 0)               │
//! │  ├── UNIQUE (branch_id, product_id), UNIQUE (order_id) on payments      │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use apotheca_core::validation::{validate_cart_quantity, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//!
//! // 990 already in the cart, adding 20 would exceed the per-line cap
//! assert!(validate_cart_quantity(990, 20).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::ProductPatch;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Validates a branch name: non-empty, at most 100 characters.
pub fn validate_branch_name(name: &str) -> ValidationResult<()> {
    validate_name("branch name", name, 100)
}

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a prescription number.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and slashes only
///
/// ```rust
/// use apotheca_core::validation::validate_prescription_number;
///
/// assert!(validate_prescription_number("RX-2024/0193").is_ok());
/// assert!(validate_prescription_number("RX 1").is_err());
/// ```
pub fn validate_prescription_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::required("prescription number"));
    }

    if number.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "prescription number".to_string(),
            max: 50,
        });
    }

    if !number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "prescription number".to_string(),
            reason: "must contain only letters, digits, hyphens and slashes".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an add-to-cart request against what the line already holds.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Customer adds 3 (already has 2 in cart)                                │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_cart_quantity(2, 3) ← THIS FUNCTION                           │
/// │       │                                                                 │
/// │       ├── added <= 0?        → Validation(MustBePositive)               │
/// │       ├── 2 + 3 > 999?       → QuantityTooLarge                         │
/// │       └── OK → cumulative 5, advisory stock check next                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_cart_quantity(existing: i64, added: i64) -> CoreResult<i64> {
    if added <= 0 {
        return Err(ValidationError::must_be_positive("quantity").into());
    }

    let cumulative = existing.saturating_add(added);
    if cumulative > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: cumulative,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(cumulative)
}

/// Validates that a new product line fits in the cart.
///
/// `current_lines` is the number of distinct products already present.
pub fn validate_cart_size(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free samples).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount: must be positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive("payment amount"));
    }

    Ok(())
}

/// Validates a restock delta: must be positive.
pub fn validate_restock_delta(delta: i64) -> ValidationResult<()> {
    if delta <= 0 {
        return Err(ValidationError::must_be_positive("restock quantity"));
    }

    Ok(())
}

/// Validates an absolute stock count (initial stock, count correction).
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity in stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the fields present in a product patch.
pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }

    if let Some(price) = patch.unit_price {
        validate_price(price)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
