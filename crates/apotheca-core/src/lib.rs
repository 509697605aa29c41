//! # apotheca-core: Pure Business Logic for the Pharmacy Counter
//!
//! This crate holds the domain model of the inventory reservation and
//! order-checkout subsystem as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Apotheca Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Counter front end (apps/counter)                │   │
//! │  │    add_to_cart ──► checkout ──► record_payment ──► refund       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ apotheca-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │ OrderDraft│  │   rules   │  │   │
//! │  │   │  Payment  │  │           │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apotheca-db (Database Layer)                    │   │
//! │  │     Stock Ledger, Cart Store, Order Builder, Payment Recorder   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockRecord, CartLine, Order, Payment, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Snapshot pricing of cart lines into an order draft
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use apotheca_core::money::Money;
//! use apotheca_core::pricing::{build_order_draft, PricedLine};
//!
//! let lines = [
//!     PricedLine::new(1, 2, Money::from_minor(1000), false),
//!     PricedLine::new(2, 1, Money::from_minor(500), false),
//! ];
//!
//! let draft = build_order_draft(&lines).unwrap();
//! assert_eq!(draft.total.minor_units(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Branch used for the advisory stock check when a customer adds to cart.
///
/// Carts are not bound to a branch; the branch is only chosen at checkout.
/// The counter front end can override this per deployment.
pub const DEFAULT_HOME_BRANCH_ID: BranchId = 1;

/// Maximum distinct products allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Stock level at or below which a SKU is reported as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
