//! # Repository Module
//!
//! Database repository implementations for Apotheca.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Through the Repositories                    │
//! │                                                                         │
//! │  CartStore.add ──────────► cart_lines (advisory stock check only)       │
//! │                                                                         │
//! │  OrderBuilder.checkout ──► ONE TRANSACTION                              │
//! │       │                    ├── take + clear cart_lines                  │
//! │       │                    ├── StockLedger reserve per line             │
//! │       │                    ├── price lines at catalog prices            │
//! │       │                    └── insert orders + order_items              │
//! │       ▼                                                                 │
//! │  PaymentRecorder.record_payment ──► payments (UNIQUE order_id)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StockLedger`](stock::StockLedger) - Per-branch stock with atomic reserve
//! - [`CartStore`](cart::CartStore) - Per-customer pending quantities
//! - [`OrderBuilder`](order::OrderBuilder) - Checkout and order lifecycle
//! - [`PaymentRecorder`](payment::PaymentRecorder) - One payment per order
//! - [`ProductCatalog`](product::ProductCatalog) - Products and prices
//! - [`BranchDirectory`](branch::BranchDirectory) - Branch locations
//! - [`PrescriptionRegister`](prescription::PrescriptionRegister) - Prescription review

pub mod branch;
pub mod cart;
pub mod order;
pub mod payment;
pub mod prescription;
pub mod product;
pub mod stock;
