//! # apotheca-db: Database Layer for Apotheca
//!
//! SQLite storage for the pharmacy inventory and checkout subsystem, built
//! on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Apotheca Data Flow                               │
//! │                                                                         │
//! │  Counter command (checkout)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   apotheca-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockLedger   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ CartStore     │    │ 002_pay.sql  │  │   │
//! │  │   │ WAL + busy    │    │ OrderBuilder  │    │              │  │   │
//! │  │   │ timeout       │    │ PaymentRec.   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (platform data dir or APOTHECA_DB_PATH)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Stock ledger, carts, orders, payments and catalog
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apotheca_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("apotheca.db")).await?;
//!
//! db.carts().add(42, 7, 2).await?;
//! let receipt = db.orders().checkout(42, 1).await?;
//! db.payments().record_payment(receipt.order_id, 1, receipt.total_amount, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::branch::BranchDirectory;
pub use repository::cart::CartStore;
pub use repository::order::OrderBuilder;
pub use repository::payment::PaymentRecorder;
pub use repository::prescription::PrescriptionRegister;
pub use repository::product::ProductCatalog;
pub use repository::stock::StockLedger;
