//! # State Module
//!
//! State shared by every counter command.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐            ┌──────────────────────┐                   │
//! │  │   DbState    │            │    CounterConfig     │                   │
//! │  │              │            │                      │                   │
//! │  │  Database    │            │  home_branch         │                   │
//! │  │  (SQLite     │            │  currency            │                   │
//! │  │   pool)      │            │  low_stock_threshold │                   │
//! │  └──────────────┘            └──────────────────────┘                   │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • DbState: Database has internal connection pool (thread-safe)         │
//! │  • CounterConfig: Read-only after startup                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Carts live in the database, not in process memory, so there is no cart
//! state here.

mod config;
mod db;

pub use config::{ConfigError, CounterConfig};
pub use db::DbState;
