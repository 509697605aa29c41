//! # Database State
//!
//! Wraps the `Database` connection for use in counter commands.
//!
//! The `Database` from `apotheca-db` contains a `SqlitePool`, so multiple
//! commands can run queries concurrently without explicit locking.

use apotheca_db::{CartStore, Database};

use crate::state::CounterConfig;

/// Wrapper around `Database` for command handlers.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    /// Cart store checking stock at the configured home branch.
    pub fn carts(&self, config: &CounterConfig) -> CartStore {
        self.db.carts().with_home_branch(config.home_branch)
    }
}
