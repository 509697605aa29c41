//! # Apotheca Counter Library
//!
//! The counter service: a JSON-lines front end over the checkout core.
//!
//! ## Module Organization
//! ```text
//! apotheca_counter/
//! ├── lib.rs          ◄─── You are here (startup & request loop)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   └── config.rs   ◄─── Configuration from the environment
//! ├── commands/
//! │   ├── mod.rs      ◄─── Request parsing, dispatch, Outcome
//! │   ├── cart.rs     ◄─── Cart commands
//! │   ├── order.rs    ◄─── Checkout and order lifecycle
//! │   ├── payment.rs  ◄─── Payments and refunds
//! │   ├── stock.rs    ◄─── Stock queries and adjustments
//! │   └── prescription.rs
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Protocol
//! ```text
//! stdin  ─► {"command":"checkout","customer_id":42,"branch_id":1}
//! stdout ◄─ {"success":true,"order_id":9,"total_amount":25000,...}
//! ```
//!
//! One request per line, one response per line, in order. Logs go to
//! stderr so stdout carries only responses.

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use apotheca_db::{Database, DbConfig};
use state::{CounterConfig, DbState};

/// Runs the counter until stdin is closed.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = CounterConfig::load()?;
    info!(
        store = %config.store_name,
        home_branch = config.home_branch,
        currency = %config.currency,
        "Starting Apotheca counter"
    );

    let db_path = get_database_path(&config)?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path).max_connections(config.max_connections)).await?;
    info!("Database connected and migrations applied");

    let db = DbState::new(db);
    let stdin = BufReader::new(tokio::io::stdin());
    serve(&db, &config, stdin, tokio::io::stdout()).await?;

    db.inner().close().await;
    info!("Counter stopped");
    Ok(())
}

/// Answers each request line on `reader` with one response line on `writer`.
///
/// Blank lines are skipped. A line that is not a valid request gets a
/// failure response; the loop only stops at EOF or on an I/O error.
pub async fn serve<R, W>(
    db: &DbState,
    config: &CounterConfig,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id);
        let outcome = commands::handle_line(db, config, &line)
            .instrument(span)
            .await;

        let mut response = serde_json::to_string(&outcome)?;
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
        debug!(%request_id, success = outcome.success, "Response written");
    }

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=apotheca_db=trace` - Show trace for the storage layer only
/// - Default: INFO, DEBUG for apotheca crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,apotheca=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.apotheca.counter/apotheca.db`
/// - **Windows**: `%APPDATA%\apotheca\counter\apotheca.db`
/// - **Linux**: `~/.local/share/counter/apotheca.db`
///
/// `APOTHECA_DB_PATH` overrides the platform default.
fn get_database_path(config: &CounterConfig) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "apotheca", "counter")
        .ok_or("Could not determine app data directory")?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("apotheca.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::counter;
    use crate::commands::Outcome;

    #[tokio::test]
    async fn test_serve_answers_each_line_in_order() {
        let shop = counter().await;
        let input = format!(
            "{}\n\n{}\nnot json\n",
            r#"{"command":"payment_methods"}"#,
            serde_json::json!({"command": "add_to_cart", "customer_id": 42, "product_id": shop.otc}),
        );

        let mut output = Vec::new();
        serve(&shop.db, &shop.config, input.as_bytes(), &mut output)
            .await
            .unwrap();

        let responses: Vec<Outcome> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert!(responses[0].success);
        assert!(responses[1].success);
        assert!(!responses[2].success);
    }
}
