//! # Apotheca Counter Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging to stderr)
//! 2. Load configuration from `APOTHECA_*` environment variables
//! 3. Connect to database & run migrations
//! 4. Serve JSON-lines requests from stdin until EOF

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs for better testability
    match apotheca_counter::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("apotheca-counter: {e}");
            ExitCode::FAILURE
        }
    }
}
