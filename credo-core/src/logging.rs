//! Tracing subscriber setup.
//!
//! Call one of these once, before building the `App`:
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     credo_core::logging::init_logging();
//!
//!     let app = credo_core::App::new().await?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The filter comes from `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=credo_core=debug,tower_http=debug,sqlx=warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Human-readable logs on stdout.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// One JSON object per line, for log aggregation in production.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_json() {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Best-effort subscriber for tests: later calls are ignored.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
