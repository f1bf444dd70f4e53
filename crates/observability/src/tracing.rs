//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Default filter: ledger at info, sqlx query logging kept quiet.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initialize tracing/logging for the process.
///
/// JSON lines to stdout, filterable via `RUST_LOG`. Safe to call multiple
/// times (subsequent calls are no-ops), so tests can call it freely.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
