//! Shared helpers for the `runnerd` test suite: tracing setup, timeouts,
//! spec builders, and a fake launcher that needs no OS processes.

pub mod builders;
pub mod fake_launcher;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing once for the whole test binary.
///
/// Uses `with_test_writer()`, so output is captured per-test and only shown
/// for failures (unless `-- --nocapture`). Levels via `RUST_LOG`, e.g.
/// `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
///
/// Every wait in the suite goes through this so a regression in the
/// exit-vs-disconnect multiplex shows up as a failed test, not a hung one.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5 seconds")
}
