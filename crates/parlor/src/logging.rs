//! Log output for binaries and tests.
//!
//! The library crates only emit `tracing` events. Something has to install
//! a subscriber to see them; these helpers install a `fmt` subscriber
//! filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"`
/// or `"parlor_session=debug"`) is used. Returns `false` if a subscriber
/// was already installed, in which case nothing changes.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .try_init()
        .is_ok()
}

/// Like [`init`], but writes through the test harness so output is
/// captured per test. Safe to call from every test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}
