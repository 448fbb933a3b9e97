//! Log output setup for binaries and tests embedding the session.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_level` when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed, which is the
/// normal case when several tests call this.
pub fn init(default_level: LevelFilter) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Test-friendly variant writing through the test harness capture.
pub fn init_for_tests() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
