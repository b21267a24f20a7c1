//! Shared fixtures for harness integration tests

pub mod flaky;

pub use flaky::{FailPoint, FlakyBackend};

/// Install a test subscriber once per process
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("vaultstress_harness=debug")
        .with_test_writer()
        .try_init();
}
