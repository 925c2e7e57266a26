//! Structured logging for test runs.

/// Install a `tracing` subscriber for the current test binary.
///
/// Filtering follows `RUST_LOG` and defaults to `warn`, which shows discarded validation failures
/// and unused stubs. Output goes through the test writer so `cargo test` captures it per test.
/// Calling this more than once (or after another subscriber was installed) is a no-op.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
