//! Process-wide tracing setup shared by binaries and integration tests.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(subscriber::LogFormat::from_env());
}

/// Subscriber configuration (filter, output format).
pub mod subscriber;
