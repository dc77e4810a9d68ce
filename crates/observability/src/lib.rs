//! Tracing and logging (shared setup).

/// Initialize process-wide logging from `LOG_FORMAT` and `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(logging::LogFormat::from_env());
}

/// Subscriber configuration (format, filters).
pub mod logging;
