//! Diagnostic logging setup
//!
//! Colorized/structured presentation of debug output is an external
//! collaborator per spec.md §1; this module only wires `tracing` macros
//! used throughout the core into a process-wide subscriber.

/// Initialize tracing for simulator diagnostics.
///
/// Call once at the start of `main`. `verbose` raises the level from
/// `warn` to `debug`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
