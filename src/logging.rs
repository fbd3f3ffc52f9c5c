//! Diagnostic tracing for the workflow engine.
//!
//! Tracing output goes to stderr and is separate from the agent's own
//! output, which is inherited by the terminal. Progress lines meant for the
//! user are printed by the command modules, not through tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "SPECFLOW_LOG";

/// Initialize the tracing subscriber.
///
/// Reads `SPECFLOW_LOG`, then `RUST_LOG`. Without either the level is
/// `warn`, or `info` when `verbose` is set.
///
/// # Example
/// ```bash
/// SPECFLOW_LOG=specflow=debug specflow implement --tasks
/// ```
pub fn init(verbose: bool) {
    let filter = build_filter(verbose);

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "info");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
