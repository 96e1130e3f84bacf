//! Diagnostic logging setup.
use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "EASEL_LOG";

/// Install a compact stderr subscriber. The filter comes from `EASEL_LOG`
/// (e.g. `EASEL_LOG=easel=debug`) and defaults to `warn`. Calling this more
/// than once, or after another subscriber was installed, does nothing.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Fails only if a global subscriber already exists.
    drop(
        tracing_subscriber::fmt()
            .compact()
            .without_time()
            .with_writer(io::stderr)
            .with_env_filter(filter)
            .try_init(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        init();
        init();
        tracing::warn!("logging initialised twice");
    }
}
