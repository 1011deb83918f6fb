//! Log output for binaries and tests built on the dispatcher.

use isoresource_core::BoxError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), BoxError> {
    init_tracing_with(DEFAULT_FILTER)
}

/// Like [`init_tracing`], falling back to `default_filter` instead of `info`.
pub fn init_tracing_with(default_filter: &str) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_fails() {
        // the first call may lose to another test
        let _ = init_tracing_with("warn");
        assert!(init_tracing_with("warn").is_err());
    }
}
