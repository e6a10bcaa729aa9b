//! `tracing` subscriber installation.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` (e.g. `"lineflow=debug"`) when
/// `RUST_LOG` is unset. Returns `Ok(false)` if a global subscriber was
/// already installed, so calling this more than once is harmless.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .with_context(|| format!("invalid tracing directive '{default_directive}'"))?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
