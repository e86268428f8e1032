//! Log subscriber setup
//!
//! Filtering follows `RUST_LOG` when set. Logs are written to stderr so stdout carries
//! only command output.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "warn,sigma=info";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, as JSON lines when `json` is set.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}
