//! Tracing subscriber bootstrap for binaries and test harnesses.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ## Summary
/// Installs the global tracing subscriber: `RUST_LOG` takes precedence,
/// falling back to `default_level`.
///
/// ## Errors
/// Returns an error if `default_level` is not a valid filter directive or
/// if a global subscriber is already installed.
pub fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    tracing::debug!("tracing subscriber installed");

    Ok(())
}
