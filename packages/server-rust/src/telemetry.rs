//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line events.
    #[default]
    Text,
    /// One JSON object per event, for log aggregation.
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// filter.
///
/// Returns `false` when a subscriber was already installed (common in tests).
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(filter)
            .try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(?format, "tracing initialized");
            true
        }
        Err(_) => false,
    }
}
