//! Telemetry and structured logging setup.
//!
//! Log lines carry a component tag (`[tracker]`, `[matcher]`, `[race]`,
//! `[sniper]`) for filtering. Verbosity is configured via RUST_LOG.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogFormat;

/// Filter applied when RUST_LOG is unset: INFO for everything, DEBUG for
/// this crate so losing race attempts stay visible.
pub const DEFAULT_FILTER: &str = "info,launch_sniper=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes compact human-readable logging.
///
/// Example RUST_LOG values:
/// - `info` - All info and above
/// - `launch_sniper=trace,reqwest=warn` - Trace for us, warn for the HTTP client
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initializes telemetry with JSON output (for production).
pub fn init_telemetry_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
        .init();
}

/// Initializes telemetry in the requested format.
pub fn init_with_format(format: LogFormat) {
    match format {
        LogFormat::Compact => init_telemetry(),
        LogFormat::Json => init_telemetry_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER);
        assert!(filter.is_ok());
    }
}
