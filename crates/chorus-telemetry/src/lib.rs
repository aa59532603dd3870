//! Logging setup for Chorus
//!
//! Wires `tracing-subscriber` from the `log` section of the configuration.
//! Structured fields everywhere; JSON output for machine ingestion when
//! configured.

use chorus_config::LogConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber from configuration
///
/// Falls back to an `info` filter when the configured directive string
/// does not parse. Safe to call once per process; later calls are ignored
/// so tests can initialize eagerly.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().ok();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);
        tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().ok();
    }
}
