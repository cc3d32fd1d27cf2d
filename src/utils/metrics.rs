//! Counters for balance events and trade jobs

use crate::{ConvertError, Result};
use ::metrics::{describe_counter, increment_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Balance events by outcome (`accepted`, `ignored`)
pub const BALANCE_EVENTS: &str = "autoconvert_balance_events_total";

/// Trade jobs by outcome (`settled`, `rerouted`, `failed`)
pub const TRADE_JOBS: &str = "autoconvert_trade_jobs_total";

/// Start a Prometheus exporter on `port`
pub fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| ConvertError::Config(format!("Failed to start metrics exporter: {}", e)))?;

    describe_counter!(BALANCE_EVENTS, "Balance change notifications by outcome");
    describe_counter!(TRADE_JOBS, "Trade jobs processed by outcome");
    info!("Prometheus metrics listening on port {}", port);
    Ok(())
}

/// Count a balance event
pub fn record_balance_event(outcome: &'static str) {
    increment_counter!(BALANCE_EVENTS, "outcome" => outcome);
}

/// Count a processed trade job
pub fn record_trade_job(outcome: &'static str) {
    increment_counter!(TRADE_JOBS, "outcome" => outcome);
}
