//! Run metrics for scos-extract
//!
//! Counters and histograms go through the `metrics` facade; they are no-ops
//! unless a Prometheus exporter has been installed with [`init_metrics`].

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install a Prometheus exporter listening on `addr`
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// Record rows loaded from a dataset source
pub fn record_rows_loaded(rows: u64) {
    counter!("scos.ingestion.rows").increment(rows);
    gauge!("scos.dataset.rows").set(rows as f64);
}

/// Record rows surviving a pipeline stage
pub fn record_rows_kept(stage: &str, rows: u64) {
    let metric_name = format!("scos.{}.rows_kept", stage);
    counter!(metric_name).increment(rows);
}

/// Record result groups emitted by the aggregator
pub fn record_groups(groups: u64) {
    counter!("scos.aggregate.groups").increment(groups);
}

/// Record a query execution
pub fn record_query(duration_ms: f64) {
    counter!("scos.query.executions").increment(1);
    histogram!("scos.query.duration_ms").record(duration_ms);
}
