//! Metrics initialization for Prometheus exporter.
//!
//! Counters recorded by the crate:
//!
//! - `groupwall_queries_total`: queries handled by the server
//! - `groupwall_queries_blocked_total{group}`: queries answered by the
//!   blocking stage, labelled with the blocking group
//! - `groupwall_upstream_errors_total`: pipeline failures answered with
//!   SERVFAIL

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::error::{Error, Result};

/// Initialize the metrics system based on configuration.
///
/// When metrics are enabled, this starts an HTTP server that exposes
/// a `/metrics` endpoint for Prometheus to scrape. Otherwise nothing is
/// installed and every counter is a no-op.
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(|err| Error::Metrics(err.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_skip_exporter_when_disabled() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };

        assert!(init(&config).is_ok());
    }
}
