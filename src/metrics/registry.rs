//! Process-level metrics registry.
//!
//! Separate from collection rendering: this registry holds the exporter's
//! own telemetry (HTTP handler latency, process stats on Linux) and is
//! encoded with the standard text encoder. Scrapes serve this first, with
//! the collection exposition appended after it.

use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, Registry, TextEncoder};

/// Latency buckets for the scrape handler, in seconds.
const HTTP_DURATION_BUCKETS: &[f64] = &[0.1, 0.3, 0.5, 0.7, 1.0, 3.0, 5.0, 7.0, 10.0];

/// Namespace prepended to every registry metric.
const NAMESPACE: &str = "postman_exporter";

pub struct ExporterMetrics {
    registry: Registry,
    http_requests: HistogramVec,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)?;

        let http_requests = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(HTTP_DURATION_BUCKETS.to_vec()),
            &["method", "route", "code"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            http_requests,
        })
    }

    /// Record one handled HTTP request.
    pub fn observe_request(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        self.http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .observe(elapsed.as_secs_f64());
    }

    /// Encode the registry in Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = String::new();
        TextEncoder::new().encode_utf8(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
