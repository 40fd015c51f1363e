//! Collection metric rendering.
//!
//! Worker snapshots are flattened into [`MetricRecord`]s and rendered as
//! Prometheus text exposition. Every sample carries its own `# TYPE` line
//! and a trailing blank line, and the `collection` label always comes last;
//! dashboards and recording rules exist against this exact shape, so the
//! renderer treats it as a wire format, not a style choice.

pub mod registry;

use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;

use crate::worker::WorkerSnapshot;

/// Prefix for every collection metric name.
const PREFIX: &str = "postman";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// One fully-labelled sample, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: &'static str,
    pub kind: MetricKind,
    pub value: f64,
    pub labels: Vec<(&'static str, String)>,
}

struct Records {
    collection: String,
    out: Vec<MetricRecord>,
}

impl Records {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            out: Vec::new(),
        }
    }

    fn push(
        &mut self,
        name: &'static str,
        kind: MetricKind,
        value: f64,
        mut labels: Vec<(&'static str, String)>,
    ) {
        labels.push(("collection", self.collection.clone()));
        self.out.push(MetricRecord {
            name,
            kind,
            value,
            labels,
        });
    }

    fn counter(&mut self, name: &'static str, value: u64) {
        self.push(name, MetricKind::Counter, value as f64, Vec::new());
    }

    fn gauge(&mut self, name: &'static str, value: f64) {
        self.push(name, MetricKind::Gauge, value, Vec::new());
    }
}

/// Flatten one worker snapshot into records.
///
/// Lifetime counters are always present, even before the first successful
/// run. Run statistics appear once a summary is retained; per-request detail
/// follows when enabled for the worker. Request gauges whose source field is
/// absent or zero are omitted entirely rather than rendered as `0`, except
/// the assertion pair, which is always meaningful.
pub fn worker_records(snapshot: &WorkerSnapshot) -> Vec<MetricRecord> {
    let mut records = Records::new(&snapshot.collection_name);

    records.counter("lifetime_runs_total", snapshot.lifetime.runs);
    records.counter("lifetime_iterations_total", snapshot.lifetime.iterations);
    records.counter("lifetime_requests_total", snapshot.lifetime.requests);

    let Some(summary) = &snapshot.last_summary else {
        return records.out;
    };

    let stats = &summary.run.stats;
    records.gauge("stats_iterations_total", stats.iterations.total as f64);
    records.gauge("stats_iterations_failed", stats.iterations.failed as f64);
    records.gauge("stats_requests_total", stats.requests.total as f64);
    records.gauge("stats_requests_failed", stats.requests.failed as f64);
    records.gauge("stats_tests_total", stats.tests.total as f64);
    records.gauge("stats_tests_failed", stats.tests.failed as f64);
    records.gauge("stats_test_scripts_total", stats.test_scripts.total as f64);
    records.gauge("stats_test_scripts_failed", stats.test_scripts.failed as f64);
    records.gauge("stats_assertions_total", stats.assertions.total as f64);
    records.gauge("stats_assertions_failed", stats.assertions.failed as f64);
    // Historical name, typo included. Renaming would break every dashboard
    // built on top of this exporter.
    records.gauge(
        "stats_transfered_bytes_total",
        summary.run.transfers.response_total as f64,
    );
    records.gauge("stats_resp_avg", summary.run.timings.response_average);
    records.gauge("stats_resp_min", summary.run.timings.response_min);
    records.gauge("stats_resp_max", summary.run.timings.response_max);

    if !snapshot.request_metrics {
        return records.out;
    }

    for execution in &summary.run.executions {
        let Some(response) = &execution.response else {
            continue;
        };
        let labels = || {
            vec![
                ("request_name", execution.item.name.clone()),
                ("iteration", execution.cursor.iteration.to_string()),
            ]
        };

        if let Some(code) = response.code.filter(|&c| c != 0) {
            records.push("request_status_code", MetricKind::Gauge, code as f64, labels());
        }
        if let Some(time) = response.response_time.filter(|&t| t != 0) {
            records.push("request_resp_time", MetricKind::Gauge, time as f64, labels());
        }
        if let Some(size) = response.response_size.filter(|&s| s != 0) {
            records.push("request_resp_size", MetricKind::Gauge, size as f64, labels());
        }
        if let Some(status) = response.status.as_deref().filter(|s| !s.is_empty()) {
            let ok = if status == "OK" { 1.0 } else { 0.0 };
            records.push("request_status_ok", MetricKind::Gauge, ok, labels());
        }

        let assertions = execution.assertions.as_deref().unwrap_or_default();
        let failed = assertions.iter().filter(|a| a.error.is_some()).count();
        records.push(
            "request_failed_assertions",
            MetricKind::Gauge,
            failed as f64,
            labels(),
        );
        records.push(
            "request_total_assertions",
            MetricKind::Gauge,
            assertions.len() as f64,
            labels(),
        );
    }

    records.out
}

/// Render records as exposition text: a `# TYPE` line per sample, then the
/// sample itself followed by a blank line.
pub fn render(records: &[MetricRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "# TYPE {PREFIX}_{} {}", record.name, record.kind);
        let _ = write!(out, "{PREFIX}_{}{{", record.name);
        for (i, (key, value)) in record.labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label_value(value));
        }
        let _ = write!(out, "}} {}\n\n", record.value);
    }
    out
}

/// Render the whole scrape body for a set of worker snapshots.
///
/// A scrape body must not repeat a series (name plus label set); scrapers
/// reject the whole body when it does. Workers that have never completed a
/// run all render identical zeroed counters under `collection=""`, so a
/// repeated series keeps its first occurrence only.
pub fn render_workers(snapshots: &[WorkerSnapshot]) -> String {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for snapshot in snapshots {
        for record in worker_records(snapshot) {
            if seen.insert((record.name, record.labels.clone())) {
                records.push(record);
            }
        }
    }
    render(&records)
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunSummary;
    use crate::worker::LifetimeCounters;

    fn snapshot(summary: Option<&str>, request_metrics: bool) -> WorkerSnapshot {
        WorkerSnapshot {
            collection_name: "Smoke".to_string(),
            lifetime: LifetimeCounters {
                runs: 3,
                iterations: 6,
                requests: 12,
            },
            last_summary: summary.map(|s| serde_json::from_str::<RunSummary>(s).unwrap()),
            request_metrics,
        }
    }

    const FULL_SUMMARY: &str = r#"{
        "collection": {"name": "Smoke"},
        "run": {
            "stats": {
                "iterations": {"total": 1, "failed": 0},
                "requests": {"total": 2, "failed": 1},
                "tests": {"total": 2, "failed": 0},
                "testScripts": {"total": 2, "failed": 0},
                "assertions": {"total": 3, "failed": 1}
            },
            "timings": {"responseAverage": 102.25, "responseMin": 41, "responseMax": 230},
            "transfers": {"responseTotal": 8192},
            "executions": [
                {
                    "item": {"name": "Login"},
                    "cursor": {"iteration": 0},
                    "response": {
                        "code": 200, "status": "OK",
                        "responseTime": 41, "responseSize": 512
                    },
                    "assertions": [
                        {"assertion": "a"},
                        {"assertion": "b", "error": {"test": "b", "message": "m"}}
                    ]
                },
                {
                    "item": {"name": "Fetch data"},
                    "cursor": {"iteration": 0},
                    "response": {"code": 500, "status": "Internal Server Error", "responseTime": 230}
                }
            ]
        }
    }"#;

    #[test]
    fn test_lifetime_counters_render_without_summary() {
        let body = render_workers(&[snapshot(None, true)]);
        assert_eq!(
            body,
            "# TYPE postman_lifetime_runs_total counter\n\
             postman_lifetime_runs_total{collection=\"Smoke\"} 3\n\n\
             # TYPE postman_lifetime_iterations_total counter\n\
             postman_lifetime_iterations_total{collection=\"Smoke\"} 6\n\n\
             # TYPE postman_lifetime_requests_total counter\n\
             postman_lifetime_requests_total{collection=\"Smoke\"} 12\n\n"
        );
    }

    #[test]
    fn test_label_order_puts_collection_last() {
        let body = render_workers(&[snapshot(Some(FULL_SUMMARY), true)]);
        assert!(body.contains(
            "postman_request_status_code{request_name=\"Login\",iteration=\"0\",collection=\"Smoke\"} 200"
        ));
        assert!(body.contains(
            "postman_request_status_ok{request_name=\"Login\",iteration=\"0\",collection=\"Smoke\"} 1"
        ));
        assert!(body.contains(
            "postman_request_status_ok{request_name=\"Fetch data\",iteration=\"0\",collection=\"Smoke\"} 0"
        ));
    }

    #[test]
    fn test_stats_gauges_and_float_values() {
        let body = render_workers(&[snapshot(Some(FULL_SUMMARY), true)]);
        assert!(body.contains("# TYPE postman_stats_resp_avg gauge\n"));
        assert!(body.contains("postman_stats_resp_avg{collection=\"Smoke\"} 102.25\n\n"));
        assert!(body.contains("postman_stats_transfered_bytes_total{collection=\"Smoke\"} 8192"));
        assert!(body.contains("postman_stats_assertions_failed{collection=\"Smoke\"} 1"));
    }

    #[test]
    fn test_request_metrics_toggle_drops_request_records_only() {
        let body = render_workers(&[snapshot(Some(FULL_SUMMARY), false)]);
        assert!(!body.contains("postman_request_"));
        assert!(body.contains("postman_stats_requests_total"));
        assert!(body.contains("postman_lifetime_runs_total"));
    }

    #[test]
    fn test_zero_and_absent_request_fields_are_omitted() {
        let summary = r#"{
            "collection": {"name": "Smoke"},
            "run": {
                "executions": [{
                    "item": {"name": "Weird"},
                    "cursor": {"iteration": 2},
                    "response": {"code": 0, "status": ""}
                }]
            }
        }"#;
        let body = render_workers(&[snapshot(Some(summary), true)]);
        assert!(!body.contains("postman_request_status_code"));
        assert!(!body.contains("postman_request_resp_time"));
        assert!(!body.contains("postman_request_resp_size"));
        assert!(!body.contains("postman_request_status_ok"));
        // The assertion pair is always rendered for responses.
        assert!(body.contains(
            "postman_request_failed_assertions{request_name=\"Weird\",iteration=\"2\",collection=\"Smoke\"} 0"
        ));
        assert!(body.contains(
            "postman_request_total_assertions{request_name=\"Weird\",iteration=\"2\",collection=\"Smoke\"} 0"
        ));
    }

    #[test]
    fn test_executions_without_response_produce_no_request_records() {
        let summary = r#"{
            "collection": {"name": "Smoke"},
            "run": {
                "executions": [{
                    "item": {"name": "Dead"},
                    "cursor": {"iteration": 0},
                    "requestError": {"message": "ENOTFOUND"}
                }]
            }
        }"#;
        let body = render_workers(&[snapshot(Some(summary), true)]);
        assert!(!body.contains("postman_request_"));
    }

    #[test]
    fn test_record_order_is_stable() {
        let records = worker_records(&snapshot(Some(FULL_SUMMARY), true));
        let names: Vec<&str> = records.iter().map(|r| r.name).collect();
        assert_eq!(
            &names[..6],
            &[
                "lifetime_runs_total",
                "lifetime_iterations_total",
                "lifetime_requests_total",
                "stats_iterations_total",
                "stats_iterations_failed",
                "stats_requests_total",
            ]
        );
        assert_eq!(
            &names[names.len() - 2..],
            &["request_failed_assertions", "request_total_assertions"]
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let snapshots = [snapshot(Some(FULL_SUMMARY), true)];
        assert_eq!(render_workers(&snapshots), render_workers(&snapshots));
    }

    #[test]
    fn test_disjoint_collections_keep_their_own_label() {
        let mut other = snapshot(None, true);
        other.collection_name = "Nightly".to_string();
        let body = render_workers(&[snapshot(None, true), other]);
        assert!(body.contains("postman_lifetime_runs_total{collection=\"Smoke\"} 3"));
        assert!(body.contains("postman_lifetime_runs_total{collection=\"Nightly\"} 3"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let record = MetricRecord {
            name: "request_status_code",
            kind: MetricKind::Gauge,
            value: 200.0,
            labels: vec![
                ("request_name", "say \"hi\"\nback\\slash".to_string()),
                ("collection", "Smoke".to_string()),
            ],
        };
        let body = render(&[record]);
        assert!(body.contains(r#"request_name="say \"hi\"\nback\\slash""#));
    }

    #[test]
    fn test_unnamed_collection_renders_empty_label() {
        let mut s = snapshot(None, true);
        s.collection_name = String::new();
        let body = render_workers(&[s]);
        assert!(body.contains("postman_lifetime_runs_total{collection=\"\"} 3"));
    }

    #[test]
    fn test_never_run_workers_share_one_zeroed_series() {
        let idle = || WorkerSnapshot {
            collection_name: String::new(),
            lifetime: LifetimeCounters::default(),
            last_summary: None,
            request_metrics: true,
        };
        let body = render_workers(&[idle(), idle(), snapshot(None, true)]);
        assert_eq!(
            body.matches("postman_lifetime_runs_total{collection=\"\"} 0").count(),
            1
        );
        assert_eq!(
            body.matches("postman_lifetime_iterations_total{collection=\"\"} 0").count(),
            1
        );
        assert_eq!(
            body.matches("postman_lifetime_requests_total{collection=\"\"} 0").count(),
            1
        );
        assert!(body.contains("postman_lifetime_runs_total{collection=\"Smoke\"} 3"));
    }

    #[test]
    fn test_repeated_request_series_keep_first_sample() {
        let summary = r#"{
            "collection": {"name": "Smoke"},
            "run": {
                "executions": [
                    {
                        "item": {"name": "Retry"},
                        "cursor": {"iteration": 0},
                        "response": {"code": 200, "status": "OK", "responseTime": 10}
                    },
                    {
                        "item": {"name": "Retry"},
                        "cursor": {"iteration": 0},
                        "response": {"code": 500, "status": "Internal Server Error", "responseTime": 20}
                    }
                ]
            }
        }"#;
        let body = render_workers(&[snapshot(Some(summary), true)]);
        assert_eq!(
            body.matches("postman_request_status_code{request_name=\"Retry\"").count(),
            1
        );
        assert!(body.contains(
            "postman_request_status_code{request_name=\"Retry\",iteration=\"0\",collection=\"Smoke\"} 200"
        ));
    }
}
