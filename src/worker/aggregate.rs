//! Run completion handling.
//!
//! Takes the outcome of one engine run and turns it into logs, a redacted
//! debug artifact on disk and updated worker state. Outcomes without a
//! summary only log; they never touch counters or the retained summary, so
//! scrapes keep serving the last good run.

use std::path::Path;

use serde_json::Value;
use tracing::{error, info, warn};

use super::CollectionWorker;
use crate::runner::RunOutcome;

/// Make a collection name safe for use in a file name: anything outside
/// `[A-Za-z0-9_-]` becomes an underscore.
pub fn sanitize_collection_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Process one finished run for `worker`.
pub async fn complete_run(worker: &CollectionWorker, outcome: RunOutcome, work_dir: &Path) {
    let RunOutcome { error, summary } = outcome;

    let Some(mut summary) = summary else {
        error!(
            collection = %worker.collection_path().display(),
            error = error.as_deref().unwrap_or("no summary was returned"),
            "Failed to run collection"
        );
        return;
    };

    for execution in &summary.run.executions {
        match &execution.response {
            Some(response) => {
                info!(
                    request = %execution.item.name,
                    response_time_ms = response.response_time.unwrap_or_default(),
                    "Request completed"
                );
                for assertion in execution.assertions.iter().flatten() {
                    if let Some(failure) = &assertion.error {
                        error!(
                            request = %execution.item.name,
                            test = %failure.test,
                            reason = %failure.message,
                            "Test failed"
                        );
                    }
                }
            }
            None => {
                error!(
                    request = %execution.item.name,
                    error = %request_error_text(execution.request_error.as_ref()),
                    "Request failed"
                );
            }
        }
    }

    summary.redact();
    write_debug_artifact(&summary, work_dir).await;

    if let (Some(started), Some(completed)) =
        (summary.run.timings.started, summary.run.timings.completed)
    {
        info!(
            collection = %summary.collection.name,
            duration_ms = completed - started,
            "Run complete"
        );
    }

    worker.publish_summary(summary).await;

    if let Some(error) = error {
        error!(
            collection = %worker.collection_path().display(),
            %error,
            "Engine reported an error for this run"
        );
    }
}

/// Persist the redacted summary next to the exporter for post-mortems.
/// Failure to write is logged and otherwise ignored; the artifact is an aid,
/// not part of the metric surface.
async fn write_debug_artifact(summary: &crate::runner::RunSummary, work_dir: &Path) {
    let artifact = work_dir.join(format!(
        "{}_debug.tmp.json",
        sanitize_collection_name(&summary.collection.name)
    ));
    match serde_json::to_vec_pretty(summary) {
        Ok(body) => {
            if let Err(e) = tokio::fs::write(&artifact, body).await {
                warn!(path = %artifact.display(), error = %e, "Failed to write debug artifact");
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize debug artifact"),
    }
}

fn request_error_text(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => match obj.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => Value::Object(obj.clone()).to_string(),
        },
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}
