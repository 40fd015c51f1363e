//! Newman CLI adapter.
//!
//! Spawns `newman run` with the JSON reporter, reads the reporter's export
//! file, and maps it into a [`RunSummary`]. The adapter treats Newman as a
//! black box: a non-zero exit is an error signal, but any export it managed
//! to write is still used, since Newman exits non-zero on test failures that
//! are perfectly good metric data.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::summary::RunSummary;
use super::{CollectionRunner, RunOutcome, RunRequest};

pub struct NewmanCli {
    binary: String,
    work_dir: PathBuf,
}

impl NewmanCli {
    pub fn new(binary: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Where the JSON reporter export for a given collection lands. Derived
    /// from the collection file name so concurrent workers never share one.
    fn export_path(&self, collection_path: &Path) -> PathBuf {
        let stem = collection_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("collection");
        self.work_dir.join(format!("{stem}-summary.tmp.json"))
    }
}

#[async_trait]
impl CollectionRunner for NewmanCli {
    async fn run(&self, request: &RunRequest) -> RunOutcome {
        let export = self.export_path(&request.collection_path);

        let mut cmd = Command::new(&self.binary);
        cmd.arg("run")
            .arg(&request.collection_path)
            .arg("--reporters")
            .arg("json")
            .arg("--reporter-json-export")
            .arg(&export)
            .arg("--iteration-count")
            .arg(request.iterations.to_string());
        if let Some(environment) = &request.environment_path {
            cmd.arg("--environment").arg(environment);
        }
        if request.bail {
            cmd.arg("--bail");
        }
        for (key, value) in &request.env_vars {
            cmd.arg("--env-var").arg(format!("{key}={value}"));
        }

        debug!(
            collection = %request.collection_path.display(),
            iterations = request.iterations,
            "Invoking newman"
        );

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                return RunOutcome::failure(format!(
                    "failed to spawn '{}': {e}",
                    self.binary
                ))
            }
        };

        let summary = read_export(&export).await;
        assemble(summary, exit_error(&self.binary, &output))
    }
}

/// Read, parse and delete the reporter export.
async fn read_export(export: &Path) -> Result<RunSummary, String> {
    let bytes = tokio::fs::read(export)
        .await
        .map_err(|e| format!("summary export not readable: {e}"))?;
    if let Err(e) = tokio::fs::remove_file(export).await {
        debug!(path = %export.display(), error = %e, "Failed to delete summary export");
    }
    parse_export(&bytes)
}

fn parse_export(bytes: &[u8]) -> Result<RunSummary, String> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("summary export is not JSON: {e}"))?;
    serde_json::from_value(normalize_export(value))
        .map_err(|e| format!("unexpected summary export shape: {e}"))
}

/// Newer Newman releases nest the collection name under `collection.info`;
/// hoist it so one model covers both layouts.
fn normalize_export(mut value: Value) -> Value {
    if let Some(collection) = value.get_mut("collection") {
        if collection.get("name").is_none() {
            if let Some(name) = collection.pointer("/info/name").cloned() {
                if let Some(obj) = collection.as_object_mut() {
                    obj.insert("name".to_string(), name);
                }
            }
        }
    }
    value
}

fn exit_error(binary: &str, output: &Output) -> Option<String> {
    if output.status.success() {
        return None;
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    Some(if stderr.is_empty() {
        format!("{binary} exited with {}", output.status)
    } else {
        format!("{binary} exited with {}: {stderr}", output.status)
    })
}

/// Combine the export result with the exit status. A parseable export always
/// wins a place in the outcome; without one the outcome is error-only.
fn assemble(summary: Result<RunSummary, String>, exit_error: Option<String>) -> RunOutcome {
    match summary {
        Ok(summary) => RunOutcome {
            error: exit_error,
            summary: Some(summary),
        },
        Err(parse_error) => RunOutcome::failure(match exit_error {
            Some(exit) => format!("{exit}; {parse_error}"),
            None => parse_error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> RunSummary {
        serde_json::from_str(r#"{"collection": {"name": "S"}, "run": {}}"#).unwrap()
    }

    #[test]
    fn test_export_path_per_collection() {
        let cli = NewmanCli::new("newman", "/tmp/work");
        assert_eq!(
            cli.export_path(Path::new("/data/smoke.json")),
            PathBuf::from("/tmp/work/smoke-summary.tmp.json")
        );
        assert_ne!(
            cli.export_path(Path::new("/data/smoke.json")),
            cli.export_path(Path::new("/data/nightly.json"))
        );
    }

    #[test]
    fn test_parse_export_hoists_nested_name() {
        let raw = r#"{"collection": {"info": {"name": "Nested"}}, "run": {}}"#;
        let summary = parse_export(raw.as_bytes()).unwrap();
        assert_eq!(summary.collection.name, "Nested");
    }

    #[test]
    fn test_parse_export_prefers_top_level_name() {
        let raw = r#"{"collection": {"name": "Top", "info": {"name": "Nested"}}, "run": {}}"#;
        let summary = parse_export(raw.as_bytes()).unwrap();
        assert_eq!(summary.collection.name, "Top");
    }

    #[test]
    fn test_parse_export_rejects_garbage() {
        assert!(parse_export(b"not json at all").is_err());
        assert!(parse_export(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn test_assemble_keeps_summary_despite_failed_exit() {
        let outcome = assemble(Ok(sample_summary()), Some("newman exited with 1".into()));
        assert!(outcome.summary.is_some());
        assert_eq!(outcome.error.as_deref(), Some("newman exited with 1"));
    }

    #[test]
    fn test_assemble_merges_errors_without_summary() {
        let outcome = assemble(
            Err("summary export not readable: gone".into()),
            Some("newman exited with 2".into()),
        );
        assert!(outcome.summary.is_none());
        let error = outcome.error.unwrap();
        assert!(error.contains("newman exited with 2"));
        assert!(error.contains("not readable"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cli = NewmanCli::new("definitely-not-a-newman-binary", dir.path());
        let outcome = cli
            .run(&RunRequest {
                collection_path: dir.path().join("c.json"),
                environment_path: None,
                iterations: 1,
                bail: false,
                env_vars: Vec::new(),
            })
            .await;
        assert!(outcome.summary.is_none());
        assert!(outcome.error.unwrap().contains("failed to spawn"));
    }
}
