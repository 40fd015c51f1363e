//! Collection execution boundary.
//!
//! The exporter never interprets collections itself; it hands a [`RunRequest`]
//! to a [`CollectionRunner`] and consumes whatever [`RunOutcome`] comes back.
//! The production implementation is [`NewmanCli`], which shells out to the
//! Newman CLI. Tests substitute in-process fakes.

pub mod newman;
pub mod summary;

use std::path::PathBuf;

use async_trait::async_trait;

pub use newman::NewmanCli;
pub use summary::RunSummary;

/// Everything an engine needs to perform one collection run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub collection_path: PathBuf,
    pub environment_path: Option<PathBuf>,
    /// Number of iterations to execute, always >= 1.
    pub iterations: u64,
    /// Stop the run on the first request or assertion failure.
    pub bail: bool,
    /// Runtime variables forwarded to the engine, prefix already stripped.
    pub env_vars: Vec<(String, String)>,
}

/// What came back from the engine. A run can produce a summary, an error, or
/// both: a non-zero engine exit with a parseable summary export keeps the
/// summary and carries the error alongside it.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub error: Option<String>,
    pub summary: Option<RunSummary>,
}

impl RunOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            summary: None,
        }
    }

    pub fn success(summary: RunSummary) -> Self {
        Self {
            error: None,
            summary: Some(summary),
        }
    }
}

/// Boundary between scheduling and collection execution.
#[async_trait]
pub trait CollectionRunner: Send + Sync + 'static {
    /// Execute one run. Engine failures are reported inside the outcome
    /// rather than as an `Err`; a run that produces nothing usable still
    /// returns an outcome describing why.
    async fn run(&self, request: &RunRequest) -> RunOutcome;
}
