//! Collection workers.
//!
//! One [`CollectionWorker`] per configured collection: it owns the resolved
//! source paths, the lifetime counters and the latest run summary. Scrapes
//! read a point-in-time [`WorkerSnapshot`]; run completions replace the
//! retained summary and bump the counters under a single write lock, so a
//! scrape never observes a half-applied run.

pub mod aggregate;
pub mod scheduler;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::ensure;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::config::{self, WorkerSettings};
use crate::runner::{RunRequest, RunSummary};
use crate::source::{self, SourceKind};

/// Counters that only ever grow over the worker's lifetime, fed from run
/// summaries as they complete. Failed runs contribute nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeCounters {
    pub runs: u64,
    pub iterations: u64,
    pub requests: u64,
}

#[derive(Debug, Default)]
struct WorkerState {
    collection_name: String,
    lifetime: LifetimeCounters,
    last_summary: Option<RunSummary>,
}

/// Consistent copy of one worker's state, taken under the read lock.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSnapshot {
    pub collection_name: String,
    pub lifetime: LifetimeCounters,
    pub last_summary: Option<RunSummary>,
    /// Whether per-request detail metrics are rendered for this worker.
    pub request_metrics: bool,
}

#[derive(Debug)]
pub struct CollectionWorker {
    settings: WorkerSettings,
    collection_path: PathBuf,
    environment_path: Option<PathBuf>,
    /// Held for the duration of a run; a tick that cannot take it skips.
    run_guard: Mutex<()>,
    state: RwLock<WorkerState>,
}

impl CollectionWorker {
    /// Resolve the worker's sources and build it. Downloads remote sources
    /// into the work directory, named by `index` so workers never collide.
    pub async fn prepare(
        index: usize,
        settings: WorkerSettings,
        work_dir: &Path,
        client: &reqwest::Client,
    ) -> anyhow::Result<Self> {
        ensure!(settings.interval_secs > 0, "run interval must be at least 1s");
        ensure!(settings.iterations > 0, "iteration count must be at least 1");

        let collection_path = source::resolve_required(
            client,
            SourceKind::Collection,
            settings.collection_url.as_deref(),
            &settings.collection_file,
            work_dir.join(format!("downloaded-collection-{index}.tmp.json")),
        )
        .await?;
        let environment_path = source::resolve_optional(
            client,
            SourceKind::Environment,
            settings.environment_url.as_deref(),
            settings.environment_file.as_deref(),
            work_dir.join(format!("downloaded-environment-{index}.tmp.json")),
        )
        .await?;

        info!(
            collection = %collection_path.display(),
            interval_secs = settings.interval_secs,
            iterations = settings.iterations,
            "Collection will run on a fixed interval"
        );

        Ok(Self {
            settings,
            collection_path,
            environment_path,
            run_guard: Mutex::new(()),
            state: RwLock::new(WorkerState::default()),
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval_secs)
    }

    pub fn collection_path(&self) -> &Path {
        &self.collection_path
    }

    /// Assemble the engine request for one run. Runtime variables are read
    /// from the environment here, per run, so changes apply without restart.
    pub fn run_request(&self) -> RunRequest {
        RunRequest {
            collection_path: self.collection_path.clone(),
            environment_path: self.environment_path.clone(),
            iterations: self.settings.iterations,
            bail: self.settings.bail,
            env_vars: config::runtime_variables(config::RUNTIME_VAR_PREFIX),
        }
    }

    pub async fn snapshot(&self) -> WorkerSnapshot {
        let state = self.state.read().await;
        WorkerSnapshot {
            collection_name: state.collection_name.clone(),
            lifetime: state.lifetime,
            last_summary: state.last_summary.clone(),
            request_metrics: self.settings.request_metrics,
        }
    }

    /// Publish a completed run: bump lifetime counters, adopt the summary's
    /// collection name and replace the retained summary, all under one write
    /// lock. The summary must already be redacted.
    pub(crate) async fn publish_summary(&self, summary: RunSummary) {
        let mut state = self.state.write().await;
        state.lifetime.runs += 1;
        state.lifetime.iterations += summary.run.stats.iterations.total;
        state.lifetime.requests += summary.run.stats.requests.total;
        state.collection_name = summary.collection.name.clone();
        state.last_summary = Some(summary);
    }
}
