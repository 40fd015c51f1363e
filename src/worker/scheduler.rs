//! Per-worker run scheduling.
//!
//! Every worker gets its own interval loop: the first run fires immediately,
//! then one run per interval. Runs execute on spawned tasks so a slow
//! collection never delays another worker's cadence. If a tick arrives while
//! the previous run of the same worker is still going, that tick is skipped
//! with a warning instead of piling up concurrent engine processes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{aggregate, CollectionWorker};
use crate::runner::CollectionRunner;

/// Spawn the interval loop for every worker. The handles run for the life of
/// the process; they are returned mainly so tests can abort them.
pub fn spawn_all(
    workers: &[Arc<CollectionWorker>],
    runner: Arc<dyn CollectionRunner>,
    work_dir: PathBuf,
) -> Vec<JoinHandle<()>> {
    workers
        .iter()
        .map(|worker| spawn_worker(Arc::clone(worker), Arc::clone(&runner), work_dir.clone()))
        .collect()
}

pub fn spawn_worker(
    worker: Arc<CollectionWorker>,
    runner: Arc<dyn CollectionRunner>,
    work_dir: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(worker.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let worker = Arc::clone(&worker);
            let runner = Arc::clone(&runner);
            let work_dir = work_dir.clone();
            tokio::spawn(async move {
                run_once(&worker, runner.as_ref(), &work_dir).await;
            });
        }
    })
}

async fn run_once(worker: &CollectionWorker, runner: &dyn CollectionRunner, work_dir: &Path) {
    let Ok(_guard) = worker.run_guard.try_lock() else {
        warn!(
            collection = %worker.collection_path().display(),
            "Previous run still in progress, skipping this interval"
        );
        return;
    };

    info!(collection = %worker.collection_path().display(), "Starting collection run");
    let request = worker.run_request();
    let outcome = runner.run(&request).await;
    aggregate::complete_run(worker, outcome, work_dir).await;
}
