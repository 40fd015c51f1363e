//! postman-exporter -- Prometheus metrics from scheduled Postman collection runs.
//!
//! This crate runs Postman collections through the external Newman CLI on
//! fixed per-collection intervals, aggregates each run into lifetime
//! counters plus a redacted latest-run snapshot, and serves the whole thing
//! as Prometheus text exposition on `/metrics`.

pub mod api;
pub mod config;
pub mod metrics;
pub mod runner;
pub mod source;
pub mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::config::ExporterConfig;
use crate::metrics::registry::ExporterMetrics;
use crate::runner::{CollectionRunner, NewmanCli};
use crate::worker::CollectionWorker;

/// Start the exporter: resolve collections, spawn one run loop per worker,
/// and serve `/metrics` until the process is stopped.
///
/// Fails fast on anything a restart will not fix on its own: an unreadable
/// settings directory, an unresolvable collection source, or a port that
/// cannot be bound.
pub async fn serve(config: ExporterConfig) -> Result<()> {
    let metrics =
        Arc::new(ExporterMetrics::new().context("failed to build the metrics registry")?);
    let client = reqwest::Client::builder()
        .build()
        .context("failed to build the download client")?;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("failed to create work dir {}", config.work_dir.display()))?;

    let all_settings = config::discover_worker_settings(&config)?;
    tracing::info!(workers = all_settings.len(), "Configuring collection workers");

    let mut workers = Vec::with_capacity(all_settings.len());
    for (index, settings) in all_settings.into_iter().enumerate() {
        let worker = CollectionWorker::prepare(index, settings, &config.work_dir, &client)
            .await
            .context("failed to initialize collection worker")?;
        workers.push(Arc::new(worker));
    }

    let runner: Arc<dyn CollectionRunner> =
        Arc::new(NewmanCli::new(config.newman_bin.clone(), config.work_dir.clone()));
    worker::scheduler::spawn_all(&workers, runner, config.work_dir.clone());

    let app = api::router(AppState::new(workers, metrics));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "Exporter listening");
    axum::serve(listener, app).await?;

    Ok(())
}
