//! Scrape handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::state::AppState;
use crate::metrics;

/// Body served with a 500 while no worker has completed a run yet.
pub(super) const NO_DATA_MESSAGE: &str =
    "No result data to show, maybe the collection has not run yet.";

/// Body served for any path other than `/metrics`.
pub(super) const NOT_FOUND_MESSAGE: &str = "Nothing here, try /metrics";

/// Exposition content type expected by Prometheus scrapers.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; charset=utf-8; version=0.0.4";

pub(super) async fn serve_metrics(State(state): State<AppState>) -> Response {
    let started = Instant::now();

    let mut snapshots = Vec::with_capacity(state.workers.len());
    for worker in state.workers.iter() {
        snapshots.push(worker.snapshot().await);
    }

    let response = if snapshots.iter().all(|s| s.last_summary.is_none()) {
        (StatusCode::INTERNAL_SERVER_ERROR, NO_DATA_MESSAGE).into_response()
    } else {
        match state.metrics.encode() {
            Ok(mut body) => {
                body.push_str(&metrics::render_workers(&snapshots));
                (
                    [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
                    body,
                )
                    .into_response()
            }
            Err(e) => {
                error!(error = %e, "Failed to encode registry metrics");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to encode metrics",
                )
                    .into_response()
            }
        }
    };

    state.metrics.observe_request(
        "GET",
        "/metrics",
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}

pub(super) async fn fallback(State(state): State<AppState>, method: Method) -> Response {
    let started = Instant::now();
    let response = (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response();
    state.metrics.observe_request(
        method.as_str(),
        "/",
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
