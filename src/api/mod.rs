//! HTTP layer -- axum routes, handlers, and middleware.
//!
//! The surface is deliberately tiny: `GET /metrics` serves the scrape body,
//! everything else gets a plain-text 404 pointing at it. Both paths are
//! timed into the exporter's own latency histogram.

mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use self::state::AppState;

/// Build the application router. Non-GET methods on `/metrics` get the same
/// 404 as unknown paths instead of an empty 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(routes::serve_metrics).fallback(routes::fallback),
        )
        .fallback(routes::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
