//! Shared handler state.

use std::sync::Arc;

use crate::metrics::registry::ExporterMetrics;
use crate::worker::CollectionWorker;

#[derive(Clone)]
pub struct AppState {
    pub workers: Arc<Vec<Arc<CollectionWorker>>>,
    pub metrics: Arc<ExporterMetrics>,
}

impl AppState {
    pub fn new(workers: Vec<Arc<CollectionWorker>>, metrics: Arc<ExporterMetrics>) -> Self {
        Self {
            workers: Arc::new(workers),
            metrics,
        }
    }
}
