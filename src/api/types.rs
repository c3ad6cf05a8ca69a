//! Shared state for the API layer.

use std::sync::Arc;

use crate::history::HistoryStore;
use crate::pipeline::ReportProcessor;
use crate::storage::FileStore;

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<ReportProcessor>,
    pub history: Arc<dyn HistoryStore>,
    pub files: Arc<FileStore>,
}

impl ApiContext {
    pub fn new(
        processor: Arc<ReportProcessor>,
        history: Arc<dyn HistoryStore>,
        files: Arc<FileStore>,
    ) -> Self {
        Self {
            processor,
            history,
            files,
        }
    }
}
