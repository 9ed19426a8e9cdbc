//! Progress events emitted once per batch boundary.

use serde::{Deserialize, Serialize};

/// Snapshot of run progress. Purely observational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Chunks settled so far (succeeded or failed)
    pub processed: usize,
    pub total: usize,
    /// `processed / total * 100`, 100.0 for an empty run
    pub percentage: f64,
    /// Workers currently holding a work item
    pub active_workers: usize,
    pub available_workers: usize,
    /// Chunks not yet dispatched
    pub pending_work: usize,
    /// Chunks that settled with an error so far
    pub failed: usize,
}

impl ProgressEvent {
    pub fn percentage_of(processed: usize, total: usize) -> f64 {
        if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}
