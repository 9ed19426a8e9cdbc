//! Per-worker health records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkerId;

/// Health snapshot of one live worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub worker_id: WorkerId,
    /// Items this worker analysed successfully
    pub tasks_completed: u64,
    pub last_activity: DateTime<Utc>,
    pub is_healthy: bool,
}

impl WorkerHealth {
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            tasks_completed: 0,
            last_activity: Utc::now(),
            is_healthy: true,
        }
    }

    pub fn record_success(&mut self) {
        self.tasks_completed += 1;
        self.last_activity = Utc::now();
        self.is_healthy = true;
    }

    pub fn mark_unhealthy(&mut self) {
        self.last_activity = Utc::now();
        self.is_healthy = false;
    }
}
