//! # Dispatch Errors
//!
//! Error taxonomy for the dispatch engine. Only pool initialisation failures,
//! configuration errors and malformed input ever reach the caller of
//! `AnalysisProcessor::process`; every per-chunk and per-worker variant is
//! absorbed inside the engine and surfaced through logs, health snapshots and
//! the `failed_chunks` list of the merged analysis.

use crate::worker::WorkerId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// A worker could not be brought up. Fatal during `initialize()`.
    #[error("Failed to spawn worker {worker_id}: {reason}")]
    WorkerSpawn { worker_id: WorkerId, reason: String },

    /// A worker crashed or stopped answering while holding a work item.
    #[error("Worker {worker_id} faulted: {reason}")]
    WorkerFault { worker_id: WorkerId, reason: String },

    /// A work item exceeded its wall-clock budget.
    #[error("Chunk {chunk_id} timed out after {timeout_ms}ms")]
    TaskTimeout { chunk_id: String, timeout_ms: u64 },

    /// The analyzer returned an error for a chunk.
    #[error("Analysis of chunk {chunk_id} failed: {reason}")]
    Analysis { chunk_id: String, reason: String },

    #[error("Invalid chunk at position {index}: {reason}")]
    InvalidChunk { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Worker pool is shutting down")]
    PoolShutdown,
}

impl DispatchError {
    /// Whether this error should trigger a worker restart.
    pub fn is_worker_failure(&self) -> bool {
        matches!(
            self,
            DispatchError::WorkerFault { .. } | DispatchError::Analysis { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_not_a_worker_failure() {
        let timeout = DispatchError::TaskTimeout {
            chunk_id: "c1".to_string(),
            timeout_ms: 100,
        };
        assert!(!timeout.is_worker_failure());

        let fault = DispatchError::WorkerFault {
            worker_id: WorkerId::new(3),
            reason: "panicked".to_string(),
        };
        assert!(fault.is_worker_failure());
    }

    #[test]
    fn test_error_messages_include_context() {
        let err = DispatchError::WorkerSpawn {
            worker_id: WorkerId::new(7),
            reason: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to spawn worker worker-7: boom");

        let err = DispatchError::TaskTimeout {
            chunk_id: "src/app.js".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "Chunk src/app.js timed out after 250ms");
    }
}
