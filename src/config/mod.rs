//! # Pool Configuration
//!
//! Configuration for the worker pool and batch scheduler. A `PoolConfig` is
//! fixed for the lifetime of the pool that was built from it.
//!
//! Recognised options:
//!
//! - `min_workers` / `max_workers`: bounds on the live worker count when
//!   `dynamic_scaling` is enabled
//! - `dynamic_scaling`: when false the pool is pinned at `max_workers`
//! - `max_memory_mb`: advisory memory budget handed to every worker's analyzer
//! - `timeout_ms`: per-chunk wall-clock budget
//! - `chunk_size`: extraction size hint, carried for the chunk producer
//! - `streaming`: fold results as they settle instead of at the batch barrier
//! - `use_workers`: isolated workers vs. in-process execution

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;
use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Floor on live workers when scaling dynamically
    pub min_workers: usize,

    /// Ceiling on live workers; also the batch concurrency
    pub max_workers: usize,

    /// Whether the pool grows and shrinks with queue pressure
    pub dynamic_scaling: bool,

    /// Advisory per-worker memory budget in megabytes
    pub max_memory_mb: Option<u64>,

    /// Per-chunk timeout in milliseconds
    pub timeout_ms: u64,

    /// Number of source lines per extracted chunk (consumed by the extractor)
    pub chunk_size: usize,

    /// Fold each result into the merger as soon as it settles
    pub streaming: bool,

    /// Dispatch to isolated workers (true) or run analyzers in-process (false)
    pub use_workers: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: defaults::MIN_WORKERS,
            max_workers: defaults::MAX_WORKERS,
            dynamic_scaling: false,
            max_memory_mb: None,
            timeout_ms: defaults::TASK_TIMEOUT_MS,
            chunk_size: defaults::CHUNK_SIZE,
            streaming: false,
            use_workers: true,
        }
    }
}

impl PoolConfig {
    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(DispatchError::Configuration(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        if self.dynamic_scaling && self.min_workers == 0 {
            return Err(DispatchError::Configuration(
                "min_workers must be greater than 0 when dynamic_scaling is enabled".to_string(),
            ));
        }

        if self.min_workers > self.max_workers {
            return Err(DispatchError::Configuration(format!(
                "min_workers ({}) cannot exceed max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }

        if self.timeout_ms == 0 {
            return Err(DispatchError::Configuration(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(DispatchError::Configuration(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of workers spawned by `initialize()`
    pub fn initial_workers(&self) -> usize {
        if self.dynamic_scaling {
            self.min_workers
        } else {
            self.max_workers
        }
    }

    /// Maximum number of chunks dispatched at once
    pub fn concurrency(&self) -> usize {
        self.max_workers
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
