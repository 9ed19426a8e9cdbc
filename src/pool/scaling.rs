//! # Scaling Policy
//!
//! Decides whether the pool should grow or shrink given the number of chunks
//! still waiting to be dispatched. The decision is a pure function of the pool
//! metrics and the pending count; `WorkerPool::adjust_pool_size` applies it.

use tracing::debug;

use super::PoolMetrics;
use crate::config::PoolConfig;
use crate::constants::scaling;

/// Scaling action recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAction {
    /// Add the specified number of workers
    ScaleUp { count: usize },
    /// Remove the specified number of idle workers
    ScaleDown { count: usize },
    NoChange,
}

#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    enabled: bool,
    min_workers: usize,
    max_workers: usize,
    scale_up_ratio: f64,
    scale_down_ratio: f64,
    step: usize,
}

impl ScalingPolicy {
    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            enabled: config.dynamic_scaling,
            min_workers: config.min_workers,
            max_workers: config.max_workers,
            scale_up_ratio: scaling::SCALE_UP_RATIO,
            scale_down_ratio: scaling::SCALE_DOWN_RATIO,
            step: scaling::SCALING_STEP,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate one adjustment. Between the two ratios nothing changes.
    pub fn evaluate(&self, metrics: &PoolMetrics, pending: usize) -> ScalingAction {
        if !self.enabled {
            return ScalingAction::NoChange;
        }

        let ratio = pending as f64 / metrics.total.max(1) as f64;

        if ratio > self.scale_up_ratio && metrics.total < self.max_workers {
            let count = self.step.min(self.max_workers - metrics.total);
            debug!(ratio, total = metrics.total, "SCALING: Queue pressure above threshold");
            return ScalingAction::ScaleUp { count };
        }

        if ratio < self.scale_down_ratio
            && pending == 0
            && metrics.total > self.min_workers
            && metrics.available > 0
        {
            let count = self
                .step
                .min(metrics.total - self.min_workers)
                .min(metrics.available);
            debug!(ratio, total = metrics.total, "SCALING: Pool idle above minimum");
            return ScalingAction::ScaleDown { count };
        }

        ScalingAction::NoChange
    }
}
