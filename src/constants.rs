//! # System Constants
//!
//! Defaults and thresholds that define the operational boundaries of the
//! dispatch engine.

/// Pool configuration defaults
pub mod defaults {
    pub const MIN_WORKERS: usize = 1;
    pub const MAX_WORKERS: usize = 4;
    pub const TASK_TIMEOUT_MS: u64 = 30_000;
    pub const CHUNK_SIZE: usize = 50;
    pub const ENV_PREFIX: &str = "DISPATCH";
}

/// Scaling policy thresholds
///
/// The band between the two ratios is hysteresis: inside it the pool size
/// does not move.
pub mod scaling {
    /// Pending work per live worker above which one worker is added
    pub const SCALE_UP_RATIO: f64 = 2.0;
    /// Pending work per live worker below which one idle worker is removed
    pub const SCALE_DOWN_RATIO: f64 = 0.5;
    /// Workers added or removed per adjustment
    pub const SCALING_STEP: usize = 1;
}

/// Worker lifecycle limits
pub mod lifecycle {
    /// How long a worker gets to finish its current item after a terminate request
    pub const TERMINATION_GRACE_MS: u64 = 5_000;
    /// Mailbox capacity of a single worker
    pub const WORKER_MAILBOX_CAPACITY: usize = 8;
}

/// Operation names used in structured log events
pub mod operations {
    pub const POOL_INITIALIZE: &str = "pool.initialize";
    pub const POOL_SHUTDOWN: &str = "pool.shutdown";
    pub const POOL_SCALE_UP: &str = "pool.scale_up";
    pub const POOL_SCALE_DOWN: &str = "pool.scale_down";
    pub const WORKER_RESTART: &str = "worker.restart";
    pub const WORKER_FAILURE: &str = "worker.failure";
    pub const BATCH_START: &str = "batch.start";
    pub const BATCH_COMPLETE: &str = "batch.complete";
}
