//! # Worker Pool
//!
//! Owns the set of live workers, partitioned into "available" and "busy",
//! together with one health record per worker. The pool creates and destroys
//! workers, applies the scaling policy and restarts workers that fault.
//!
//! All pool state sits behind a single mutex that is never held across an
//! await point. Worker termination always happens outside the lock.
//!
//! ## Invariants
//!
//! - Every live worker appears in exactly one of `available` / `busy` and has
//!   exactly one health record.
//! - A restart swaps the faulty worker for its replacement under one lock, so
//!   no caller can observe the pool with the old worker removed but the new
//!   one not yet added.
//! - The replacement is held busy until the faulty worker's task has been
//!   torn down, so a hung analysis never overlaps the replacement's work and
//!   in-flight analyses stay within `max_workers`.

pub mod scaling;

pub use scaling::{ScalingAction, ScalingPolicy};

use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::constants::operations;
use crate::error::{DispatchError, Result};
use crate::logging::{log_error, log_pool_operation};
use crate::worker::{ChunkAnalyzer, Worker, WorkerHandle, WorkerHealth, WorkerId};

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub healthy: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    handles: HashMap<WorkerId, WorkerHandle>,
    available: VecDeque<WorkerId>,
    busy: HashSet<WorkerId>,
    health: HashMap<WorkerId, WorkerHealth>,
    initialized: bool,
}

impl PoolState {
    fn insert(&mut self, handle: WorkerHandle) {
        let id = handle.id();
        self.health.insert(id, WorkerHealth::new(id));
        self.available.push_back(id);
        self.handles.insert(id, handle);
    }

    /// Add a worker that nobody may acquire until it is released
    fn insert_reserved(&mut self, handle: WorkerHandle) {
        let id = handle.id();
        self.health.insert(id, WorkerHealth::new(id));
        self.busy.insert(id);
        self.handles.insert(id, handle);
    }

    fn remove(&mut self, id: WorkerId) -> Option<WorkerHandle> {
        self.available.retain(|candidate| *candidate != id);
        self.busy.remove(&id);
        self.health.remove(&id);
        self.handles.remove(&id)
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            total: self.handles.len(),
            available: self.available.len(),
            busy: self.busy.len(),
            healthy: self.health.values().filter(|h| h.is_healthy).count(),
        }
    }
}

struct PoolInner {
    config: PoolConfig,
    analyzer: Arc<dyn ChunkAnalyzer>,
    scaling: ScalingPolicy,
    state: Mutex<PoolState>,
    next_id: AtomicU64,
    shutting_down: AtomicBool,
    /// Signalled whenever a worker becomes available or the pool shuts down
    worker_released: Notify,
}

/// Cloneable handle to a worker pool
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("analyzer", &self.inner.analyzer.name())
            .field("metrics", &self.metrics())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

impl WorkerPool {
    /// Create an empty pool. Workers are spawned by `initialize()`.
    pub fn new(config: PoolConfig, analyzer: Arc<dyn ChunkAnalyzer>) -> Result<Self> {
        config.validate()?;

        info!(
            "🏊 POOL: Creating worker pool for {} (min: {}, max: {}, dynamic: {})",
            analyzer.name(),
            config.min_workers,
            config.max_workers,
            config.dynamic_scaling
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                scaling: ScalingPolicy::from_config(&config),
                config,
                analyzer,
                state: Mutex::new(PoolState::default()),
                next_id: AtomicU64::new(1),
                shutting_down: AtomicBool::new(false),
                worker_released: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    fn spawn_worker(&self) -> Result<WorkerHandle> {
        let id = WorkerId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        WorkerHandle::spawn(id, Arc::clone(&self.inner.analyzer), self.inner.config.max_memory_mb)
    }

    /// Spawn the initial workers.
    ///
    /// If any spawn fails, the workers already started are terminated and the
    /// error is returned; no partial pool is left running.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.initialized {
                return Err(DispatchError::InvalidState(
                    "worker pool is already initialized".to_string(),
                ));
            }
            state.initialized = true;
        }

        let count = self.inner.config.initial_workers();
        let mut spawned = Vec::with_capacity(count);

        for _ in 0..count {
            match self.spawn_worker() {
                Ok(handle) => spawned.push(handle),
                Err(e) => {
                    log_error(operations::POOL_INITIALIZE, &e, None);
                    join_all(spawned.into_iter().map(WorkerHandle::terminate)).await;
                    self.inner.state.lock().initialized = false;
                    return Err(e);
                }
            }
        }

        let total = {
            let mut state = self.inner.state.lock();
            for handle in spawned {
                state.insert(handle);
            }
            state.handles.len()
        };
        self.inner.worker_released.notify_waiters();

        log_pool_operation(operations::POOL_INITIALIZE, None, total, "ok", None);
        info!("✅ POOL: Started {} workers", total);
        Ok(())
    }

    /// Take an available worker, or `None` if every worker is busy.
    ///
    /// Workers are handed out in the order they became available.
    pub fn acquire_worker(&self) -> Option<Worker> {
        if self.is_shutting_down() {
            return None;
        }

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        while let Some(id) = state.available.pop_front() {
            if let Some(handle) = state.handles.get(&id) {
                state.busy.insert(id);
                return Some(handle.worker());
            }
            warn!(worker_id = %id, "POOL: Dropping stale available entry");
        }
        None
    }

    /// Take a worker, waiting for one to be released if all are busy.
    ///
    /// Fails with `PoolShutdown` once shutdown has begun, and with
    /// `InvalidState` if the pool has no workers at all.
    pub async fn acquire_worker_wait(&self) -> Result<Worker> {
        loop {
            let notified = self.inner.worker_released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_shutting_down() {
                return Err(DispatchError::PoolShutdown);
            }
            if let Some(worker) = self.acquire_worker() {
                return Ok(worker);
            }
            if self.metrics().total == 0 {
                return Err(DispatchError::InvalidState(
                    "worker pool has no live workers".to_string(),
                ));
            }

            notified.await;
        }
    }

    /// Return a busy worker to the available set. No-op if it is not busy.
    pub fn release_worker(&self, id: WorkerId) {
        let released = {
            let mut state = self.inner.state.lock();
            if state.busy.remove(&id) {
                state.available.push_back(id);
                true
            } else {
                false
            }
        };

        if released {
            self.inner.worker_released.notify_waiters();
        }
    }

    pub fn record_success(&self, id: WorkerId) {
        if let Some(health) = self.inner.state.lock().health.get_mut(&id) {
            health.record_success();
        }
    }

    /// Mark a worker unhealthy and replace it.
    ///
    /// The faulty worker's task is aborted, cancelling any analysis it is
    /// still running. During shutdown the worker is only released; no replacement is spawned.
    pub async fn record_failure(&self, id: WorkerId, err: &DispatchError) {
        log_error(operations::WORKER_FAILURE, err, Some(id));

        let present = match self.inner.state.lock().health.get_mut(&id) {
            Some(health) => {
                health.mark_unhealthy();
                true
            }
            None => false,
        };

        if !present || self.is_shutting_down() {
            self.release_worker(id);
            return;
        }

        self.restart_worker(id).await;
    }

    async fn restart_worker(&self, old: WorkerId) {
        let replacement = match self.spawn_worker() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log_error(operations::WORKER_RESTART, &e, Some(old));
                None
            }
        };
        let replacement_id = replacement.as_ref().map(WorkerHandle::id);

        let (retired, orphan, total) = {
            let mut state = self.inner.state.lock();
            if !state.handles.contains_key(&old) || self.is_shutting_down() {
                // Already removed by shutdown or scale-down.
                (None, replacement, state.handles.len())
            } else {
                let retired = state.remove(old);
                if let Some(handle) = replacement {
                    state.insert_reserved(handle);
                }
                (retired, None, state.handles.len())
            }
        };
        // Waiters recheck the live count when no replacement came up.
        self.inner.worker_released.notify_waiters();

        if let Some(handle) = retired {
            log_pool_operation(
                operations::WORKER_RESTART,
                replacement_id,
                total,
                if replacement_id.is_some() { "replaced" } else { "removed" },
                Some(format!("retired {old}").as_str()),
            );
            handle.abort().await;
            if let Some(id) = replacement_id {
                self.release_worker(id);
            }
        }
        if let Some(handle) = orphan {
            debug!(worker_id = %handle.id(), "POOL: Discarding replacement for already-removed worker");
            handle.terminate().await;
        }
    }

    /// Apply one step of the scaling policy given the number of chunks still
    /// waiting to be dispatched. No-op unless dynamic scaling is enabled.
    pub async fn adjust_pool_size(&self, pending: usize) -> ScalingAction {
        if self.is_shutting_down() {
            return ScalingAction::NoChange;
        }

        let action = self.inner.scaling.evaluate(&self.metrics(), pending);
        match action {
            ScalingAction::ScaleUp { count } => self.add_workers(count).await,
            ScalingAction::ScaleDown { count } => self.remove_idle_workers(count).await,
            ScalingAction::NoChange => {}
        }
        action
    }

    async fn add_workers(&self, count: usize) {
        let max = self.inner.config.max_workers;
        let mut surplus = Vec::new();

        for _ in 0..count {
            let handle = match self.spawn_worker() {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(error = %e, "⚠️ POOL: Scale-up spawn failed");
                    continue;
                }
            };
            let id = handle.id();

            let mut state = self.inner.state.lock();
            if state.handles.len() >= max || self.is_shutting_down() {
                surplus.push(handle);
            } else {
                state.insert(handle);
                let total = state.handles.len();
                drop(state);
                log_pool_operation(operations::POOL_SCALE_UP, Some(id), total, "ok", None);
                info!("🔼 POOL: Added {} (total: {})", id, total);
            }
        }

        self.inner.worker_released.notify_waiters();
        join_all(surplus.into_iter().map(WorkerHandle::terminate)).await;
    }

    async fn remove_idle_workers(&self, count: usize) {
        let min = self.inner.config.min_workers;

        let (retired, total) = {
            let mut state = self.inner.state.lock();
            let mut retired = Vec::new();
            for _ in 0..count {
                if state.handles.len() <= min {
                    break;
                }
                let Some(id) = state.available.pop_back() else {
                    break;
                };
                if let Some(handle) = state.remove(id) {
                    retired.push(handle);
                }
            }
            (retired, state.handles.len())
        };

        for handle in &retired {
            log_pool_operation(operations::POOL_SCALE_DOWN, Some(handle.id()), total, "ok", None);
            info!("🔽 POOL: Removing idle {} (total: {})", handle.id(), total);
        }
        join_all(retired.into_iter().map(WorkerHandle::terminate)).await;
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.inner.state.lock().metrics()
    }

    /// Health records of every live worker, ordered by worker id
    pub fn all_health(&self) -> Vec<WorkerHealth> {
        let mut health: Vec<WorkerHealth> =
            self.inner.state.lock().health.values().cloned().collect();
        health.sort_by_key(|h| h.worker_id);
        health
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Stop every worker and clear the pool.
    ///
    /// In-flight items are allowed to finish within the termination grace
    /// period. Auto-restart is suppressed from the moment this is called.
    /// Subsequent calls are no-ops.
    pub async fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("POOL: Shutdown already in progress");
            return;
        }

        let handles: Vec<WorkerHandle> = {
            let mut state = self.inner.state.lock();
            state.available.clear();
            state.busy.clear();
            state.health.clear();
            state.handles.drain().map(|(_, handle)| handle).collect()
        };
        self.inner.worker_released.notify_waiters();

        let count = handles.len();
        info!("🛑 POOL: Stopping all {} workers", count);
        join_all(handles.into_iter().map(WorkerHandle::terminate)).await;

        log_pool_operation(
            operations::POOL_SHUTDOWN,
            None,
            0,
            "ok",
            Some(format!("{count} workers stopped").as_str()),
        );
        info!("🛑 POOL: All {} workers stopped", count);
    }
}
