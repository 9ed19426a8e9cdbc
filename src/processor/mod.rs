//! # Analysis Processor
//!
//! Batch scheduler on top of the worker pool. Chunks are split into
//! consecutive batches of `min(max_workers, chunk count)`. Every chunk of a
//! batch is dispatched concurrently and the batch is a hard barrier: batch
//! N+1 starts only after every dispatch of batch N has settled.
//!
//! After each batch the pool is given one scaling step and exactly one
//! `ProgressEvent` is emitted.
//!
//! Per-chunk failures (timeouts, analyzer errors, worker faults) never abort a
//! run. The chunk contributes nothing to the merged result and its id is
//! listed in `MergedAnalysis::failed_chunks`.
//!
//! With `streaming` enabled, results are folded as they settle; otherwise they
//! are folded in chunk order once the batch barrier is reached. Progress
//! events are emitted at batch boundaries in both modes.

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::constants::operations;
use crate::error::{DispatchError, Result};
use crate::logging::log_batch_operation;
use crate::merge::AnalysisMerger;
use crate::models::{ChunkAnalysis, MergedAnalysis, ProgressEvent, WorkChunk};
use crate::pool::WorkerPool;
use crate::worker::analyzer::execute;
use crate::worker::{ChunkAnalyzer, Completion, WorkItem, WorkerId};

/// Settled result of one chunk dispatch
#[derive(Debug)]
struct ChunkOutcome {
    index: usize,
    chunk_id: String,
    result: Result<ChunkAnalysis>,
}

pub struct AnalysisProcessor {
    config: PoolConfig,
    analyzer: Arc<dyn ChunkAnalyzer>,
    pool: Option<WorkerPool>,
}

impl std::fmt::Debug for AnalysisProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisProcessor")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.name())
            .field("pool", &self.pool)
            .finish()
    }
}

impl AnalysisProcessor {
    /// Validate the configuration and, when `use_workers` is set, build and
    /// initialize the worker pool.
    pub async fn new(config: PoolConfig, analyzer: Arc<dyn ChunkAnalyzer>) -> Result<Self> {
        config.validate()?;

        let pool = if config.use_workers {
            let pool = WorkerPool::new(config.clone(), Arc::clone(&analyzer))?;
            pool.initialize().await?;
            Some(pool)
        } else {
            info!("PROCESSOR: Running {} in-process", analyzer.name());
            None
        };

        Ok(Self {
            config,
            analyzer,
            pool,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The worker pool, absent in in-process mode
    pub fn pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }

    /// Analyse every chunk and return the merged result.
    ///
    /// `on_progress` is called once per batch, after the batch has settled.
    /// Fails only for malformed input; per-chunk failures are absorbed.
    pub async fn process<F>(&self, chunks: &[WorkChunk], mut on_progress: F) -> Result<MergedAnalysis>
    where
        F: FnMut(&ProgressEvent),
    {
        for (index, chunk) in chunks.iter().enumerate() {
            if let Some(reason) = chunk.validation_error() {
                return Err(DispatchError::InvalidChunk { index, reason });
            }
        }

        if chunks.is_empty() {
            debug!("PROCESSOR: No chunks to process");
            return Ok(MergedAnalysis::default());
        }

        let total = chunks.len();
        let batch_size = self.config.concurrency().min(total);
        let chunks: Vec<Arc<WorkChunk>> = chunks.iter().cloned().map(Arc::new).collect();

        info!(
            "PROCESSOR: Processing {} chunks in batches of {} (streaming: {})",
            total, batch_size, self.config.streaming
        );

        let mut merger = AnalysisMerger::new();
        let mut processed = 0;
        let mut failed = 0;

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let first_index = batch_index * batch_size;
            log_batch_operation(
                operations::BATCH_START,
                batch_index,
                batch.len(),
                processed,
                total,
                failed,
            );

            let dispatches = batch
                .iter()
                .enumerate()
                .map(|(offset, chunk)| self.dispatch(first_index + offset, Arc::clone(chunk)));

            if self.config.streaming {
                let mut settled: FuturesUnordered<_> = dispatches.collect();
                while let Some(outcome) = settled.next().await {
                    fold_outcome(&mut merger, outcome, &mut failed);
                }
            } else {
                for outcome in join_all(dispatches).await {
                    fold_outcome(&mut merger, outcome, &mut failed);
                }
            }

            processed += batch.len();
            let pending = total - processed;

            if let Some(pool) = &self.pool {
                pool.adjust_pool_size(pending).await;
            }

            log_batch_operation(
                operations::BATCH_COMPLETE,
                batch_index,
                batch.len(),
                processed,
                total,
                failed,
            );
            on_progress(&self.progress(processed, total, pending, failed));
        }

        let merged = merger.into_result();
        info!(
            "PROCESSOR: Completed {} chunks ({} merged, {} failed)",
            total,
            merged.chunks_merged,
            merged.failed_chunks.len()
        );
        Ok(merged)
    }

    fn progress(&self, processed: usize, total: usize, pending: usize, failed: usize) -> ProgressEvent {
        let metrics = self.pool.as_ref().map(WorkerPool::metrics).unwrap_or_default();
        ProgressEvent {
            processed,
            total,
            percentage: ProgressEvent::percentage_of(processed, total),
            active_workers: metrics.busy,
            available_workers: metrics.available,
            pending_work: pending,
            failed,
        }
    }

    async fn dispatch(&self, index: usize, chunk: Arc<WorkChunk>) -> ChunkOutcome {
        let chunk_id = chunk.id.clone();
        let result = match &self.pool {
            Some(pool) => self.dispatch_to_worker(pool, index, chunk).await,
            None => self.run_in_process(chunk).await,
        };
        ChunkOutcome {
            index,
            chunk_id,
            result,
        }
    }

    async fn dispatch_to_worker(
        &self,
        pool: &WorkerPool,
        index: usize,
        chunk: Arc<WorkChunk>,
    ) -> Result<ChunkAnalysis> {
        let worker = pool.acquire_worker_wait().await?;
        let worker_id = worker.id();
        let (item, mut completion) = WorkItem::new(index, chunk);
        let chunk_id = item.chunk_id().to_string();

        debug!(worker_id = %worker_id, chunk_id = %chunk_id, "PROCESSOR: Dispatching chunk");

        if let Err(e) = worker.dispatch(item).await {
            pool.record_failure(worker_id, &e).await;
            return Err(e);
        }

        let timeout = self.config.task_timeout();
        let outcome = match tokio::time::timeout(timeout, &mut completion).await {
            Ok(Some(response)) => response
                .into_result()
                .map_err(|reason| DispatchError::Analysis {
                    chunk_id: chunk_id.clone(),
                    reason,
                }),
            Ok(None) => Err(DispatchError::WorkerFault {
                worker_id,
                reason: format!("work item for chunk {chunk_id} dropped"),
            }),
            Err(_) => {
                warn!(
                    worker_id = %worker_id,
                    chunk_id = %chunk_id,
                    timeout_ms = self.config.timeout_ms,
                    "⏱️ PROCESSOR: Chunk timed out"
                );
                Err(DispatchError::TaskTimeout {
                    chunk_id,
                    timeout_ms: self.config.timeout_ms,
                })
            }
        };

        match &outcome {
            Ok(_) => {
                pool.record_success(worker_id);
                pool.release_worker(worker_id);
            }
            Err(e) if e.is_worker_failure() => pool.record_failure(worker_id, e).await,
            // A timeout alone says nothing about the worker yet.
            Err(_) => reclaim_after_timeout(pool.clone(), worker_id, completion, timeout),
        }
        outcome
    }

    async fn run_in_process(&self, chunk: Arc<WorkChunk>) -> Result<ChunkAnalysis> {
        let timeout = self.config.task_timeout();
        match tokio::time::timeout(timeout, execute(self.analyzer.as_ref(), &chunk)).await {
            Ok((response, _)) => response.into_result().map_err(|reason| DispatchError::Analysis {
                chunk_id: chunk.id.clone(),
                reason,
            }),
            Err(_) => Err(DispatchError::TaskTimeout {
                chunk_id: chunk.id.clone(),
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }
}

/// A timed-out worker stays busy for one more timeout window. If it answers
/// in that window it goes back to the pool; otherwise it is treated as hung
/// and replaced. A late answer belongs to a rejected chunk, so it does not
/// count towards the worker's completed tasks.
fn reclaim_after_timeout(pool: WorkerPool, worker_id: WorkerId, completion: Completion, window: Duration) {
    tokio::spawn(async move {
        let reason = match tokio::time::timeout(window, completion).await {
            Ok(Some(response)) if response.success => {
                debug!(worker_id = %worker_id, "PROCESSOR: Late result discarded, worker reclaimed");
                pool.release_worker(worker_id);
                return;
            }
            Ok(Some(response)) => response
                .error
                .unwrap_or_else(|| "late failure after timeout".to_string()),
            Ok(None) => "work item dropped after timeout".to_string(),
            Err(_) => "unresponsive after timeout".to_string(),
        };

        let err = DispatchError::WorkerFault { worker_id, reason };
        pool.record_failure(worker_id, &err).await;
    });
}

fn fold_outcome(merger: &mut AnalysisMerger, outcome: ChunkOutcome, failed: &mut usize) {
    match outcome.result {
        Ok(analysis) => merger.fold(&analysis),
        Err(e) => {
            warn!(
                chunk_index = outcome.index,
                chunk_id = %outcome.chunk_id,
                error = %e,
                "PROCESSOR: Chunk contributed no data"
            );
            merger.record_failure(outcome.chunk_id);
            *failed += 1;
        }
    }
}
