//! # Worker Actor
//!
//! `WorkerHandle` owns a running worker task and is held only by the pool.
//! `Worker` is the cheap, cloneable dispatch side handed out by
//! `WorkerPool::acquire_worker`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::analyzer::{execute, ChunkAnalyzer, WorkerContext};
use super::protocol::WorkerResponse;
use super::work_item::WorkItem;
use super::WorkerId;
use crate::constants::lifecycle;
use crate::error::{DispatchError, Result};

/// Messages accepted by a worker mailbox
#[derive(Debug)]
pub enum WorkerMessage {
    Analyze(WorkItem),
    /// Finish the current item, then exit
    Terminate,
}

/// Dispatch handle for one worker
#[derive(Debug, Clone)]
pub struct Worker {
    id: WorkerId,
    mailbox: mpsc::Sender<WorkerMessage>,
}

impl Worker {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Hand a work item to this worker.
    ///
    /// If the worker is gone the item is resolved with a failure response
    /// before `WorkerFault` is returned, so the completion never hangs.
    pub async fn dispatch(&self, item: WorkItem) -> Result<()> {
        match self.mailbox.send(WorkerMessage::Analyze(item)).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(message)) => {
                let reason = "worker mailbox closed".to_string();
                if let WorkerMessage::Analyze(item) = message {
                    item.resolve(WorkerResponse::failure(format!("{}: {reason}", self.id)));
                }
                Err(DispatchError::WorkerFault {
                    worker_id: self.id,
                    reason,
                })
            }
        }
    }

    /// Whether the worker task has exited
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

/// Owning handle of a worker task
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    mailbox: mpsc::Sender<WorkerMessage>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Bring up a worker. The analyzer's `started` hook runs before the task
    /// is spawned; a hook error becomes `WorkerSpawn`.
    pub fn spawn(
        id: WorkerId,
        analyzer: Arc<dyn ChunkAnalyzer>,
        max_memory_mb: Option<u64>,
    ) -> Result<Self> {
        let context = WorkerContext {
            worker_id: id,
            max_memory_mb,
        };
        analyzer
            .started(&context)
            .map_err(|e| DispatchError::WorkerSpawn {
                worker_id: id,
                reason: format!("{e:#}"),
            })?;

        let (mailbox, receiver) = mpsc::channel(lifecycle::WORKER_MAILBOX_CAPACITY);
        let task = tokio::spawn(run_worker(id, analyzer, receiver));

        debug!(worker_id = %id, "WORKER: Spawned");
        Ok(Self { id, mailbox, task })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn worker(&self) -> Worker {
        Worker {
            id: self.id,
            mailbox: self.mailbox.clone(),
        }
    }

    /// Ask the worker to exit and wait for it, aborting the task if it does
    /// not finish within the termination grace period.
    pub async fn terminate(self) {
        let WorkerHandle {
            id,
            mailbox,
            mut task,
        } = self;

        // A closed mailbox means the task already exited.
        let _ = mailbox.send(WorkerMessage::Terminate).await;
        drop(mailbox);

        let grace = Duration::from_millis(lifecycle::TERMINATION_GRACE_MS);
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(())) => debug!(worker_id = %id, "WORKER: Terminated"),
            Ok(Err(e)) => warn!(worker_id = %id, error = %e, "WORKER: Task ended abnormally"),
            Err(_) => {
                warn!(
                    worker_id = %id,
                    grace_ms = lifecycle::TERMINATION_GRACE_MS,
                    "WORKER: Did not stop within grace period, aborting"
                );
                task.abort();
            }
        }
    }

    /// Stop a faulted worker at once, cancelling whatever it is running.
    /// Returns after the task has been torn down.
    pub async fn abort(self) {
        let WorkerHandle { id, mailbox, task } = self;
        drop(mailbox);
        task.abort();
        match task.await {
            Err(e) if e.is_cancelled() => debug!(worker_id = %id, "WORKER: Aborted"),
            Err(e) => warn!(worker_id = %id, error = %e, "WORKER: Task ended abnormally"),
            Ok(()) => debug!(worker_id = %id, "WORKER: Exited before abort"),
        }
    }
}

async fn run_worker(
    id: WorkerId,
    analyzer: Arc<dyn ChunkAnalyzer>,
    mut receiver: mpsc::Receiver<WorkerMessage>,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            WorkerMessage::Analyze(item) => {
                let (response, panicked) = execute(analyzer.as_ref(), item.chunk()).await;
                if panicked {
                    error!(
                        worker_id = %id,
                        chunk_id = %item.chunk_id(),
                        analyzer = analyzer.name(),
                        "WORKER: Analyzer panicked, worker exiting"
                    );
                }
                item.resolve(response);
                if panicked {
                    break;
                }
            }
            WorkerMessage::Terminate => break,
        }
    }

    // Anything still queued is answered so no completion is left pending.
    receiver.close();
    while let Ok(message) = receiver.try_recv() {
        if let WorkerMessage::Analyze(item) = message {
            item.resolve(WorkerResponse::failure(format!("{id} exited")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkAnalysis, WorkChunk};
    use crate::worker::Completion;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChunkAnalyzer for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
            if chunk.id == "panic" {
                panic!("bad chunk");
            }
            if chunk.id == "hang" {
                std::future::pending::<()>().await;
            }
            Ok(ChunkAnalysis {
                purpose: chunk.id.clone(),
                ..ChunkAnalysis::default()
            })
        }
    }

    struct RefusesToStart;

    #[async_trait]
    impl ChunkAnalyzer for RefusesToStart {
        fn name(&self) -> &'static str {
            "refuses"
        }

        fn started(&self, _context: &WorkerContext) -> anyhow::Result<()> {
            anyhow::bail!("no runtime available")
        }

        async fn analyze(&self, _chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
            Ok(ChunkAnalysis::default())
        }
    }

    fn item(id: &str) -> (WorkItem, Completion) {
        WorkItem::new(0, Arc::new(WorkChunk::new(id, "component").with_blob("a.js", "x")))
    }

    #[tokio::test]
    async fn test_worker_answers_dispatched_items() {
        let handle = WorkerHandle::spawn(WorkerId::new(1), Arc::new(Echo), None).unwrap();
        let worker = handle.worker();

        let (work, completion) = item("c1");
        worker.dispatch(work).await.unwrap();
        let response = completion.await.unwrap();
        assert_eq!(response.into_result().unwrap().purpose, "c1");

        handle.terminate().await;
        assert!(worker.is_closed());
    }

    #[tokio::test]
    async fn test_spawn_fails_when_started_hook_errors() {
        let err = WorkerHandle::spawn(WorkerId::new(9), Arc::new(RefusesToStart), None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::WorkerSpawn { worker_id, .. } if worker_id == WorkerId::new(9)
        ));
    }

    #[tokio::test]
    async fn test_panic_stops_worker_and_later_dispatch_faults() {
        let handle = WorkerHandle::spawn(WorkerId::new(2), Arc::new(Echo), None).unwrap();
        let worker = handle.worker();

        let (work, completion) = item("panic");
        worker.dispatch(work).await.unwrap();
        let response = completion.await.unwrap();
        assert!(!response.success);

        handle.terminate().await;

        let (work, completion) = item("after");
        let err = worker.dispatch(work).await.unwrap_err();
        assert!(err.is_worker_failure());
        assert!(!completion.await.unwrap().success);
    }

    #[tokio::test]
    async fn test_abort_cancels_running_item() {
        let handle = WorkerHandle::spawn(WorkerId::new(3), Arc::new(Echo), None).unwrap();
        let worker = handle.worker();

        let (work, completion) = item("hang");
        worker.dispatch(work).await.unwrap();
        tokio::task::yield_now().await;

        handle.abort().await;

        assert!(completion.await.is_none());
        assert!(worker.is_closed());
    }
}
