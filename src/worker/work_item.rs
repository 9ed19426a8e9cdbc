//! Work items and their completions.
//!
//! A `WorkItem` pairs a chunk with the sending half of a oneshot channel.
//! `resolve` consumes the item, so a completion can be settled at most once;
//! dropping an unresolved item settles the `Completion` with `None`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use super::protocol::WorkerResponse;
use crate::models::WorkChunk;

#[derive(Debug)]
pub struct WorkItem {
    index: usize,
    chunk: Arc<WorkChunk>,
    completion: oneshot::Sender<WorkerResponse>,
}

impl WorkItem {
    /// Create an item for the chunk at `index` in the run's input
    pub fn new(index: usize, chunk: Arc<WorkChunk>) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                index,
                chunk,
                completion: tx,
            },
            Completion { receiver: rx },
        )
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn chunk(&self) -> &WorkChunk {
        &self.chunk
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk.id
    }

    /// Settle the completion. A receiver that already gave up is ignored.
    pub fn resolve(self, response: WorkerResponse) {
        let _ = self.completion.send(response);
    }
}

/// Receiving side of a `WorkItem`.
///
/// Resolves to `None` if the item was dropped without being resolved.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<WorkerResponse>,
}

impl Future for Completion {
    type Output = Option<WorkerResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|r| r.ok())
    }
}
