//! # Analyzer Entry Point
//!
//! The computation a worker performs is supplied from outside the dispatch
//! engine through the `ChunkAnalyzer` trait. The implementation is registered
//! once, when the pool is constructed, and shared by every worker.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::protocol::WorkerResponse;
use super::WorkerId;
use crate::models::{ChunkAnalysis, WorkChunk};

/// Information handed to an analyzer when a worker comes up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    pub worker_id: WorkerId,
    /// Advisory memory budget from `PoolConfig::max_memory_mb`
    pub max_memory_mb: Option<u64>,
}

/// Analysis logic executed by workers.
///
/// ## Example
///
/// ```rust
/// use analysis_dispatch::models::{ChunkAnalysis, WorkChunk};
/// use analysis_dispatch::worker::ChunkAnalyzer;
/// use async_trait::async_trait;
///
/// struct PurposeOnly;
///
/// #[async_trait]
/// impl ChunkAnalyzer for PurposeOnly {
///     fn name(&self) -> &'static str {
///         "purpose-only"
///     }
///
///     async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
///         Ok(ChunkAnalysis {
///             purpose: chunk.context.clone(),
///             ..ChunkAnalysis::default()
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait ChunkAnalyzer: Send + Sync + 'static {
    /// Analyzer name for logging
    fn name(&self) -> &'static str;

    /// Called once for every worker before it accepts work.
    ///
    /// Returning an error fails the spawn. During `initialize()` this aborts
    /// pool construction; during a restart it leaves the pool one worker short.
    fn started(&self, _context: &WorkerContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Analyse a single chunk
    async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis>;
}

/// Run the analyzer on one chunk, converting errors and panics into a
/// failure response. The flag is true when the analyzer panicked.
pub(crate) async fn execute(
    analyzer: &dyn ChunkAnalyzer,
    chunk: &WorkChunk,
) -> (WorkerResponse, bool) {
    match AssertUnwindSafe(analyzer.analyze(chunk))
        .catch_unwind()
        .await
    {
        Ok(Ok(analysis)) => (WorkerResponse::success(analysis), false),
        Ok(Err(e)) => (WorkerResponse::failure(format!("{e:#}")), false),
        Err(panic) => (
            WorkerResponse::failure(format!("analyzer panicked: {}", panic_message(&panic))),
            true,
        ),
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted;

    #[async_trait]
    impl ChunkAnalyzer for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
            match chunk.id.as_str() {
                "error" => anyhow::bail!("cannot parse"),
                "panic" => panic!("analyzer exploded"),
                _ => Ok(ChunkAnalysis {
                    purpose: chunk.id.clone(),
                    ..ChunkAnalysis::default()
                }),
            }
        }
    }

    fn chunk(id: &str) -> WorkChunk {
        WorkChunk::new(id, "component").with_blob("a.js", "export default 1")
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (response, panicked) = execute(&Scripted, &chunk("ok")).await;
        assert!(!panicked);
        assert_eq!(response.into_result().unwrap().purpose, "ok");
    }

    #[tokio::test]
    async fn test_execute_error_becomes_failure_response() {
        let (response, panicked) = execute(&Scripted, &chunk("error")).await;
        assert!(!panicked);
        assert_eq!(response.into_result().unwrap_err(), "cannot parse");
    }

    #[tokio::test]
    async fn test_execute_catches_panics() {
        let (response, panicked) = execute(&Scripted, &chunk("panic")).await;
        assert!(panicked);
        let reason = response.into_result().unwrap_err();
        assert!(reason.contains("analyzer exploded"), "{reason}");
    }
}
