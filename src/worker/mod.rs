//! # Workers
//!
//! A worker is an isolated execution context that analyses one chunk at a
//! time. Each worker is a lightweight actor: a tokio task that owns an mpsc
//! mailbox and answers every `WorkItem` it receives exactly once.
//!
//! ```text
//! AnalysisProcessor ──WorkItem──→ Worker mailbox ──→ ChunkAnalyzer::analyze
//!        ↑                                                   │
//!        └──────────── Completion ←── WorkerResponse ←───────┘
//! ```
//!
//! The analysis itself is supplied by a `ChunkAnalyzer` implementation that is
//! registered when the pool is built.

pub mod analyzer;
pub mod handle;
pub mod health;
pub mod protocol;
pub mod template;
pub mod work_item;

pub use analyzer::{ChunkAnalyzer, WorkerContext};
pub use handle::{Worker, WorkerHandle, WorkerMessage};
pub use health::WorkerHealth;
pub use protocol::WorkerResponse;
pub use template::TemplateAnalyzer;
pub use work_item::{Completion, WorkItem};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a worker, issued by the pool when the worker is spawned.
///
/// Ids are never reused within a pool, so a replacement worker is always
/// distinguishable from the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(u64);

impl WorkerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}
