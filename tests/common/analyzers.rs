//! Scripted analyzers for integration tests.

use analysis_dispatch::models::{ChunkAnalysis, WorkChunk};
use analysis_dispatch::worker::{ChunkAnalyzer, WorkerContext};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Analyzer whose behaviour is scripted per chunk id.
///
/// Tracks how many analyses run at once so tests can assert the concurrency
/// bound.
#[derive(Debug, Default)]
pub struct ScriptedAnalyzer {
    delay: Duration,
    delays: HashMap<String, Duration>,
    fail_ids: HashSet<String>,
    panic_ids: HashSet<String>,
    start_limit: Option<usize>,
    starts: AtomicUsize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn with_delay_for(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail_ids.insert(id.to_string());
        self
    }

    pub fn panicking_on(mut self, id: &str) -> Self {
        self.panic_ids.insert(id.to_string());
        self
    }

    /// Refuse to start any worker beyond the first `limit`
    pub fn with_start_limit(mut self, limit: usize) -> Self {
        self.start_limit = Some(limit);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn started(&self, context: &WorkerContext) -> anyhow::Result<()> {
        let started = self.starts.fetch_add(1, Ordering::SeqCst);
        match self.start_limit {
            Some(limit) if started >= limit => {
                anyhow::bail!("{} refused to start", context.worker_id)
            }
            _ => Ok(()),
        }
    }

    async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self.delays.get(&chunk.id).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        if self.panic_ids.contains(&chunk.id) {
            panic!("scripted panic on {}", chunk.id);
        }
        if self.fail_ids.contains(&chunk.id) {
            anyhow::bail!("scripted failure on {}", chunk.id);
        }

        Ok(analysis_for(&chunk.id))
    }
}

/// The analysis `ScriptedAnalyzer` returns for a chunk id
pub fn analysis_for(id: &str) -> ChunkAnalysis {
    let mut analysis = ChunkAnalysis {
        purpose: format!("purpose of {id}"),
        features: vec![id.to_string(), "shared-feature".to_string()],
        dependencies: vec![format!("dep-{id}"), "shared-dep".to_string()],
        ..ChunkAnalysis::default()
    };
    analysis
        .dependency_map
        .insert("shared-dep".to_string(), format!("target-from-{id}"));
    analysis
}
