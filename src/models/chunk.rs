//! Work chunks produced by the project scanner.

use serde::{Deserialize, Serialize};

/// A named piece of source content inside a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlob {
    pub identifier: String,
    pub content: String,
}

impl ContentBlob {
    pub fn new(identifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
        }
    }
}

/// One immutable unit of input work.
///
/// Chunks are read-only to the dispatch engine; once scheduled they are shared
/// behind an `Arc` between the scheduler and the worker that analyses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkChunk {
    /// Stable identifier, used in logs and in `MergedAnalysis::failed_chunks`
    pub id: String,
    /// Category tag assigned by the scanner (e.g. `component`, `store`, `service`)
    pub category: String,
    pub blobs: Vec<ContentBlob>,
    /// Free-text context describing where the chunk came from
    #[serde(default)]
    pub context: String,
}

impl WorkChunk {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            blobs: Vec::new(),
            context: String::new(),
        }
    }

    pub fn with_blob(mut self, identifier: impl Into<String>, content: impl Into<String>) -> Self {
        self.blobs.push(ContentBlob::new(identifier, content));
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Reason this chunk cannot be dispatched, if any
    pub fn validation_error(&self) -> Option<String> {
        if self.id.trim().is_empty() {
            return Some("chunk id is empty".to_string());
        }
        if self.blobs.is_empty() {
            return Some(format!("chunk {} has no content blobs", self.id));
        }
        None
    }
}
