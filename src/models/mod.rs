//! # Data Models
//!
//! Input chunks, per-chunk analysis results, the merged aggregate and the
//! progress events emitted while a run is in flight.

pub mod analysis;
pub mod chunk;
pub mod progress;

pub use analysis::{BusinessLogic, ChunkAnalysis, DataFlow, MergedAnalysis, StateManagement};
pub use chunk::{ContentBlob, WorkChunk};
pub use progress::ProgressEvent;
