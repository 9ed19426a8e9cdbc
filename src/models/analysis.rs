//! Analysis result shapes.
//!
//! `ChunkAnalysis` is what one worker produces for one chunk. `MergedAnalysis`
//! has the same fields and is built by `merge::AnalysisMerger`; it is the record
//! handed to report rendering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessLogic {
    pub rules: Vec<String>,
    pub validations: Vec<String>,
    pub calculations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFlow {
    pub sources: Vec<String>,
    pub transformations: Vec<String>,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateManagement {
    /// Name of the state-management pattern in use (e.g. `redux`, `context`)
    pub pattern: String,
    /// State key to a short description of its shape
    pub state_shape: BTreeMap<String, String>,
    pub key_actions: Vec<String>,
    pub selectors: Vec<String>,
}

/// Per-chunk analysis output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkAnalysis {
    pub purpose: String,
    pub features: Vec<String>,
    pub business_logic: BusinessLogic,
    pub dependencies: Vec<String>,
    pub data_flow: DataFlow,
    pub state_management: StateManagement,
    /// Source dependency name to its suggested target-language replacement
    pub dependency_map: BTreeMap<String, String>,
}

/// Aggregate of every successfully analysed chunk in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergedAnalysis {
    pub purpose: String,
    pub features: Vec<String>,
    pub business_logic: BusinessLogic,
    pub dependencies: Vec<String>,
    pub data_flow: DataFlow,
    pub state_management: StateManagement,
    pub dependency_map: BTreeMap<String, String>,
    /// Number of chunk results folded in
    pub chunks_merged: usize,
    /// Ids of chunks that contributed no data
    pub failed_chunks: Vec<String>,
}

impl MergedAnalysis {
    pub fn is_empty(&self) -> bool {
        self.chunks_merged == 0
    }
}
