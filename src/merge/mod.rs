//! # Result Merger
//!
//! Folds per-chunk analyses into one `MergedAnalysis`. Each field follows its
//! own rule:
//!
//! | Field kind | Rule |
//! |------------|------|
//! | scalar (`purpose`, `state_management.pattern`) | first non-empty value wins |
//! | list (features, rules, dependencies, ...) | union in first-seen order |
//! | map (`dependency_map`, `state_management.state_shape`) | last write per key wins |
//!
//! List fields are independent of fold order as sets; scalar and map fields
//! depend on it.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::models::{
    BusinessLogic, ChunkAnalysis, DataFlow, MergedAnalysis, StateManagement,
};

/// Insertion-ordered set of strings
#[derive(Debug, Clone, Default)]
struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    fn extend<'a>(&mut self, values: impl IntoIterator<Item = &'a String>) {
        for value in values {
            if self.seen.insert(value.clone()) {
                self.items.push(value.clone());
            }
        }
    }

    fn to_vec(&self) -> Vec<String> {
        self.items.clone()
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

fn keep_first(slot: &mut String, candidate: &str) {
    if slot.is_empty() && !candidate.is_empty() {
        *slot = candidate.to_string();
    }
}

fn overwrite(target: &mut BTreeMap<String, String>, source: &BTreeMap<String, String>, field: &str) {
    for (key, value) in source {
        if let Some(previous) = target.insert(key.clone(), value.clone()) {
            if previous != *value {
                debug!(
                    field,
                    key = %key,
                    previous = %previous,
                    replacement = %value,
                    "MERGE: Key collision resolved by last write"
                );
            }
        }
    }
}

/// Incremental accumulator for chunk analyses
#[derive(Debug, Clone, Default)]
pub struct AnalysisMerger {
    purpose: String,
    pattern: String,
    features: OrderedSet,
    rules: OrderedSet,
    validations: OrderedSet,
    calculations: OrderedSet,
    dependencies: OrderedSet,
    sources: OrderedSet,
    transformations: OrderedSet,
    destinations: OrderedSet,
    key_actions: OrderedSet,
    selectors: OrderedSet,
    dependency_map: BTreeMap<String, String>,
    state_shape: BTreeMap<String, String>,
    chunks_merged: usize,
    failed_chunks: Vec<String>,
}

impl AnalysisMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk analysis into the aggregate
    pub fn fold(&mut self, partial: &ChunkAnalysis) {
        keep_first(&mut self.purpose, &partial.purpose);
        keep_first(&mut self.pattern, &partial.state_management.pattern);

        self.features.extend(&partial.features);
        self.rules.extend(&partial.business_logic.rules);
        self.validations.extend(&partial.business_logic.validations);
        self.calculations.extend(&partial.business_logic.calculations);
        self.dependencies.extend(&partial.dependencies);
        self.sources.extend(&partial.data_flow.sources);
        self.transformations.extend(&partial.data_flow.transformations);
        self.destinations.extend(&partial.data_flow.destinations);
        self.key_actions.extend(&partial.state_management.key_actions);
        self.selectors.extend(&partial.state_management.selectors);

        overwrite(&mut self.dependency_map, &partial.dependency_map, "dependency_map");
        overwrite(
            &mut self.state_shape,
            &partial.state_management.state_shape,
            "state_shape",
        );

        self.chunks_merged += 1;
    }

    /// Note a chunk that contributed no data
    pub fn record_failure(&mut self, chunk_id: impl Into<String>) {
        self.failed_chunks.push(chunk_id.into());
    }

    pub fn chunks_merged(&self) -> usize {
        self.chunks_merged
    }

    /// Snapshot of the aggregate so far
    pub fn result(&self) -> MergedAnalysis {
        MergedAnalysis {
            purpose: self.purpose.clone(),
            features: self.features.to_vec(),
            business_logic: BusinessLogic {
                rules: self.rules.to_vec(),
                validations: self.validations.to_vec(),
                calculations: self.calculations.to_vec(),
            },
            dependencies: self.dependencies.to_vec(),
            data_flow: DataFlow {
                sources: self.sources.to_vec(),
                transformations: self.transformations.to_vec(),
                destinations: self.destinations.to_vec(),
            },
            state_management: StateManagement {
                pattern: self.pattern.clone(),
                state_shape: self.state_shape.clone(),
                key_actions: self.key_actions.to_vec(),
                selectors: self.selectors.to_vec(),
            },
            dependency_map: self.dependency_map.clone(),
            chunks_merged: self.chunks_merged,
            failed_chunks: self.failed_chunks.clone(),
        }
    }

    pub fn into_result(self) -> MergedAnalysis {
        MergedAnalysis {
            purpose: self.purpose,
            features: self.features.into_vec(),
            business_logic: BusinessLogic {
                rules: self.rules.into_vec(),
                validations: self.validations.into_vec(),
                calculations: self.calculations.into_vec(),
            },
            dependencies: self.dependencies.into_vec(),
            data_flow: DataFlow {
                sources: self.sources.into_vec(),
                transformations: self.transformations.into_vec(),
                destinations: self.destinations.into_vec(),
            },
            state_management: StateManagement {
                pattern: self.pattern,
                state_shape: self.state_shape,
                key_actions: self.key_actions.into_vec(),
                selectors: self.selectors.into_vec(),
            },
            dependency_map: self.dependency_map,
            chunks_merged: self.chunks_merged,
            failed_chunks: self.failed_chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_purpose(purpose: &str) -> ChunkAnalysis {
        ChunkAnalysis {
            purpose: purpose.to_string(),
            ..ChunkAnalysis::default()
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_scalar_first_non_empty_wins() {
        let mut merger = AnalysisMerger::new();
        for purpose in ["", "A", "B"] {
            merger.fold(&with_purpose(purpose));
        }
        assert_eq!(merger.result().purpose, "A");
    }

    #[test]
    fn test_whitespace_only_value_counts_as_set() {
        let mut merger = AnalysisMerger::new();
        merger.fold(&with_purpose(""));
        merger.fold(&with_purpose("  "));
        merger.fold(&with_purpose("A"));
        assert_eq!(merger.into_result().purpose, "  ");
    }

    #[test]
    fn test_lists_union_in_first_seen_order() {
        let mut merger = AnalysisMerger::new();
        merger.fold(&ChunkAnalysis {
            features: strings(&["login", "logout"]),
            dependencies: strings(&["axios"]),
            ..ChunkAnalysis::default()
        });
        merger.fold(&ChunkAnalysis {
            features: strings(&["signup", "login"]),
            dependencies: strings(&["react", "axios"]),
            ..ChunkAnalysis::default()
        });

        let merged = merger.result();
        assert_eq!(merged.features, strings(&["login", "logout", "signup"]));
        assert_eq!(merged.dependencies, strings(&["axios", "react"]));
        assert_eq!(merged.chunks_merged, 2);
    }

    #[test]
    fn test_maps_last_write_wins() {
        let mut first = ChunkAnalysis::default();
        first.dependency_map.insert("moment".into(), "time".into());
        first.dependency_map.insert("axios".into(), "reqwest".into());
        first
            .state_management
            .state_shape
            .insert("user".into(), "object".into());

        let mut second = ChunkAnalysis::default();
        second.dependency_map.insert("moment".into(), "chrono".into());
        second
            .state_management
            .state_shape
            .insert("user".into(), "User | null".into());

        let mut merger = AnalysisMerger::new();
        merger.fold(&first);
        merger.fold(&second);
        let merged = merger.into_result();

        assert_eq!(merged.dependency_map["moment"], "chrono");
        assert_eq!(merged.dependency_map["axios"], "reqwest");
        assert_eq!(merged.state_management.state_shape["user"], "User | null");
    }

    #[test]
    fn test_pattern_and_failures() {
        let mut merger = AnalysisMerger::new();
        let mut redux = ChunkAnalysis::default();
        redux.state_management.pattern = "redux".into();
        let mut context = ChunkAnalysis::default();
        context.state_management.pattern = "context".into();

        merger.fold(&ChunkAnalysis::default());
        merger.fold(&redux);
        merger.fold(&context);
        merger.record_failure("chunk-9");

        let merged = merger.result();
        assert_eq!(merged.state_management.pattern, "redux");
        assert_eq!(merged.failed_chunks, strings(&["chunk-9"]));
        assert_eq!(merged.chunks_merged, 3);
    }

    #[test]
    fn test_empty_merger() {
        let merged = AnalysisMerger::new().into_result();
        assert!(merged.is_empty());
        assert_eq!(merged, MergedAnalysis::default());
    }
}
