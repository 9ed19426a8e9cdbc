use analysis_dispatch::models::ChunkAnalysis;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for short identifier-like values, drawn from a small alphabet so
/// generated lists collide often
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

/// Strategy for scalar fields, empty about a third of the time
pub fn scalar_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[A-Z][a-z]{0,6}"]
}

pub fn list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(token_strategy(), 0..6)
}

pub fn map_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(token_strategy(), "[a-z]{1,4}", 0..4)
}

/// Strategy for generating ChunkAnalysis instances
pub fn chunk_analysis_strategy() -> impl Strategy<Value = ChunkAnalysis> {
    (
        scalar_strategy(),
        list_strategy(),
        list_strategy(),
        list_strategy(),
        scalar_strategy(),
        map_strategy(),
    )
        .prop_map(|(purpose, features, dependencies, rules, pattern, dependency_map)| {
            let mut analysis = ChunkAnalysis {
                purpose,
                features,
                dependencies,
                dependency_map,
                ..ChunkAnalysis::default()
            };
            analysis.business_logic.rules = rules;
            analysis.state_management.pattern = pattern;
            analysis
        })
}

pub fn chunk_analyses_strategy() -> impl Strategy<Value = Vec<ChunkAnalysis>> {
    prop::collection::vec(chunk_analysis_strategy(), 0..8)
}
