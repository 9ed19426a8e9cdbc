//! # Template Analyzer
//!
//! A static, line-oriented analyzer for JavaScript/TypeScript sources. It
//! needs no external service and produces deterministic output, which makes
//! it the default analyzer for the CLI and a realistic workload for tests.
//!
//! Extraction is heuristic: each line is matched against a handful of
//! prefixes and markers. Anything it does not recognise is ignored.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::analyzer::ChunkAnalyzer;
use crate::models::{BusinessLogic, ChunkAnalysis, DataFlow, StateManagement, WorkChunk};

/// Known replacements for common JavaScript packages
const DEPENDENCY_TARGETS: &[(&str, &str)] = &[
    ("axios", "reqwest"),
    ("node-fetch", "reqwest"),
    ("moment", "chrono"),
    ("dayjs", "chrono"),
    ("date-fns", "chrono"),
    ("express", "axum"),
    ("lodash", "itertools"),
    ("uuid", "uuid"),
    ("react", "leptos"),
    ("react-dom", "leptos"),
    ("redux", "leptos signals"),
    ("@reduxjs/toolkit", "leptos signals"),
    ("zod", "serde + validator"),
    ("yup", "validator"),
    ("jsonwebtoken", "jsonwebtoken"),
    ("ws", "tokio-tungstenite"),
];

const UNMAPPED_TARGET: &str = "manual review";

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateAnalyzer;

impl TemplateAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyse a chunk synchronously
    pub fn analyze_chunk(&self, chunk: &WorkChunk) -> ChunkAnalysis {
        let mut analysis = ChunkAnalysis {
            purpose: purpose_of(chunk),
            features: chunk.blobs.iter().map(|b| b.identifier.clone()).collect(),
            business_logic: BusinessLogic::default(),
            dependencies: Vec::new(),
            data_flow: DataFlow::default(),
            state_management: StateManagement {
                pattern: pattern_for(&chunk.category).to_string(),
                ..StateManagement::default()
            },
            dependency_map: BTreeMap::new(),
        };

        for blob in &chunk.blobs {
            for line in blob.content.lines().map(str::trim) {
                scan_line(line, &mut analysis);
            }
        }

        for dependency in &analysis.dependencies {
            analysis
                .dependency_map
                .insert(dependency.clone(), target_for(dependency).to_string());
        }

        analysis
    }
}

#[async_trait]
impl ChunkAnalyzer for TemplateAnalyzer {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn analyze(&self, chunk: &WorkChunk) -> anyhow::Result<ChunkAnalysis> {
        Ok(self.analyze_chunk(chunk))
    }
}

fn purpose_of(chunk: &WorkChunk) -> String {
    let context = chunk.context.trim();
    if context.is_empty() {
        format!("{} module {}", chunk.category, chunk.id)
    } else {
        context.to_string()
    }
}

fn pattern_for(category: &str) -> &'static str {
    match category {
        "store" | "reducer" | "slice" => "redux",
        "context" | "provider" => "context",
        "component" | "page" | "view" => "local-state",
        _ => "",
    }
}

fn target_for(dependency: &str) -> &'static str {
    DEPENDENCY_TARGETS
        .iter()
        .find(|(source, _)| *source == dependency)
        .map(|(_, target)| *target)
        .unwrap_or(UNMAPPED_TARGET)
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn scan_line(line: &str, analysis: &mut ChunkAnalysis) {
    if let Some(module) = imported_module(line) {
        // Relative imports are internal to the project.
        if !module.starts_with('.') {
            push_unique(&mut analysis.dependencies, package_name(module).to_string());
        }
    }

    if let Some(action) = line
        .strip_prefix("case ")
        .and_then(|rest| quoted(rest))
    {
        push_unique(&mut analysis.state_management.key_actions, action.to_string());
    }

    if let Some(name) = declared_name(line) {
        if name.starts_with("select") {
            push_unique(&mut analysis.state_management.selectors, name.to_string());
        } else if name.starts_with("validate") || name.starts_with("isValid") {
            push_unique(&mut analysis.business_logic.validations, name.to_string());
        } else if name.starts_with("calculate") || name.starts_with("compute") {
            push_unique(&mut analysis.business_logic.calculations, name.to_string());
        }
    }

    if line.starts_with("if (") && line.contains("throw") {
        push_unique(&mut analysis.business_logic.rules, line.to_string());
    }

    let flow = &mut analysis.data_flow;
    if line.contains("fetch(") || line.contains("axios.") {
        push_unique(&mut flow.sources, "http".to_string());
    }
    if line.contains("localStorage.getItem") {
        push_unique(&mut flow.sources, "localStorage".to_string());
    }
    if line.contains("localStorage.setItem") {
        push_unique(&mut flow.destinations, "localStorage".to_string());
    }
    if line.contains("dispatch(") {
        push_unique(&mut flow.destinations, "store".to_string());
    }
    for transform in ["map", "filter", "reduce"] {
        if line.contains(&format!(".{transform}(")) {
            push_unique(&mut flow.transformations, transform.to_string());
        }
    }
}

/// Module named by an `import ... from '...'`, `require('...')` or `use '...'` line
fn imported_module(line: &str) -> Option<&str> {
    if line.starts_with("import ") {
        return match line.rfind(" from ") {
            Some(at) => quoted(&line[at + 6..]),
            None => quoted(&line[7..]),
        };
    }
    if let Some(at) = line.find("require(") {
        return quoted(&line[at + 8..]);
    }
    // `use 'pkg'` only; quoted directives such as 'use strict' start with a quote.
    if let Some(rest) = line.strip_prefix("use ") {
        return quoted(rest);
    }
    None
}

/// `@scope/pkg/sub` becomes `@scope/pkg`, `pkg/sub` becomes `pkg`
fn package_name(module: &str) -> &str {
    let mut parts = module.splitn(3, '/');
    let first = parts.next().unwrap_or(module);
    if first.starts_with('@') {
        match parts.next() {
            Some(second) => &module[..first.len() + 1 + second.len()],
            None => module,
        }
    } else {
        first
    }
}

/// First single-, double- or back-quoted string in `text`
fn quoted(text: &str) -> Option<&str> {
    let start = text.find(['\'', '"', '`'])?;
    let quote = text[start..].chars().next()?;
    let rest = &text[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

/// Name declared by a `function name`, `const name =` or `export ...` line
fn declared_name(line: &str) -> Option<&str> {
    let line = line
        .strip_prefix("export ")
        .unwrap_or(line)
        .trim_start_matches("default ")
        .trim_start_matches("async ");
    let rest = line
        .strip_prefix("function ")
        .or_else(|| line.strip_prefix("const "))
        .or_else(|| line.strip_prefix("let "))?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"
import { createSlice } from '@reduxjs/toolkit/query';
import axios from "axios";
import helpers from './helpers';
const _ = require('lodash');

export const selectCart = (state) => state.cart;
export function calculateTotal(items) {
  return items.map(i => i.price).reduce((a, b) => a + b, 0);
}
function validateCoupon(code) {
  if (code.length < 4) throw new Error('short');
}
switch (action.type) {
  case 'cart/add':
  case "cart/remove":
}
localStorage.setItem('cart', json);
"#;

    #[test]
    fn test_store_chunk_extraction() {
        let chunk = WorkChunk::new("store-1", "store")
            .with_blob("cart.js", STORE)
            .with_context("Shopping cart state");
        let analysis = TemplateAnalyzer::new().analyze_chunk(&chunk);

        assert_eq!(analysis.purpose, "Shopping cart state");
        assert_eq!(analysis.features, vec!["cart.js"]);
        assert_eq!(
            analysis.dependencies,
            vec!["@reduxjs/toolkit", "axios", "lodash"]
        );
        assert_eq!(analysis.dependency_map["axios"], "reqwest");
        assert_eq!(analysis.dependency_map["lodash"], "itertools");

        let state = &analysis.state_management;
        assert_eq!(state.pattern, "redux");
        assert_eq!(state.key_actions, vec!["cart/add", "cart/remove"]);
        assert_eq!(state.selectors, vec!["selectCart"]);

        assert_eq!(analysis.business_logic.calculations, vec!["calculateTotal"]);
        assert_eq!(analysis.business_logic.validations, vec!["validateCoupon"]);
        assert_eq!(analysis.business_logic.rules.len(), 1);

        assert_eq!(analysis.data_flow.transformations, vec!["map", "reduce"]);
        assert_eq!(analysis.data_flow.destinations, vec!["localStorage"]);
    }

    #[test]
    fn test_unknown_dependency_needs_review() {
        let chunk = WorkChunk::new("c", "component").with_blob("c.js", "import x from 'left-pad';");
        let analysis = TemplateAnalyzer::new().analyze_chunk(&chunk);
        assert_eq!(analysis.dependency_map["left-pad"], UNMAPPED_TARGET);
        assert_eq!(analysis.purpose, "component module c");
        assert_eq!(analysis.state_management.pattern, "local-state");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(package_name("@scope/pkg/deep"), "@scope/pkg");
        assert_eq!(package_name("react-dom/client"), "react-dom");
        assert_eq!(quoted("  `tpl` rest"), Some("tpl"));
        assert_eq!(declared_name("export default async function load() {"), Some("load"));
        assert_eq!(declared_name("return 1;"), None);
    }

    #[test]
    fn test_imported_module_forms() {
        assert_eq!(imported_module("import x from 'react';"), Some("react"));
        assert_eq!(imported_module("import 'polyfill';"), Some("polyfill"));
        assert_eq!(imported_module("const y = require(\"lodash/fp\");"), Some("lodash/fp"));
        assert_eq!(imported_module("use 'vuex';"), Some("vuex"));
        assert_eq!(imported_module("'use strict';"), None);
    }
}
