#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Analysis Dispatch
//!
//! Concurrent work-dispatch engine for source-migration analysis.
//!
//! ## Overview
//!
//! A scanner extracts representative chunks of a source project. This crate
//! fans those chunks out to a pool of isolated workers, each running a
//! `ChunkAnalyzer`, and folds the per-chunk results into one deterministic
//! `MergedAnalysis` that downstream report rendering consumes.
//!
//! ## Architecture
//!
//! ```text
//! chunks ──→ AnalysisProcessor ──batch──→ WorkerPool ──→ Worker ──→ ChunkAnalyzer
//!                  │                          ↑                         │
//!                  │                   scaling policy                   │
//!                  ↓                                                    │
//!            AnalysisMerger ←──────────── WorkerResponse ←──────────────┘
//!                  │
//!                  ↓
//!            MergedAnalysis + ProgressEvent stream
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Worker lifecycle, health, scaling and restart
//! - [`processor`] - Batched dispatch with a per-batch barrier
//! - [`merge`] - Field-wise merge of chunk analyses
//! - [`worker`] - Worker actors, the analyzer trait and the template analyzer
//! - [`models`] - Chunks, analysis results and progress events
//! - [`config`] - Pool configuration and layered loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use analysis_dispatch::config::PoolConfig;
//! use analysis_dispatch::models::WorkChunk;
//! use analysis_dispatch::processor::AnalysisProcessor;
//! use analysis_dispatch::worker::TemplateAnalyzer;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let processor = AnalysisProcessor::new(PoolConfig::default(), Arc::new(TemplateAnalyzer))
//!     .await
//!     .unwrap();
//!
//! let chunks = vec![WorkChunk::new("auth", "service").with_blob("auth.js", "import axios from 'axios';")];
//! let merged = processor
//!     .process(&chunks, |event| println!("{:.0}%", event.percentage))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(merged.dependency_map["axios"], "reqwest");
//! processor.shutdown().await;
//! # });
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod merge;
pub mod models;
pub mod pool;
pub mod processor;
pub mod worker;

pub use config::{ConfigLoader, PoolConfig};
pub use error::{DispatchError, Result};
pub use merge::AnalysisMerger;
pub use models::{ChunkAnalysis, MergedAnalysis, ProgressEvent, WorkChunk};
pub use pool::{PoolMetrics, ScalingAction, WorkerPool};
pub use processor::AnalysisProcessor;
pub use worker::{ChunkAnalyzer, TemplateAnalyzer, WorkerHealth, WorkerId};
