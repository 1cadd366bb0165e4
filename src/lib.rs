//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Sift.
//! The Sift project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Sift Core Library
//!
//! Sift is a plugin-driven data cleaning pipeline. A pipeline extracts one
//! tabular dataset, profiles it for quality issues, transforms it and hands
//! the result to one or more loaders. Every step is written to an audit
//! trail.
//!
//! ## Module Overview
//!
//! - **errors**: `SiftError` and the crate-wide `Result`
//! - **dataset**: `SiftDataset`, the tabular value passed between stages
//! - **plugin**: plugin role traits and their result records
//! - **config**: YAML pipeline configuration with `${VAR:default}` substitution
//! - **audit**: audit events and the JSONL / in-memory sinks
//! - **registry**: discovery, API version gate and plugin lifecycle
//! - **context**: per-execution state and scratch directory
//! - **stages**: extraction, profiling, transformation and loading
//! - **pipeline**: the orchestrator and execution modes
//! - **engine**: facade for embedding applications
//! - **plugins**: bundled `basic_profiler` and `basic_cleaner`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sift::*;
//!
//! let discovery = builtin_plugins().register(SiftDiscoveredPlugin::extractor::<MyCsvReader>(
//!     "csv",
//!     SiftPluginSource::Registered,
//! ));
//! let audit = Arc::new(SiftMemoryAuditSink::new());
//! let mut engine = SiftEngine::new(Arc::new(discovery), audit);
//!
//! let config = SiftPipelineConfig::new(SiftPluginSpec::new("csv"))
//!     .with_profiler(SiftPluginSpec::new("basic_profiler"))
//!     .with_transformer(SiftPluginSpec::new("basic_cleaner").with_param("drop_duplicates", true))
//!     .with_loader(SiftPluginSpec::new("my_loader"));
//! let result = engine.run_pipeline(&config, SiftExecutionMode::Manual, None)?;
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, SiftError>`. Stage failures that abort a
//! run surface as `SiftError::PipelineExecution` naming the stage, with the
//! plugin's error as its source.

pub mod audit;
pub mod config;
pub mod context;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod stages;

pub use audit::{
    default_audit_path, SiftAuditEvent, SiftAuditEventType, SiftAuditSink, SiftJsonlAuditSink, SiftMemoryAuditSink,
};
pub use config::{SiftErrorPolicy, SiftLogLevel, SiftPipelineConfig, SiftPluginSpec};
pub use context::SiftPipelineContext;
pub use dataset::{SiftDataset, SiftRecord, SiftRow};
pub use engine::SiftEngine;
pub use errors::{Result, SiftError};
pub use pipeline::{SiftExecutionMode, SiftPipeline, SiftPipelineResult, SiftPipelineState};
pub use plugin::{
    SiftAppliedFix, SiftExtractor, SiftIssue, SiftLoadResult, SiftLoader, SiftParams, SiftPlugin,
    SiftPluginInstance, SiftPluginMetadata, SiftPluginRole, SiftProfileResult, SiftProfiler, SiftSeverity,
    SiftSuggestion, SiftTransformResult, SiftTransformer, SIFT_PLUGIN_API_MAJOR,
};
pub use plugins::{builtin_plugins, SiftBasicCleaner, SiftBasicProfiler, SiftTargetType};
pub use registry::{
    check_api_version, SiftApiVersion, SiftCompositeDiscovery, SiftDiscoveredPlugin, SiftManifestDiscovery,
    SiftPluginCatalog, SiftPluginDiscovery, SiftPluginFactory, SiftPluginInfo, SiftPluginLease, SiftPluginRegistry,
    SiftPluginSource, SiftStaticDiscovery,
};
pub use stages::{SiftApprovalPolicy, SiftDefaultApproval, SiftLoadOutcome, SiftStageExecutor};
