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

//! # Sift Plugin Contract
//!
//! This module defines the traits that extractor, profiler, transformer and
//! loader plugins implement, together with the records they exchange with
//! the stage executors.
//!
//! ## Lifecycle
//!
//! Every plugin instance goes through the same three steps within a single
//! stage call:
//!
//! - `setup(params)`: validate and store the descriptor's parameter mapping
//! - one role operation (`extract`, `profile`, `transform` or `load`)
//! - `teardown()`: best effort; failures are logged, never propagated
//!
//! ## Implementing a Plugin
//!
//! ```rust
//! use sift::dataset::SiftDataset;
//! use sift::errors::Result;
//! use sift::plugin::{SiftLoadResult, SiftLoader, SiftPlugin, SiftPluginMetadata};
//!
//! #[derive(Default)]
//! struct CountingLoader;
//!
//! impl SiftPlugin for CountingLoader {
//!     fn metadata() -> SiftPluginMetadata {
//!         SiftPluginMetadata::new("Counting Loader", "0.1.0")
//!     }
//! }
//!
//! impl SiftLoader for CountingLoader {
//!     fn load(&mut self, data: &SiftDataset) -> Result<SiftLoadResult> {
//!         Ok(SiftLoadResult::loaded(data.len()))
//!     }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset::SiftDataset;
use crate::errors::{Result, SiftError};

/// Major plugin API version supported by this platform.
pub const SIFT_PLUGIN_API_MAJOR: u32 = 1;

/// Free-form parameter mapping handed to `setup`.
pub type SiftParams = Map<String, Value>;

/// The four plugin capabilities, one per stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiftPluginRole {
    Extractor,
    Profiler,
    Transformer,
    Loader,
}

impl SiftPluginRole {
    pub const ALL: [SiftPluginRole; 4] = [
        SiftPluginRole::Extractor,
        SiftPluginRole::Profiler,
        SiftPluginRole::Transformer,
        SiftPluginRole::Loader,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiftPluginRole::Extractor => "extractor",
            SiftPluginRole::Profiler => "profiler",
            SiftPluginRole::Transformer => "transformer",
            SiftPluginRole::Loader => "loader",
        }
    }
}

impl fmt::Display for SiftPluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiftPluginRole {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extractor" => Ok(SiftPluginRole::Extractor),
            "profiler" => Ok(SiftPluginRole::Profiler),
            "transformer" => Ok(SiftPluginRole::Transformer),
            "loader" => Ok(SiftPluginRole::Loader),
            other => Err(SiftError::validation(format!("unknown plugin type '{}'", other))),
        }
    }
}

/// Class-level metadata every plugin type declares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiftPluginMetadata {
    pub display_name: String,
    pub version: String,
    pub api_version: String,
    #[serde(default)]
    pub description: String,
}

impl SiftPluginMetadata {
    /// Metadata targeting the current API version (`1.0`).
    pub fn new(display_name: impl Into<String>, version: impl Into<String>) -> Self {
        SiftPluginMetadata {
            display_name: display_name.into(),
            version: version.into(),
            api_version: format!("{}.0", SIFT_PLUGIN_API_MAJOR),
            description: String::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How serious a profiling issue is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiftSeverity {
    Low,
    Medium,
    High,
}

/// A data-quality problem reported by a profiler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub severity: SiftSeverity,
    /// Type-specific fields such as `count` or `percentage`.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl SiftIssue {
    pub fn new(issue_type: impl Into<String>, severity: SiftSeverity) -> Self {
        SiftIssue {
            issue_type: issue_type.into(),
            column: None,
            severity,
            details: Map::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A candidate fix that has not been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftSuggestion {
    pub fix_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    /// Parameters that would enable this fix on the transformer.
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl SiftSuggestion {
    pub fn new(fix_type: impl Into<String>, description: impl Into<String>) -> Self {
        SiftSuggestion {
            fix_type: fix_type.into(),
            column: None,
            description: description.into(),
            impact: None,
            config: Map::new(),
            details: Map::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// A concrete change a transformer made to the dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftAppliedFix {
    pub fix_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default)]
    pub rows_affected: usize,
    pub description: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl SiftAppliedFix {
    pub fn new(fix_type: impl Into<String>, rows_affected: usize, description: impl Into<String>) -> Self {
        SiftAppliedFix {
            fix_type: fix_type.into(),
            column: None,
            rows_affected,
            description: description.into(),
            details: Map::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Output of one profiler invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SiftProfileResult {
    pub issues: Vec<SiftIssue>,
    #[serde(default)]
    pub summary: Map<String, Value>,
    #[serde(default)]
    pub suggestions: Vec<SiftSuggestion>,
}

/// Output of one transformer invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftTransformResult {
    pub data: SiftDataset,
    pub applied_fixes: Vec<SiftAppliedFix>,
}

impl SiftTransformResult {
    pub fn new(data: SiftDataset, applied_fixes: Vec<SiftAppliedFix>) -> Self {
        SiftTransformResult { data, applied_fixes }
    }
}

/// Output of one loader invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftLoadResult {
    pub success: bool,
    pub rows_loaded: usize,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SiftLoadResult {
    /// A successful load of `rows` rows.
    pub fn loaded(rows: usize) -> Self {
        SiftLoadResult {
            success: true,
            rows_loaded: rows,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle shared by every plugin role.
pub trait SiftPlugin: Send {
    /// Class-level metadata used by discovery and the version gate.
    fn metadata() -> SiftPluginMetadata
    where
        Self: Sized;

    /// Validates and stores the descriptor's parameters.
    fn setup(&mut self, _params: &SiftParams) -> Result<()> {
        Ok(())
    }

    /// Releases resources held by the instance.
    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Produces the initial dataset.
pub trait SiftExtractor: SiftPlugin {
    fn extract(&mut self) -> Result<SiftDataset>;
}

/// Inspects a dataset for quality issues without modifying it.
pub trait SiftProfiler: SiftPlugin {
    fn profile(&mut self, data: &SiftDataset) -> Result<SiftProfileResult>;
}

/// Rewrites a dataset and reports the fixes it applied.
pub trait SiftTransformer: SiftPlugin {
    fn transform(&mut self, data: &SiftDataset) -> Result<SiftTransformResult>;

    /// Proposes fixes for the issues found so far.
    fn suggest_fixes(&self, _data: &SiftDataset, _issues: &[SiftIssue]) -> Result<Vec<SiftSuggestion>> {
        Ok(Vec::new())
    }

    fn can_handle_issue(&self, _issue_type: &str) -> bool {
        false
    }
}

/// Writes the final dataset to a destination.
pub trait SiftLoader: SiftPlugin {
    fn load(&mut self, data: &SiftDataset) -> Result<SiftLoadResult>;
}

/// A live plugin instance of any role.
pub enum SiftPluginInstance {
    Extractor(Box<dyn SiftExtractor>),
    Profiler(Box<dyn SiftProfiler>),
    Transformer(Box<dyn SiftTransformer>),
    Loader(Box<dyn SiftLoader>),
}

impl SiftPluginInstance {
    pub fn role(&self) -> SiftPluginRole {
        match self {
            SiftPluginInstance::Extractor(_) => SiftPluginRole::Extractor,
            SiftPluginInstance::Profiler(_) => SiftPluginRole::Profiler,
            SiftPluginInstance::Transformer(_) => SiftPluginRole::Transformer,
            SiftPluginInstance::Loader(_) => SiftPluginRole::Loader,
        }
    }

    pub fn setup(&mut self, params: &SiftParams) -> Result<()> {
        match self {
            SiftPluginInstance::Extractor(p) => p.setup(params),
            SiftPluginInstance::Profiler(p) => p.setup(params),
            SiftPluginInstance::Transformer(p) => p.setup(params),
            SiftPluginInstance::Loader(p) => p.setup(params),
        }
    }

    pub fn teardown(&mut self) -> Result<()> {
        match self {
            SiftPluginInstance::Extractor(p) => p.teardown(),
            SiftPluginInstance::Profiler(p) => p.teardown(),
            SiftPluginInstance::Transformer(p) => p.teardown(),
            SiftPluginInstance::Loader(p) => p.teardown(),
        }
    }

    pub fn as_extractor(&mut self) -> Option<&mut dyn SiftExtractor> {
        match self {
            SiftPluginInstance::Extractor(p) => Some(p.as_mut()),
            _ => None,
        }
    }

    pub fn as_profiler(&mut self) -> Option<&mut dyn SiftProfiler> {
        match self {
            SiftPluginInstance::Profiler(p) => Some(p.as_mut()),
            _ => None,
        }
    }

    pub fn as_transformer(&mut self) -> Option<&mut dyn SiftTransformer> {
        match self {
            SiftPluginInstance::Transformer(p) => Some(p.as_mut()),
            _ => None,
        }
    }

    pub fn as_loader(&mut self) -> Option<&mut dyn SiftLoader> {
        match self {
            SiftPluginInstance::Loader(p) => Some(p.as_mut()),
            _ => None,
        }
    }
}

impl fmt::Debug for SiftPluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiftPluginInstance")
            .field("role", &self.role())
            .finish()
    }
}
