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

//! Mutable state owned by exactly one pipeline execution.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::SiftPipelineConfig;
use crate::dataset::SiftDataset;
use crate::errors::{Result, SiftError};
use crate::plugin::{SiftAppliedFix, SiftIssue, SiftProfileResult};

/// Per-execution pipeline state.
///
/// The dataset is replaced wholesale; profile results and applied fixes are
/// append-only. The scratch directory is created on first use and removed
/// by [`SiftPipelineContext::cleanup`].
#[derive(Debug)]
pub struct SiftPipelineContext {
    pipeline_id: String,
    config: Arc<SiftPipelineConfig>,
    data: Option<SiftDataset>,
    profile_results: Vec<SiftProfileResult>,
    applied_fixes: Vec<SiftAppliedFix>,
    scratch: Option<TempDir>,
}

impl SiftPipelineContext {
    pub fn new(pipeline_id: impl Into<String>, config: Arc<SiftPipelineConfig>) -> Self {
        SiftPipelineContext {
            pipeline_id: pipeline_id.into(),
            config,
            data: None,
            profile_results: Vec::new(),
            applied_fixes: Vec::new(),
            scratch: None,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn config(&self) -> &SiftPipelineConfig {
        &self.config
    }

    pub fn config_arc(&self) -> Arc<SiftPipelineConfig> {
        Arc::clone(&self.config)
    }

    /// Current dataset; an error before extraction has run.
    pub fn data(&self) -> Result<&SiftDataset> {
        self.data
            .as_ref()
            .ok_or_else(|| SiftError::internal("no dataset available; extraction has not run"))
    }

    pub fn set_data(&mut self, data: SiftDataset) {
        self.data = Some(data);
    }

    pub fn take_data(&mut self) -> Result<SiftDataset> {
        self.data
            .take()
            .ok_or_else(|| SiftError::internal("no dataset available; extraction has not run"))
    }

    pub fn profile_results(&self) -> &[SiftProfileResult] {
        &self.profile_results
    }

    pub fn add_profile_result(&mut self, result: SiftProfileResult) {
        self.profile_results.push(result);
    }

    /// Every issue of every profile result, in profiling order.
    pub fn all_issues(&self) -> Vec<SiftIssue> {
        self.profile_results
            .iter()
            .flat_map(|r| r.issues.iter().cloned())
            .collect()
    }

    pub fn applied_fixes(&self) -> &[SiftAppliedFix] {
        &self.applied_fixes
    }

    pub fn add_applied_fixes(&mut self, fixes: impl IntoIterator<Item = SiftAppliedFix>) {
        self.applied_fixes.extend(fixes);
    }

    /// Scratch directory for this run, created on first call.
    ///
    /// Lives under the configured `temp_dir`, or the system temp dir.
    pub fn scratch_dir(&mut self) -> Result<&Path> {
        if self.scratch.is_none() {
            let base = self.config.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
            fs::create_dir_all(&base)?;
            let dir = tempfile::Builder::new()
                .prefix(&format!("sift_{}_", scratch_label(&self.pipeline_id)))
                .tempdir_in(&base)?;
            log::debug!(
                "context.scratch.create: scratch directory created - pipeline={}, path={}",
                self.pipeline_id,
                dir.path().display()
            );
            self.scratch = Some(dir);
        }
        self.scratch
            .as_ref()
            .map(|d| d.path())
            .ok_or_else(|| SiftError::internal("scratch directory unavailable"))
    }

    /// Path of the scratch directory if it has been created.
    pub fn scratch_path(&self) -> Option<PathBuf> {
        self.scratch.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Writes the current dataset as `<label>.json` into the scratch directory.
    pub fn snapshot(&mut self, label: &str) -> Result<PathBuf> {
        let bytes = serde_json::to_vec(self.data()?)?;
        let path = self.scratch_dir()?.join(format!("{}.json", label));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Removes the scratch directory; later calls are no-ops.
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            dir.close().map_err(|e| {
                SiftError::Io(format!("failed to remove scratch directory '{}': {}", path.display(), e))
            })?;
            log::debug!(
                "context.scratch.remove: scratch directory removed - pipeline={}, path={}",
                self.pipeline_id,
                path.display()
            );
        }
        Ok(())
    }
}

fn scratch_label(pipeline_id: &str) -> String {
    pipeline_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(36)
        .collect()
}
