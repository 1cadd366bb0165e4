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

//! # Sift Engine
//!
//! Entry point for embedding applications: runs pipelines from files or
//! in-memory configurations, lists plugins and reads the audit trail.
//!
//! ```rust,ignore
//! use sift::{SiftEngine, SiftExecutionMode, SiftStaticDiscovery};
//!
//! let mut engine = SiftEngine::with_defaults(None, vec![], SiftStaticDiscovery::new())?;
//! let result = engine.run_pipeline_from_file("pipeline.yml", SiftExecutionMode::HalfAuto, None)?;
//! println!("{} rows processed", result.rows_processed);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::{SiftAuditEvent, SiftAuditEventType, SiftAuditSink, SiftJsonlAuditSink};
use crate::config::SiftPipelineConfig;
use crate::errors::Result;
use crate::pipeline::{SiftExecutionMode, SiftPipeline, SiftPipelineResult, SiftPipelineState};
use crate::plugin::SiftPluginRole;
use crate::plugins::builtin_plugins;
use crate::registry::{
    SiftCompositeDiscovery, SiftManifestDiscovery, SiftPluginDiscovery, SiftPluginInfo, SiftStaticDiscovery,
};
use crate::stages::SiftApprovalPolicy;

/// Owns a pipeline and the audit sink it writes to.
pub struct SiftEngine {
    pipeline: SiftPipeline,
    audit: Arc<dyn SiftAuditSink>,
}

impl SiftEngine {
    pub fn new(discovery: Arc<dyn SiftPluginDiscovery>, audit: Arc<dyn SiftAuditSink>) -> Self {
        SiftEngine {
            pipeline: SiftPipeline::new(discovery, Arc::clone(&audit)),
            audit,
        }
    }

    /// Built-in plugins, then manifests under `local_plugin_dirs` bound to
    /// `entry_points`, auditing to a JSONL file.
    ///
    /// An empty `local_plugin_dirs` scans the default plugin directories.
    /// Without `audit_path` the platform data directory is used.
    pub fn with_defaults(
        audit_path: Option<PathBuf>,
        local_plugin_dirs: Vec<PathBuf>,
        entry_points: SiftStaticDiscovery,
    ) -> Result<Self> {
        let audit: Arc<dyn SiftAuditSink> = match audit_path {
            Some(path) => Arc::new(SiftJsonlAuditSink::new(path)?),
            None => Arc::new(SiftJsonlAuditSink::open_default()?),
        };
        let roots = if local_plugin_dirs.is_empty() {
            SiftManifestDiscovery::default_roots()
        } else {
            local_plugin_dirs
        };
        let discovery = SiftCompositeDiscovery::new()
            .with(builtin_plugins())
            .with(entry_points.clone())
            .with(SiftManifestDiscovery::new(roots, entry_points));
        Ok(Self::new(Arc::new(discovery), audit))
    }

    pub fn with_approval_policy(mut self, policy: impl SiftApprovalPolicy + 'static) -> Self {
        self.pipeline = self.pipeline.with_approval_policy(policy);
        self
    }

    /// Loads, substitutes and validates `path`, then executes it.
    pub fn run_pipeline_from_file(
        &mut self,
        path: impl AsRef<Path>,
        mode: SiftExecutionMode,
        pipeline_id: Option<&str>,
    ) -> Result<SiftPipelineResult> {
        let path = path.as_ref();
        log::info!("engine.load_config: loading pipeline configuration - path={}", path.display());
        let config = SiftPipelineConfig::from_path(path)?;
        self.run_pipeline(&config, mode, pipeline_id)
    }

    pub fn run_pipeline(
        &mut self,
        config: &SiftPipelineConfig,
        mode: SiftExecutionMode,
        pipeline_id: Option<&str>,
    ) -> Result<SiftPipelineResult> {
        self.pipeline.execute(config, mode, pipeline_id)
    }

    pub fn list_plugins(&mut self, role: Option<SiftPluginRole>) -> Result<Vec<SiftPluginInfo>> {
        self.pipeline.registry_mut().list_plugins(role)
    }

    pub fn refresh_plugins(&mut self) -> Result<()> {
        self.pipeline.registry_mut().refresh()
    }

    /// All events of one pipeline, oldest first.
    pub fn pipeline_history(&self, pipeline_id: &str) -> Result<Vec<SiftAuditEvent>> {
        self.audit.query_by_pipeline(pipeline_id)
    }

    /// `pipeline_start` events, newest first.
    pub fn recent_executions(&self, limit: usize) -> Result<Vec<SiftAuditEvent>> {
        let starts = self
            .audit
            .query_recent(usize::MAX)?
            .into_iter()
            .filter(|e| e.event_type == SiftAuditEventType::PipelineStart)
            .take(limit)
            .collect();
        Ok(starts)
    }

    /// Every event of one pipeline, oldest first, or the `limit` most recent
    /// events overall. `limit` only applies when no pipeline is given.
    pub fn audit_log(&self, pipeline_id: Option<&str>, limit: usize) -> Result<Vec<SiftAuditEvent>> {
        match pipeline_id {
            Some(id) => self.audit.query_by_pipeline(id),
            None => self.audit.query_recent(limit),
        }
    }

    /// State reached by the most recent run.
    pub fn last_state(&self) -> SiftPipelineState {
        self.pipeline.state()
    }

    pub fn audit(&self) -> &Arc<dyn SiftAuditSink> {
        &self.audit
    }
}
