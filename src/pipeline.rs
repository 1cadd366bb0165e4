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

//! # Sift Pipeline Orchestrator
//!
//! Sequences the stages in a fixed order:
//!
//! ```text
//! Created -> Extracting -> Profiling? -> Transforming? -> Loading -> Complete
//!                \____________\_______________\______________\____-> Error
//! ```
//!
//! Profiling and transformation only run when the configuration lists
//! profilers or transformers. Any unrecovered stage failure is recorded as
//! `pipeline_error` and returned as [`SiftError::PipelineExecution`] naming
//! the stage. The context's scratch directory is removed on every exit path.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{SiftAuditEvent, SiftAuditEventType, SiftAuditSink};
use crate::config::SiftPipelineConfig;
use crate::context::SiftPipelineContext;
use crate::dataset::SiftDataset;
use crate::errors::{Result, SiftError};
use crate::plugin::SiftAppliedFix;
use crate::registry::{SiftPluginDiscovery, SiftPluginRegistry};
use crate::stages::{
    record, record_best_effort, SiftApprovalPolicy, SiftDefaultApproval, SiftLoadOutcome, SiftStageExecutor,
    STAGE_EXTRACT, STAGE_LOAD, STAGE_PROFILE, STAGE_TRANSFORM,
};

/// How suggestion approval behaves during transformation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiftExecutionMode {
    #[default]
    Manual,
    HalfAuto,
    ControlledAuto,
}

impl SiftExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiftExecutionMode::Manual => "manual",
            SiftExecutionMode::HalfAuto => "half-auto",
            SiftExecutionMode::ControlledAuto => "controlled-auto",
        }
    }

    /// Whether transformers are asked for suggestions in this mode.
    pub fn suggests_fixes(&self) -> bool {
        matches!(self, SiftExecutionMode::Manual | SiftExecutionMode::HalfAuto)
    }
}

impl fmt::Display for SiftExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiftExecutionMode {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "manual" => Ok(SiftExecutionMode::Manual),
            "half-auto" => Ok(SiftExecutionMode::HalfAuto),
            "controlled-auto" => Ok(SiftExecutionMode::ControlledAuto),
            other => Err(SiftError::validation(format!(
                "unknown execution mode '{}', expected manual, half-auto or controlled-auto",
                other
            ))),
        }
    }
}

/// Orchestrator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiftPipelineState {
    Created,
    Extracting,
    Profiling,
    Transforming,
    Loading,
    Complete,
    Error,
}

impl SiftPipelineState {
    /// Stage name reported in audit events and execution errors.
    pub fn stage_name(&self) -> &'static str {
        match self {
            SiftPipelineState::Created => "setup",
            SiftPipelineState::Extracting => STAGE_EXTRACT,
            SiftPipelineState::Profiling => STAGE_PROFILE,
            SiftPipelineState::Transforming => STAGE_TRANSFORM,
            SiftPipelineState::Loading => STAGE_LOAD,
            SiftPipelineState::Complete => "complete",
            SiftPipelineState::Error => "error",
        }
    }
}

/// Successful execution summary returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftPipelineResult {
    pub pipeline_id: String,
    pub success: bool,
    pub rows_processed: usize,
    pub applied_fixes: Vec<SiftAppliedFix>,
    pub load_results: Vec<SiftLoadOutcome>,
    pub data: SiftDataset,
}

/// Runs pipeline configurations against one registry and audit sink.
pub struct SiftPipeline {
    registry: SiftPluginRegistry,
    audit: Arc<dyn SiftAuditSink>,
    approval: Box<dyn SiftApprovalPolicy>,
    state: SiftPipelineState,
}

impl SiftPipeline {
    pub fn new(discovery: Arc<dyn SiftPluginDiscovery>, audit: Arc<dyn SiftAuditSink>) -> Self {
        SiftPipeline {
            registry: SiftPluginRegistry::new(discovery),
            audit,
            approval: Box::new(SiftDefaultApproval),
            state: SiftPipelineState::Created,
        }
    }

    /// Replaces the suggestion approval hook.
    pub fn with_approval_policy(mut self, policy: impl SiftApprovalPolicy + 'static) -> Self {
        self.approval = Box::new(policy);
        self
    }

    pub fn registry(&self) -> &SiftPluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SiftPluginRegistry {
        &mut self.registry
    }

    pub fn audit(&self) -> &Arc<dyn SiftAuditSink> {
        &self.audit
    }

    /// State reached by the most recent execution.
    pub fn state(&self) -> SiftPipelineState {
        self.state
    }

    /// Validates `config` and runs all stages.
    ///
    /// Validation failures are returned as configuration errors before any
    /// audit event is written.
    pub fn execute(
        &mut self,
        config: &SiftPipelineConfig,
        mode: SiftExecutionMode,
        pipeline_id: Option<&str>,
    ) -> Result<SiftPipelineResult> {
        config.validate()?;

        let pipeline_id = pipeline_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut resolved = config.clone();
        resolved.normalize();
        let mut ctx = SiftPipelineContext::new(pipeline_id.clone(), Arc::new(resolved));
        self.state = SiftPipelineState::Created;
        log::info!(
            "pipeline.start: pipeline started - pipeline={}, mode={}, name={}",
            pipeline_id,
            mode,
            config.name.as_deref().unwrap_or("-")
        );

        let outcome = self.run_stages(&mut ctx, mode);

        let result = match outcome {
            Ok(result) => {
                self.state = SiftPipelineState::Complete;
                log::info!(
                    "pipeline.complete: pipeline finished - pipeline={}, rows={}, fixes={}, loaders={}",
                    pipeline_id,
                    result.rows_processed,
                    result.applied_fixes.len(),
                    result.load_results.len()
                );
                Ok(result)
            }
            Err(err) => {
                let stage = self.state.stage_name();
                self.state = SiftPipelineState::Error;
                log::error!(
                    "pipeline.error: pipeline failed - pipeline={}, stage={}, error={}",
                    pipeline_id,
                    stage,
                    err
                );
                record_best_effort(
                    self.audit.as_ref(),
                    SiftAuditEvent::new(SiftAuditEventType::PipelineError, &pipeline_id)
                        .with_stage(stage)
                        .with_field("stage", stage)
                        .failed(err.to_string()),
                );
                Err(SiftError::pipeline_execution(stage, err))
            }
        };

        for err in self.registry.release_all() {
            log::warn!("pipeline.cleanup.plugin: {} - pipeline={}", err, pipeline_id);
        }
        if let Err(err) = ctx.cleanup() {
            log::warn!("pipeline.cleanup.scratch: {} - pipeline={}", err, pipeline_id);
        }
        result
    }

    fn run_stages(&mut self, ctx: &mut SiftPipelineContext, mode: SiftExecutionMode) -> Result<SiftPipelineResult> {
        let audit = Arc::clone(&self.audit);
        let config = ctx.config_arc();
        let pipeline_id = ctx.pipeline_id().to_string();

        record(
            audit.as_ref(),
            SiftAuditEvent::new(SiftAuditEventType::PipelineStart, &pipeline_id)
                .with_field("mode", mode.as_str())
                .with_field("config", serde_json::to_value(config.as_ref())?),
        )?;

        let mut exec = SiftStageExecutor::new(&mut self.registry, audit.as_ref(), self.approval.as_ref());

        self.state = SiftPipelineState::Extracting;
        exec.extract(ctx)?;
        if config.cache_intermediate_results {
            snapshot(ctx, "extracted");
        }

        if !config.profilers.is_empty() {
            self.state = SiftPipelineState::Profiling;
            exec.profile(ctx)?;
        }

        if !config.transformers.is_empty() {
            self.state = SiftPipelineState::Transforming;
            exec.transform(ctx, mode)?;
            if config.cache_intermediate_results {
                snapshot(ctx, "transformed");
            }
        }

        self.state = SiftPipelineState::Loading;
        let load_results = exec.load(ctx)?;

        let applied_fixes = ctx.applied_fixes().to_vec();
        let data = ctx.take_data()?;
        record(
            audit.as_ref(),
            SiftAuditEvent::new(SiftAuditEventType::PipelineComplete, &pipeline_id)
                .with_field("rows_processed", data.len())
                .with_field("fixes_applied", applied_fixes.len())
                .with_field("load_results", serde_json::to_value(&load_results)?),
        )?;

        Ok(SiftPipelineResult {
            pipeline_id,
            success: true,
            rows_processed: data.len(),
            applied_fixes,
            load_results,
            data,
        })
    }
}

/// Intermediate snapshots are a cache hint; failures only warn.
fn snapshot(ctx: &mut SiftPipelineContext, label: &str) {
    match ctx.snapshot(label) {
        Ok(path) => log::debug!(
            "pipeline.snapshot: intermediate dataset cached - pipeline={}, path={}",
            ctx.pipeline_id(),
            path.display()
        ),
        Err(err) => log::warn!(
            "pipeline.snapshot.failed: {} - pipeline={}, label={}",
            err,
            ctx.pipeline_id(),
            label
        ),
    }
}
