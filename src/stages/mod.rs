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

//! # Sift Stage Executors
//!
//! The four stages share one per-plugin routine:
//!
//! 1. instantiate the plugin through the registry (runs `setup`)
//! 2. record `plugin_start`
//! 3. run the role operation and record `plugin_complete` with metrics
//! 4. release the plugin whatever happened; a teardown failure is audited
//!    as `plugin_error` at stage `cleanup` and otherwise ignored
//!
//! Failures from steps 1 to 3 are recorded as `plugin_error` and then handed
//! to the descriptor's error policy:
//!
//! | Stage          | stop             | continue                          | retry         |
//! |----------------|------------------|-----------------------------------|---------------|
//! | Extraction     | abort            | abort                             | abort         |
//! | Profiling      | abort            | skip, keep going                  | unsupported   |
//! | Transformation | abort            | dataset unchanged, keep going     | unsupported   |
//! | Loading        | abort, no undo   | failure record, keep going        | unsupported   |

pub mod extraction;
pub mod loading;
pub mod profiling;
pub mod transformation;

pub use loading::SiftLoadOutcome;
pub use transformation::{SiftApprovalPolicy, SiftDefaultApproval};

use serde_json::{Map, Value};

use crate::audit::{SiftAuditEvent, SiftAuditEventType, SiftAuditSink};
use crate::config::{SiftErrorPolicy, SiftPluginSpec};
use crate::errors::{Result, SiftError};
use crate::plugin::SiftPluginRole;
use crate::registry::{SiftPluginLease, SiftPluginRegistry};

pub const STAGE_EXTRACT: &str = "extract";
pub const STAGE_PROFILE: &str = "profile";
pub const STAGE_TRANSFORM: &str = "transform";
pub const STAGE_LOAD: &str = "load";
pub const STAGE_CLEANUP: &str = "cleanup";

/// Runs stages against one registry and audit sink.
pub struct SiftStageExecutor<'a> {
    registry: &'a mut SiftPluginRegistry,
    audit: &'a dyn SiftAuditSink,
    approval: &'a dyn SiftApprovalPolicy,
}

impl<'a> SiftStageExecutor<'a> {
    pub fn new(
        registry: &'a mut SiftPluginRegistry,
        audit: &'a dyn SiftAuditSink,
        approval: &'a dyn SiftApprovalPolicy,
    ) -> Self {
        SiftStageExecutor {
            registry,
            audit,
            approval,
        }
    }

    /// Instantiates `spec`, runs `body` between start and release, and
    /// returns its result. `body` is responsible for `plugin_complete`.
    fn with_plugin<T, F>(
        &mut self,
        pipeline_id: &str,
        stage: &str,
        role: SiftPluginRole,
        spec: &SiftPluginSpec,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut SiftPluginLease<'_>, &dyn SiftAuditSink) -> Result<T>,
    {
        let audit = self.audit;
        let mut lease = self.registry.instantiate(&spec.plugin, role, &spec.params)?;
        if let Some(timeout) = spec.timeout {
            log::warn!(
                "stage.plugin.timeout_unenforced: timeout is recorded but not enforced - pipeline={}, plugin={}, timeout_secs={}",
                pipeline_id,
                spec.plugin,
                timeout
            );
        }

        let outcome = record(
            audit,
            SiftAuditEvent::new(SiftAuditEventType::PluginStart, pipeline_id)
                .with_stage(stage)
                .with_plugin(&spec.plugin, role)
                .with_field("params", Value::Object(spec.params.clone())),
        )
        .and_then(|_| body(&mut lease, audit));

        if let Err(e) = lease.release() {
            record_best_effort(
                audit,
                SiftAuditEvent::new(SiftAuditEventType::PluginError, pipeline_id)
                    .with_stage(STAGE_CLEANUP)
                    .with_plugin(&spec.plugin, role)
                    .failed(e.to_string()),
            );
        }
        outcome
    }
}

/// Appends an event, surfacing sink failures.
pub(crate) fn record(audit: &dyn SiftAuditSink, event: SiftAuditEvent) -> Result<()> {
    audit.append(event).map(|_| ())
}

/// Appends an event, logging sink failures instead of returning them.
pub(crate) fn record_best_effort(audit: &dyn SiftAuditSink, event: SiftAuditEvent) {
    let kind = event.event_type.as_str();
    if let Err(e) = audit.append(event) {
        log::error!("stage.audit.append_failed: {} - event={}", e, kind);
    }
}

pub(crate) fn plugin_complete(
    audit: &dyn SiftAuditSink,
    pipeline_id: &str,
    stage: &str,
    spec: &SiftPluginSpec,
    role: SiftPluginRole,
    data: Map<String, Value>,
) -> Result<()> {
    record(
        audit,
        SiftAuditEvent::new(SiftAuditEventType::PluginComplete, pipeline_id)
            .with_stage(stage)
            .with_plugin(&spec.plugin, role)
            .with_data(data),
    )
}

pub(crate) fn plugin_error(
    audit: &dyn SiftAuditSink,
    pipeline_id: &str,
    stage: &str,
    spec: &SiftPluginSpec,
    role: SiftPluginRole,
    err: &SiftError,
) {
    log::error!(
        "stage.plugin.error: {} - pipeline={}, stage={}, plugin={}, on_error={}",
        err,
        pipeline_id,
        stage,
        spec.plugin,
        spec.on_error
    );
    record_best_effort(
        audit,
        SiftAuditEvent::new(SiftAuditEventType::PluginError, pipeline_id)
            .with_stage(stage)
            .with_plugin(&spec.plugin, role)
            .failed(err.to_string()),
    );
}

/// Applies the descriptor's policy: `Ok(err)` means keep going.
pub(crate) fn escalate(spec: &SiftPluginSpec, err: SiftError) -> Result<SiftError> {
    match spec.on_error {
        SiftErrorPolicy::Continue => Ok(err),
        SiftErrorPolicy::Stop => Err(err),
        SiftErrorPolicy::Retry => Err(SiftError::UnsupportedPolicy {
            plugin: spec.plugin.clone(),
            policy: SiftErrorPolicy::Retry.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Builds a JSON object from key/value pairs.
pub(crate) fn metrics<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
