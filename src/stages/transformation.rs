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

//! Transformation stage and the suggestion approval hook.
//!
//! In `manual` and `half-auto` modes each transformer is first asked for
//! suggestions, which the [`SiftApprovalPolicy`] filters. Approval is
//! advisory: `transform` runs regardless and decides from its own
//! parameters what to change. Suggestion and approval counts are recorded
//! in the `plugin_complete` event.

use serde_json::Value;

use crate::context::SiftPipelineContext;
use crate::errors::Result;
use crate::pipeline::SiftExecutionMode;
use crate::plugin::{SiftPluginRole, SiftSuggestion};
use crate::stages::{escalate, metrics, plugin_complete, plugin_error, SiftStageExecutor, STAGE_TRANSFORM};

/// Decides which suggestions count as approved.
pub trait SiftApprovalPolicy: Send + Sync {
    fn approve(
        &self,
        mode: SiftExecutionMode,
        transformer: &str,
        suggestions: Vec<SiftSuggestion>,
    ) -> Vec<SiftSuggestion>;
}

/// Manual mode approves everything in place of a human reviewer; the
/// automatic modes approve nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SiftDefaultApproval;

impl SiftApprovalPolicy for SiftDefaultApproval {
    fn approve(
        &self,
        mode: SiftExecutionMode,
        _transformer: &str,
        suggestions: Vec<SiftSuggestion>,
    ) -> Vec<SiftSuggestion> {
        match mode {
            SiftExecutionMode::Manual => suggestions,
            SiftExecutionMode::HalfAuto | SiftExecutionMode::ControlledAuto => Vec::new(),
        }
    }
}

impl SiftStageExecutor<'_> {
    /// Runs every enabled transformer in order on a running copy of the dataset.
    pub fn transform(&mut self, ctx: &mut SiftPipelineContext, mode: SiftExecutionMode) -> Result<()> {
        let config = ctx.config_arc();
        let pipeline_id = ctx.pipeline_id().to_string();
        let role = SiftPluginRole::Transformer;
        let approval = self.approval;

        let mut running = ctx.data()?.clone();
        let issues = ctx.all_issues();

        for spec in config.enabled_transformers() {
            let input = &running;
            let outcome = self.with_plugin(&pipeline_id, STAGE_TRANSFORM, role, spec, |lease, audit| {
                let transformer = lease.transformer()?;

                let (suggested, approved) = if mode.suggests_fixes() {
                    let suggested = transformer.suggest_fixes(input, &issues)?;
                    let approved = approval.approve(mode, &spec.plugin, suggested.clone());
                    (suggested, approved)
                } else {
                    (Vec::new(), Vec::new())
                };

                let result = transformer.transform(input)?;
                plugin_complete(
                    audit,
                    &pipeline_id,
                    STAGE_TRANSFORM,
                    spec,
                    role,
                    metrics([
                        ("rows_before", Value::from(input.len())),
                        ("rows_after", Value::from(result.data.len())),
                        ("fixes_applied", Value::from(result.applied_fixes.len())),
                        ("suggestions", Value::from(suggested.len())),
                        ("approved", serde_json::to_value(&approved)?),
                    ]),
                )?;
                Ok(result)
            });

            match outcome {
                Ok(result) => {
                    log::info!(
                        "stage.transform.complete: transformer finished - pipeline={}, plugin={}, rows_before={}, rows_after={}, fixes={}",
                        pipeline_id,
                        spec.plugin,
                        running.len(),
                        result.data.len(),
                        result.applied_fixes.len()
                    );
                    running = result.data;
                    ctx.add_applied_fixes(result.applied_fixes);
                }
                Err(err) => {
                    plugin_error(self.audit, &pipeline_id, STAGE_TRANSFORM, spec, role, &err);
                    escalate(spec, err)?;
                    log::warn!(
                        "stage.transform.continue: transformer failed, dataset left unchanged - pipeline={}, plugin={}",
                        pipeline_id,
                        spec.plugin
                    );
                }
            }
        }

        ctx.set_data(running);
        Ok(())
    }
}
