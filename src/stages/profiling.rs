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

use serde_json::Value;

use crate::context::SiftPipelineContext;
use crate::errors::Result;
use crate::plugin::SiftPluginRole;
use crate::stages::{escalate, metrics, plugin_complete, plugin_error, SiftStageExecutor, STAGE_PROFILE};

impl SiftStageExecutor<'_> {
    /// Runs every enabled profiler against the current dataset.
    pub fn profile(&mut self, ctx: &mut SiftPipelineContext) -> Result<()> {
        let config = ctx.config_arc();
        let pipeline_id = ctx.pipeline_id().to_string();
        let role = SiftPluginRole::Profiler;

        for spec in config.enabled_profilers() {
            let data = ctx.data()?;
            let outcome = self.with_plugin(&pipeline_id, STAGE_PROFILE, role, spec, |lease, audit| {
                let result = lease.profiler()?.profile(data)?;
                plugin_complete(
                    audit,
                    &pipeline_id,
                    STAGE_PROFILE,
                    spec,
                    role,
                    metrics([
                        ("issues_found", Value::from(result.issues.len())),
                        ("suggestions", Value::from(result.suggestions.len())),
                    ]),
                )?;
                Ok(result)
            });

            match outcome {
                Ok(result) => {
                    log::info!(
                        "stage.profile.complete: profiler finished - pipeline={}, plugin={}, issues={}",
                        pipeline_id,
                        spec.plugin,
                        result.issues.len()
                    );
                    ctx.add_profile_result(result);
                }
                Err(err) => {
                    plugin_error(self.audit, &pipeline_id, STAGE_PROFILE, spec, role, &err);
                    escalate(spec, err)?;
                    log::warn!(
                        "stage.profile.continue: profiler failed, continuing - pipeline={}, plugin={}",
                        pipeline_id,
                        spec.plugin
                    );
                }
            }
        }
        Ok(())
    }
}
