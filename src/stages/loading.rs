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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::SiftPipelineContext;
use crate::errors::Result;
use crate::plugin::{SiftLoadResult, SiftPluginRole};
use crate::stages::{escalate, metrics, plugin_complete, plugin_error, SiftStageExecutor, STAGE_LOAD};

/// One entry of the pipeline's `load_results`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftLoadOutcome {
    pub plugin: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_loaded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiftLoadOutcome {
    pub fn from_result(plugin: impl Into<String>, result: SiftLoadResult) -> Self {
        SiftLoadOutcome {
            plugin: plugin.into(),
            success: result.success,
            rows_loaded: Some(result.rows_loaded),
            metadata: Some(result.metadata),
            error: None,
        }
    }

    pub fn failure(plugin: impl Into<String>, error: impl Into<String>) -> Self {
        SiftLoadOutcome {
            plugin: plugin.into(),
            success: false,
            rows_loaded: None,
            metadata: None,
            error: Some(error.into()),
        }
    }
}

impl SiftStageExecutor<'_> {
    /// Hands the final dataset to every enabled loader in order.
    ///
    /// Loaders that already ran are not rolled back when a later one aborts.
    pub fn load(&mut self, ctx: &SiftPipelineContext) -> Result<Vec<SiftLoadOutcome>> {
        let config = ctx.config_arc();
        let pipeline_id = ctx.pipeline_id().to_string();
        let role = SiftPluginRole::Loader;
        let data = ctx.data()?;
        let mut outcomes = Vec::new();

        for spec in config.enabled_loaders() {
            let outcome = self.with_plugin(&pipeline_id, STAGE_LOAD, role, spec, |lease, audit| {
                let result = lease.loader()?.load(data)?;
                plugin_complete(
                    audit,
                    &pipeline_id,
                    STAGE_LOAD,
                    spec,
                    role,
                    metrics([
                        ("rows_loaded", Value::from(result.rows_loaded)),
                        ("success", Value::from(result.success)),
                    ]),
                )?;
                Ok(result)
            });

            match outcome {
                Ok(result) => {
                    log::info!(
                        "stage.load.complete: loader finished - pipeline={}, plugin={}, success={}, rows={}",
                        pipeline_id,
                        spec.plugin,
                        result.success,
                        result.rows_loaded
                    );
                    outcomes.push(SiftLoadOutcome::from_result(&spec.plugin, result));
                }
                Err(err) => {
                    plugin_error(self.audit, &pipeline_id, STAGE_LOAD, spec, role, &err);
                    let err = escalate(spec, err)?;
                    log::warn!(
                        "stage.load.continue: loader failed, recording failure - pipeline={}, plugin={}",
                        pipeline_id,
                        spec.plugin
                    );
                    outcomes.push(SiftLoadOutcome::failure(&spec.plugin, err.to_string()));
                }
            }
        }
        Ok(outcomes)
    }
}
