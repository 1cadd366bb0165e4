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
use crate::stages::{metrics, plugin_complete, plugin_error, SiftStageExecutor, STAGE_EXTRACT};

impl SiftStageExecutor<'_> {
    /// Runs the single extractor; any failure is fatal whatever its policy.
    pub fn extract(&mut self, ctx: &mut SiftPipelineContext) -> Result<()> {
        let config = ctx.config_arc();
        let spec = &config.extractor;
        let pipeline_id = ctx.pipeline_id().to_string();
        let role = SiftPluginRole::Extractor;

        let outcome = self.with_plugin(&pipeline_id, STAGE_EXTRACT, role, spec, |lease, audit| {
            let data = lease.extractor()?.extract()?;
            let columns: Vec<Value> = data.columns().iter().map(|c| Value::from(c.as_str())).collect();
            plugin_complete(
                audit,
                &pipeline_id,
                STAGE_EXTRACT,
                spec,
                role,
                metrics([
                    ("rows_extracted", Value::from(data.len())),
                    ("columns", Value::Array(columns)),
                ]),
            )?;
            Ok(data)
        });

        match outcome {
            Ok(data) => {
                log::info!(
                    "stage.extract.complete: dataset extracted - pipeline={}, plugin={}, rows={}, columns={}",
                    pipeline_id,
                    spec.plugin,
                    data.len(),
                    data.columns().len()
                );
                ctx.set_data(data);
                Ok(())
            }
            Err(err) => {
                plugin_error(self.audit, &pipeline_id, STAGE_EXTRACT, spec, role, &err);
                Err(err)
            }
        }
    }
}
