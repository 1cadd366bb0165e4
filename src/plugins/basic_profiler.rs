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

use serde_json::{Map, Value};

use crate::dataset::SiftDataset;
use crate::errors::Result;
use crate::plugin::{
    SiftIssue, SiftPlugin, SiftPluginMetadata, SiftProfileResult, SiftProfiler, SiftSeverity,
};
use crate::plugins::{cleaner_suggestion, ISSUE_DUPLICATE_ROWS, ISSUE_NULL_VALUES, ISSUE_TYPE_MISMATCH};

/// Per-row overhead added to the serialized cell size.
const ROW_OVERHEAD_BYTES: usize = 64;

/// Reports nulls, repeated rows and numeric columns stored as text.
#[derive(Clone, Debug, Default)]
pub struct SiftBasicProfiler;

#[derive(Default)]
struct ColumnStats {
    nulls: usize,
    strings: usize,
    numeric_strings: usize,
    non_null: usize,
}

impl ColumnStats {
    fn observe(&mut self, value: &Value) {
        match value {
            Value::Null => self.nulls += 1,
            Value::String(s) => {
                self.non_null += 1;
                self.strings += 1;
                if s.trim().parse::<f64>().is_ok() {
                    self.numeric_strings += 1;
                }
            }
            _ => self.non_null += 1,
        }
    }

    fn looks_numeric(&self) -> bool {
        self.strings > 0 && self.strings == self.non_null && self.numeric_strings == self.strings
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

fn null_severity(pct: f64) -> SiftSeverity {
    if pct > 50.0 {
        SiftSeverity::High
    } else if pct > 10.0 {
        SiftSeverity::Medium
    } else {
        SiftSeverity::Low
    }
}

impl SiftPlugin for SiftBasicProfiler {
    fn metadata() -> SiftPluginMetadata {
        SiftPluginMetadata::new("Basic Profiler", "1.0.0")
            .with_description("Detects null values, duplicate rows and numeric text columns")
    }
}

impl SiftProfiler for SiftBasicProfiler {
    fn profile(&mut self, data: &SiftDataset) -> Result<SiftProfileResult> {
        let total_rows = data.len();
        let mut stats: Vec<ColumnStats> = data.columns().iter().map(|_| ColumnStats::default()).collect();
        let mut memory_estimate = 0usize;

        for row in data.rows() {
            memory_estimate += ROW_OVERHEAD_BYTES;
            for (cell, col) in row.iter().zip(stats.iter_mut()) {
                col.observe(cell);
                memory_estimate += cell.to_string().len();
            }
        }

        let mut issues = Vec::new();
        for (name, col) in data.columns().iter().zip(&stats) {
            if col.nulls > 0 {
                let pct = percentage(col.nulls, total_rows);
                issues.push(
                    SiftIssue::new(ISSUE_NULL_VALUES, null_severity(pct))
                        .with_column(name)
                        .with_detail("count", col.nulls)
                        .with_detail("percentage", pct),
                );
            }
        }

        let duplicates = data.duplicate_mask(None).into_iter().filter(|d| *d).count();
        if duplicates > 0 {
            issues.push(
                SiftIssue::new(ISSUE_DUPLICATE_ROWS, SiftSeverity::Medium)
                    .with_detail("count", duplicates)
                    .with_detail("percentage", percentage(duplicates, total_rows)),
            );
        }

        for (name, col) in data.columns().iter().zip(&stats) {
            if col.looks_numeric() {
                issues.push(
                    SiftIssue::new(ISSUE_TYPE_MISMATCH, SiftSeverity::Low)
                        .with_column(name)
                        .with_detail("current_type", "string")
                        .with_detail("suggested_type", "numeric"),
                );
            }
        }

        let total_nulls: usize = stats.iter().map(|c| c.nulls).sum();
        let total_cells = total_rows * data.columns().len();
        let mut summary = Map::new();
        summary.insert("total_rows".into(), Value::from(total_rows));
        summary.insert("total_columns".into(), Value::from(data.columns().len()));
        summary.insert("null_percentage".into(), Value::from(percentage(total_nulls, total_cells)));
        summary.insert("duplicate_rows".into(), Value::from(duplicates));
        summary.insert("memory_estimate".into(), Value::from(memory_estimate));

        let suggestions = issues.iter().filter_map(cleaner_suggestion).collect();
        log::debug!(
            "basic_profiler.profile: dataset profiled - rows={}, columns={}, issues={}",
            total_rows,
            data.columns().len(),
            issues.len()
        );

        Ok(SiftProfileResult {
            issues,
            summary,
            suggestions,
        })
    }
}
