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

//! Plugins bundled with the crate.

pub mod basic_cleaner;
pub mod basic_profiler;

pub use basic_cleaner::{SiftBasicCleaner, SiftTargetType};
pub use basic_profiler::SiftBasicProfiler;

use serde_json::{json, Value};

use crate::plugin::{SiftIssue, SiftSuggestion};
use crate::registry::{SiftDiscoveredPlugin, SiftPluginSource, SiftStaticDiscovery};

pub const BASIC_PROFILER: &str = "basic_profiler";
pub const BASIC_CLEANER: &str = "basic_cleaner";

pub const ISSUE_NULL_VALUES: &str = "null_values";
pub const ISSUE_DUPLICATE_ROWS: &str = "duplicate_rows";
pub const ISSUE_TYPE_MISMATCH: &str = "type_mismatch";

/// Discovery table of the bundled plugins.
pub fn builtin_plugins() -> SiftStaticDiscovery {
    SiftStaticDiscovery::new()
        .register(SiftDiscoveredPlugin::profiler::<SiftBasicProfiler>(
            BASIC_PROFILER,
            SiftPluginSource::Builtin,
        ))
        .register(SiftDiscoveredPlugin::transformer::<SiftBasicCleaner>(
            BASIC_CLEANER,
            SiftPluginSource::Builtin,
        ))
}

/// The `basic_cleaner` fix that addresses `issue`, with the params enabling it.
pub(crate) fn cleaner_suggestion(issue: &SiftIssue) -> Option<SiftSuggestion> {
    let count = issue.details.get("count").and_then(Value::as_u64).unwrap_or(0);
    match (issue.issue_type.as_str(), issue.column.as_deref()) {
        (ISSUE_NULL_VALUES, Some(column)) => Some(
            SiftSuggestion::new("drop_nulls", format!("drop rows with null values in '{}'", column))
                .with_column(column)
                .with_impact(format!("removes up to {} rows", count))
                .with_config("drop_nulls", json!([column])),
        ),
        (ISSUE_DUPLICATE_ROWS, _) => Some(
            SiftSuggestion::new("drop_duplicates", "drop repeated rows, keeping the first occurrence")
                .with_impact(format!("removes {} rows", count))
                .with_config("drop_duplicates", true),
        ),
        (ISSUE_TYPE_MISMATCH, Some(column)) => {
            let target = issue
                .details
                .get("suggested_type")
                .and_then(Value::as_str)
                .unwrap_or("numeric");
            Some(
                SiftSuggestion::new("convert_type", format!("convert '{}' to {}", column, target))
                    .with_column(column)
                    .with_config("convert_types", json!({ column: target })),
            )
        }
        _ => None,
    }
}
