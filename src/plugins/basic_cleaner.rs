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

//! # Basic Cleaner
//!
//! Parameters (all optional):
//!
//! ```yaml
//! drop_nulls: true            # or a list of columns
//! drop_duplicates: true
//! duplicate_subset: [email]
//! convert_types:
//!   age: numeric              # numeric | datetime | string | category
//! ```
//!
//! Fixes run in the order above. A fix is only reported when it changed at
//! least one row. `convert_types` entries naming a column the dataset does
//! not have are skipped, and unknown parameters are ignored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

use crate::dataset::SiftDataset;
use crate::errors::{Result, SiftError};
use crate::plugin::{
    SiftAppliedFix, SiftIssue, SiftParams, SiftPlugin, SiftPluginMetadata, SiftSuggestion, SiftTransformResult,
    SiftTransformer,
};
use crate::plugins::{cleaner_suggestion, BASIC_CLEANER, ISSUE_DUPLICATE_ROWS, ISSUE_NULL_VALUES, ISSUE_TYPE_MISMATCH};

/// Target of a `convert_types` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiftTargetType {
    Numeric,
    Datetime,
    String,
    /// Marks a column as categorical; cells are kept as they are.
    Category,
}

impl SiftTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiftTargetType::Numeric => "numeric",
            SiftTargetType::Datetime => "datetime",
            SiftTargetType::String => "string",
            SiftTargetType::Category => "category",
        }
    }

    /// Converts one cell; nulls stay null.
    pub fn convert(&self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (SiftTargetType::Numeric, Value::Number(_)) => value.clone(),
            (SiftTargetType::Numeric, Value::String(s)) => parse_number(s).unwrap_or(Value::Null),
            (SiftTargetType::Numeric, _) => Value::Null,
            (SiftTargetType::Datetime, Value::String(s)) => parse_datetime(s).map(Value::String).unwrap_or(Value::Null),
            (SiftTargetType::Datetime, _) => Value::Null,
            (SiftTargetType::String, Value::String(_)) => value.clone(),
            (SiftTargetType::String, Value::Number(n)) => Value::String(n.to_string()),
            (SiftTargetType::String, Value::Bool(b)) => Value::String(b.to_string()),
            (SiftTargetType::String, _) => value.clone(),
            (SiftTargetType::Category, _) => value.clone(),
        }
    }
}

impl fmt::Display for SiftTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiftTargetType {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(SiftTargetType::Numeric),
            "datetime" => Ok(SiftTargetType::Datetime),
            "string" => Ok(SiftTargetType::String),
            "category" => Ok(SiftTargetType::Category),
            other => Err(SiftError::validation(format!(
                "basic_cleaner: unknown target type '{}', expected numeric, datetime, string or category",
                other
            ))),
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn parse_datetime(s: &str) -> Option<String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[derive(Clone, Debug, Default, PartialEq)]
enum NullPolicy {
    #[default]
    Keep,
    AnyColumn,
    Columns(Vec<String>),
}

/// Drops nulls and duplicates and converts column types.
#[derive(Clone, Debug, Default)]
pub struct SiftBasicCleaner {
    drop_nulls: NullPolicy,
    drop_duplicates: bool,
    duplicate_subset: Option<Vec<String>>,
    convert_types: Vec<(String, SiftTargetType)>,
}

fn column_list(key: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| SiftError::validation(format!("basic_cleaner: '{}' must be a list of column names", key)))?;
    items
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                SiftError::validation(format!("basic_cleaner: '{}' must contain only column names", key))
            })
        })
        .collect()
}

fn column_positions(data: &SiftDataset, columns: &[String]) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|c| {
            data.column_index(c)
                .ok_or_else(|| SiftError::plugin(BASIC_CLEANER, format!("unknown column '{}'", c)))
        })
        .collect()
}

impl SiftBasicCleaner {
    fn drop_nulls(&self, data: &mut SiftDataset) -> Result<Option<SiftAppliedFix>> {
        let positions = match &self.drop_nulls {
            NullPolicy::Keep => return Ok(None),
            NullPolicy::AnyColumn => None,
            NullPolicy::Columns(cols) => Some(column_positions(data, cols)?),
        };
        let removed = data.retain_rows(|row| match &positions {
            Some(idx) => idx.iter().all(|i| row.get(*i).is_some_and(|c| !c.is_null())),
            None => row.iter().all(|c| !c.is_null()),
        });
        if removed == 0 {
            return Ok(None);
        }
        let mut fix = SiftAppliedFix::new("drop_nulls", removed, format!("dropped {} rows containing null values", removed));
        if let NullPolicy::Columns(cols) = &self.drop_nulls {
            fix = fix.with_detail("columns", cols.clone());
        }
        Ok(Some(fix))
    }

    fn drop_duplicates(&self, data: &mut SiftDataset) -> Result<Option<SiftAppliedFix>> {
        if !self.drop_duplicates {
            return Ok(None);
        }
        let subset = match &self.duplicate_subset {
            Some(cols) => Some(column_positions(data, cols)?),
            None => None,
        };
        let mut mask = data.duplicate_mask(subset.as_deref()).into_iter();
        let removed = data.retain_rows(|_| !mask.next().unwrap_or(false));
        if removed == 0 {
            return Ok(None);
        }
        let mut fix = SiftAppliedFix::new("drop_duplicates", removed, format!("dropped {} duplicate rows", removed));
        if let Some(cols) = &self.duplicate_subset {
            fix = fix.with_detail("subset", cols.clone());
        }
        Ok(Some(fix))
    }

    fn convert_types(&self, data: &mut SiftDataset) -> Result<Vec<SiftAppliedFix>> {
        let mut fixes = Vec::new();
        for (column, target) in &self.convert_types {
            if data.column_index(column).is_none() {
                log::debug!(
                    "basic_cleaner.convert.skip: column not in dataset - column={}, target_type={}",
                    column,
                    target
                );
                continue;
            }
            let changed = data.map_column(column, |v| target.convert(v))?;
            if changed > 0 {
                fixes.push(
                    SiftAppliedFix::new("convert_type", changed, format!("converted '{}' to {}", column, target))
                        .with_column(column)
                        .with_detail("target_type", target.as_str()),
                );
            }
        }
        Ok(fixes)
    }
}

impl SiftPlugin for SiftBasicCleaner {
    fn metadata() -> SiftPluginMetadata {
        SiftPluginMetadata::new("Basic Cleaner", "1.0.0")
            .with_description("Drops nulls and duplicates and converts column types")
    }

    fn setup(&mut self, params: &SiftParams) -> Result<()> {
        let mut next = SiftBasicCleaner::default();
        for (key, value) in params {
            match key.as_str() {
                "drop_nulls" => {
                    next.drop_nulls = match value {
                        Value::Bool(true) => NullPolicy::AnyColumn,
                        Value::Bool(false) | Value::Null => NullPolicy::Keep,
                        Value::Array(_) => NullPolicy::Columns(column_list(key, value)?),
                        _ => {
                            return Err(SiftError::validation(
                                "basic_cleaner: 'drop_nulls' must be a bool or a list of column names",
                            ))
                        }
                    }
                }
                "drop_duplicates" => {
                    next.drop_duplicates = value
                        .as_bool()
                        .ok_or_else(|| SiftError::validation("basic_cleaner: 'drop_duplicates' must be a bool"))?;
                }
                "duplicate_subset" => next.duplicate_subset = Some(column_list(key, value)?),
                "convert_types" => {
                    let map = value.as_object().ok_or_else(|| {
                        SiftError::validation("basic_cleaner: 'convert_types' must map column names to types")
                    })?;
                    for (column, target) in map {
                        let target = target.as_str().ok_or_else(|| {
                            SiftError::validation(format!(
                                "basic_cleaner: target type for '{}' must be a string",
                                column
                            ))
                        })?;
                        next.convert_types.push((column.clone(), target.parse()?));
                    }
                }
                other => log::warn!("basic_cleaner.setup: ignoring unknown parameter - key={}", other),
            }
        }
        *self = next;
        Ok(())
    }
}

impl SiftTransformer for SiftBasicCleaner {
    fn transform(&mut self, data: &SiftDataset) -> Result<SiftTransformResult> {
        let mut out = data.clone();
        let mut fixes = Vec::new();
        fixes.extend(self.drop_nulls(&mut out)?);
        fixes.extend(self.drop_duplicates(&mut out)?);
        fixes.extend(self.convert_types(&mut out)?);
        log::debug!(
            "basic_cleaner.transform: dataset cleaned - rows_before={}, rows_after={}, fixes={}",
            data.len(),
            out.len(),
            fixes.len()
        );
        Ok(SiftTransformResult::new(out, fixes))
    }

    fn suggest_fixes(&self, _data: &SiftDataset, issues: &[SiftIssue]) -> Result<Vec<SiftSuggestion>> {
        Ok(issues
            .iter()
            .filter(|i| self.can_handle_issue(&i.issue_type))
            .filter_map(cleaner_suggestion)
            .collect())
    }

    fn can_handle_issue(&self, issue_type: &str) -> bool {
        matches!(issue_type, ISSUE_NULL_VALUES | ISSUE_DUPLICATE_ROWS | ISSUE_TYPE_MISMATCH)
    }
}
