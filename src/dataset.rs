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

//! # Sift Dataset Module
//!
//! This module provides the tabular data structure that flows through every
//! Sift pipeline stage. A dataset is produced once by an extractor, read by
//! profilers, replaced wholesale by each transformer and handed unchanged to
//! every loader.
//!
//! ## Design Principles
//!
//! - **Column-ordered**: Column names keep the order in which the extractor
//!   produced them, so loaders can write stable headers
//! - **Flexible cells**: Cells are JSON values, which lets plugins carry
//!   numbers, strings, booleans and nulls without a fixed schema
//! - **Rectangular**: Every row has exactly one cell per column
//!
//! ## Usage Example
//!
//! ```rust
//! use serde_json::json;
//! use sift::dataset::SiftDataset;
//!
//! let dataset = SiftDataset::from_rows(
//!     vec!["id".into(), "name".into()],
//!     vec![vec![json!(1), json!("a")], vec![json!(2), json!(null)]],
//! )?;
//! assert_eq!(dataset.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{Result, SiftError};

/// A single row of cells, positionally aligned with the dataset columns.
pub type SiftRow = Vec<Value>;

/// A row expressed as a column-name keyed object.
pub type SiftRecord = Map<String, Value>;

/// In-memory table passed between pipeline stages.
///
/// # Serde Support
///
/// The struct serializes as `{"columns": [...], "rows": [[...], ...]}`, which
/// is the form written to intermediate snapshots and returned to callers.
/// Deserialization goes through [`SiftDataset::from_rows`], so a document
/// with ragged rows is rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct SiftDataset {
    columns: Vec<String>,
    rows: Vec<SiftRow>,
}

#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<SiftRow>,
}

impl TryFrom<RawDataset> for SiftDataset {
    type Error = SiftError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        SiftDataset::from_rows(raw.columns, raw.rows)
    }
}

impl SiftDataset {
    /// Creates an empty dataset with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        SiftDataset {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset from positional rows, rejecting rows of the wrong width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<SiftRow>) -> Result<Self> {
        let mut dataset = SiftDataset::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Builds a dataset from keyed records.
    ///
    /// Columns are ordered by first appearance across the records; a record
    /// missing a column contributes a null cell.
    pub fn from_records(records: &[SiftRecord]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        SiftDataset { columns, rows }
    }

    /// Converts rows into keyed records.
    pub fn to_records(&self) -> Vec<SiftRecord> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<SiftRecord>()
            })
            .collect()
    }

    /// Appends a row, enforcing the column count.
    pub fn push_row(&mut self, row: SiftRow) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SiftError::validation(format!(
                "row has {} cells but dataset has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SiftRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterates the cells of one column, or `None` if the column is unknown.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(idx)))
    }

    /// Keeps only the rows for which `keep` returns `true`, returning how many were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&SiftRow) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Applies `f` to every cell of one column, returning how many cells changed.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<usize>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self
            .column_index(name)
            .ok_or_else(|| SiftError::validation(format!("unknown column '{}'", name)))?;
        let mut changed = 0;
        for cell in self.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
            let next = f(cell);
            if next != *cell {
                *cell = next;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Stable 64-bit fingerprint of a row, optionally restricted to column positions.
    pub fn row_fingerprint(row: &SiftRow, subset: Option<&[usize]>) -> u64 {
        let mut buf = Vec::new();
        let mut push = |cell: &Value| {
            // unit separator keeps ["a","b"] distinct from ["ab"]
            buf.extend_from_slice(cell.to_string().as_bytes());
            buf.push(0x1f);
        };
        match subset {
            Some(idx) => idx.iter().filter_map(|i| row.get(*i)).for_each(&mut push),
            None => row.iter().for_each(&mut push),
        }
        xxh3_64(&buf)
    }

    /// Per-row flag telling whether the row repeats an earlier one.
    pub fn duplicate_mask(&self, subset: Option<&[usize]>) -> Vec<bool> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .map(|row| !seen.insert(Self::row_fingerprint(row, subset)))
            .collect()
    }
}
