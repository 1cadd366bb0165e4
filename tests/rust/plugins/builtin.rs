//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Sift.
//! The Sift project belongs to the Dunimd Team.

use serde_json::{json, Value};
use sift::{
    SiftBasicCleaner, SiftBasicProfiler, SiftDataset, SiftIssue, SiftParams, SiftPlugin, SiftProfiler, SiftSeverity,
    SiftTransformer,
};

fn params(value: Value) -> SiftParams {
    value.as_object().cloned().unwrap()
}

fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> SiftDataset {
    SiftDataset::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

fn dirty() -> SiftDataset {
    dataset(
        &["id", "age", "joined"],
        vec![
            vec![json!(1), json!("34"), json!("2024-01-05")],
            vec![json!(2), Value::Null, json!("2024-02-11")],
            vec![json!(3), json!("29"), Value::Null],
            vec![json!(1), json!("34"), json!("2024-01-05")],
            vec![json!(5), json!("41.5"), json!("not a date")],
        ],
    )
}

fn issue<'a>(issues: &'a [SiftIssue], kind: &str, column: Option<&str>) -> Option<&'a SiftIssue> {
    issues
        .iter()
        .find(|i| i.issue_type == kind && i.column.as_deref() == column)
}

#[test]
fn test_profiler_reports_nulls_duplicates_and_types() {
    let result = SiftBasicProfiler.profile(&dirty()).unwrap();

    let age_nulls = issue(&result.issues, "null_values", Some("age")).unwrap();
    assert_eq!(age_nulls.details["count"], json!(1));
    assert_eq!(age_nulls.details["percentage"], json!(20.0));
    assert_eq!(age_nulls.severity, SiftSeverity::Medium);
    assert!(issue(&result.issues, "null_values", Some("id")).is_none());

    let dups = issue(&result.issues, "duplicate_rows", None).unwrap();
    assert_eq!(dups.details["count"], json!(1));

    let mismatch = issue(&result.issues, "type_mismatch", Some("age")).unwrap();
    assert_eq!(mismatch.details["suggested_type"], json!("numeric"));
    assert!(issue(&result.issues, "type_mismatch", Some("joined")).is_none());

    assert_eq!(result.summary["total_rows"], json!(5));
    assert_eq!(result.summary["total_columns"], json!(3));
    assert_eq!(result.summary["duplicate_rows"], json!(1));
    assert!(result.summary["memory_estimate"].as_u64().unwrap() > 5 * 64);

    let fix_types: Vec<_> = result.suggestions.iter().map(|s| s.fix_type.as_str()).collect();
    assert!(fix_types.contains(&"drop_duplicates"));
    assert!(fix_types.contains(&"convert_type"));
}

#[test]
fn test_profiler_high_null_severity() {
    let data = dataset(
        &["a"],
        vec![vec![Value::Null], vec![Value::Null], vec![json!(1)]],
    );
    let result = SiftBasicProfiler.profile(&data).unwrap();
    assert_eq!(result.issues[0].severity, SiftSeverity::High);
}

#[test]
fn test_cleaner_applies_fixes_in_order() {
    let mut cleaner = SiftBasicCleaner::default();
    cleaner
        .setup(&params(json!({
            "drop_nulls": ["age"],
            "drop_duplicates": true,
            "convert_types": {"age": "numeric", "joined": "datetime"}
        })))
        .unwrap();

    let result = cleaner.transform(&dirty()).unwrap();
    let fixes: Vec<_> = result
        .applied_fixes
        .iter()
        .map(|f| (f.fix_type.as_str(), f.column.as_deref(), f.rows_affected))
        .collect();
    assert_eq!(
        fixes,
        vec![
            ("drop_nulls", None, 1),
            ("drop_duplicates", None, 1),
            ("convert_type", Some("age"), 3),
            ("convert_type", Some("joined"), 2),
        ]
    );

    let data = result.data;
    assert_eq!(data.len(), 3);
    let ages: Vec<_> = data.column_values("age").unwrap().cloned().collect();
    assert_eq!(ages, vec![json!(34), json!(29), json!(41.5)]);
    let joined: Vec<_> = data.column_values("joined").unwrap().cloned().collect();
    assert_eq!(joined, vec![json!("2024-01-05T00:00:00Z"), Value::Null, Value::Null]);
}

#[test]
fn test_cleaner_without_params_changes_nothing() {
    let mut cleaner = SiftBasicCleaner::default();
    cleaner.setup(&SiftParams::new()).unwrap();
    let input = dirty();
    let result = cleaner.transform(&input).unwrap();
    assert_eq!(result.data, input);
    assert!(result.applied_fixes.is_empty());
}

#[test]
fn test_cleaner_duplicate_subset() {
    let data = dataset(
        &["id", "email"],
        vec![
            vec![json!(1), json!("a@x.io")],
            vec![json!(2), json!("a@x.io")],
            vec![json!(3), json!("b@x.io")],
        ],
    );
    let mut cleaner = SiftBasicCleaner::default();
    cleaner
        .setup(&params(json!({"drop_duplicates": true, "duplicate_subset": ["email"]})))
        .unwrap();
    let result = cleaner.transform(&data).unwrap();
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.data.rows()[1][0], json!(3));
    assert_eq!(result.applied_fixes[0].details["subset"], json!(["email"]));
}

#[test]
fn test_cleaner_unknown_column_fails_transform() {
    let mut cleaner = SiftBasicCleaner::default();
    cleaner.setup(&params(json!({"drop_nulls": ["missing"]}))).unwrap();
    assert!(cleaner.transform(&dirty()).is_err());
}

#[test]
fn test_cleaner_skips_conversions_for_absent_columns() {
    let mut cleaner = SiftBasicCleaner::default();
    cleaner
        .setup(&params(json!({
            "convert_types": {"not_there": "numeric", "age": "numeric", "id": "category"}
        })))
        .unwrap();

    let result = cleaner.transform(&dirty()).unwrap();
    let fixes: Vec<_> = result
        .applied_fixes
        .iter()
        .map(|f| (f.fix_type.as_str(), f.column.as_deref()))
        .collect();
    assert_eq!(fixes, vec![("convert_type", Some("age"))]);
    assert_eq!(result.data.columns(), dirty().columns());
}

#[test]
fn test_cleaner_suggestions_follow_profiler_issues() {
    let data = dirty();
    let profile = SiftBasicProfiler.profile(&data).unwrap();
    let cleaner = SiftBasicCleaner::default();

    assert!(cleaner.can_handle_issue("null_values"));
    assert!(cleaner.can_handle_issue("type_mismatch"));
    assert!(!cleaner.can_handle_issue("outliers"));

    let suggestions = cleaner.suggest_fixes(&data, &profile.issues).unwrap();
    assert_eq!(suggestions.len(), profile.issues.len());
    let convert = suggestions.iter().find(|s| s.fix_type == "convert_type").unwrap();
    assert_eq!(convert.config["convert_types"], json!({"age": "numeric"}));

    // the suggested params are accepted verbatim
    let mut applied = SiftBasicCleaner::default();
    applied.setup(&convert.config).unwrap();
    assert_eq!(applied.transform(&data).unwrap().applied_fixes.len(), 1);
}
