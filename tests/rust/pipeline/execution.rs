//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Sift.
//! The Sift project belongs to the Dunimd Team.

#[path = "../common/mod.rs"]
mod common;

use std::error::Error;
use std::fs;
use std::sync::Arc;

use common::{count, data_with_duplicate, extractor, loader, probe, profiler, transformer, Mock, Probe, TransformMode};
use serde_json::json;
use sift::{
    builtin_plugins, SiftAuditEventType, SiftAuditSink, SiftCompositeDiscovery, SiftDiscoveredPlugin, SiftEngine,
    SiftError, SiftErrorPolicy, SiftExecutionMode, SiftJsonlAuditSink, SiftMemoryAuditSink, SiftPipeline,
    SiftPipelineConfig, SiftPipelineState, SiftPluginRole, SiftPluginSpec, SiftStaticDiscovery,
};

fn pipeline(plugins: Vec<SiftDiscoveredPlugin>) -> (SiftPipeline, Arc<SiftMemoryAuditSink>) {
    let table = plugins.into_iter().fold(builtin_plugins(), |t, p| t.register(p));
    let audit = Arc::new(SiftMemoryAuditSink::new());
    (SiftPipeline::new(Arc::new(table), audit.clone()), audit)
}

fn kinds(audit: &SiftMemoryAuditSink) -> Vec<(SiftAuditEventType, Option<String>)> {
    audit
        .events()
        .into_iter()
        .map(|e| (e.event_type, e.plugin_name))
        .collect()
}

fn plugin_starts(audit: &SiftMemoryAuditSink) -> Vec<String> {
    audit
        .events()
        .into_iter()
        .filter(|e| e.event_type == SiftAuditEventType::PluginStart)
        .filter_map(|e| e.plugin_name)
        .collect()
}

fn two_loaders(p: &Probe, first_policy: SiftErrorPolicy) -> (SiftPipelineConfig, Vec<SiftDiscoveredPlugin>) {
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_loader(SiftPluginSpec::new("primary").with_policy(first_policy))
        .with_loader(SiftPluginSpec::new("backup"));
    let plugins = vec![
        extractor(Mock::new("src", p)),
        loader(Mock::new("primary", p).failing()),
        loader(Mock::new("backup", p)),
    ];
    (config, plugins)
}

#[test]
fn test_scenario_drop_duplicates() {
    let p = probe();
    let (mut pipeline, _audit) = pipeline(vec![
        extractor(Mock::new("src", &p).with_data(data_with_duplicate())),
        loader(Mock::new("out", &p)),
    ]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_transformer(SiftPluginSpec::new("basic_cleaner").with_param("drop_duplicates", true))
        .with_loader(SiftPluginSpec::new("out"));

    let result = pipeline.execute(&config, SiftExecutionMode::ControlledAuto, None).unwrap();
    assert!(result.success);
    assert_eq!(result.rows_processed, 4);
    assert_eq!(result.data.len(), 4);
    assert_eq!(result.applied_fixes.len(), 1);
    assert_eq!(result.applied_fixes[0].fix_type, "drop_duplicates");
    assert_eq!(result.applied_fixes[0].rows_affected, 1);
    assert!(result.load_results[0].success);
    assert_eq!(result.load_results[0].rows_loaded, Some(4));
    assert_eq!(pipeline.state(), SiftPipelineState::Complete);
}

#[test]
fn test_scenario_missing_loaders_emits_nothing() {
    let p = probe();
    let (mut pipeline, audit) = pipeline(vec![extractor(Mock::new("src", &p))]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src"));

    let err = pipeline.execute(&config, SiftExecutionMode::Manual, Some("p-b")).unwrap_err();
    assert!(matches!(err, SiftError::Config { .. }));
    assert!(audit.is_empty());
    assert_eq!(count(&p, "setup:src"), 0);
}

#[test]
fn test_scenario_stop_loader_aborts() {
    let p = probe();
    let (config, plugins) = two_loaders(&p, SiftErrorPolicy::Stop);
    let (mut pipeline, audit) = pipeline(plugins);

    let err = pipeline.execute(&config, SiftExecutionMode::Manual, Some("p-c")).unwrap_err();
    assert_eq!(err.stage(), Some("load"));
    assert_eq!(err.to_string(), "error occurred in stage 'load': plugin 'primary' failed: load exploded");
    let cause = err.source().unwrap().to_string();
    assert!(cause.contains("load exploded"));

    assert_eq!(count(&p, "load:backup"), 0);
    assert!(!plugin_starts(&audit).contains(&"backup".to_string()));
    assert_eq!(pipeline.state(), SiftPipelineState::Error);

    let last = audit.events().pop().unwrap();
    assert_eq!(last.event_type, SiftAuditEventType::PipelineError);
    assert!(!last.success);
    assert_eq!(last.data["stage"], json!("load"));
}

#[test]
fn test_scenario_continue_loader_records_failure() {
    let p = probe();
    let (config, plugins) = two_loaders(&p, SiftErrorPolicy::Continue);
    let (mut pipeline, audit) = pipeline(plugins);

    let result = pipeline.execute(&config, SiftExecutionMode::Manual, Some("p-d")).unwrap();
    assert!(result.success);
    assert_eq!(result.load_results.len(), 2);
    assert!(!result.load_results[0].success);
    assert!(result.load_results[0].error.is_some());
    assert!(result.load_results[1].success);

    let complete = audit.events().pop().unwrap();
    assert_eq!(complete.event_type, SiftAuditEventType::PipelineComplete);
    assert_eq!(complete.data["rows_processed"], json!(3));
    assert_eq!(complete.data["load_results"][0]["success"], json!(false));
}

#[test]
fn test_event_sequence_for_successful_run() {
    let p = probe();
    let (mut pipeline, audit) = pipeline(vec![
        extractor(Mock::new("src", &p)),
        profiler(Mock::new("prof", &p)),
        transformer(Mock::new("fix", &p)),
        loader(Mock::new("out", &p)),
    ]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_profiler(SiftPluginSpec::new("prof"))
        .with_transformer(SiftPluginSpec::new("fix"))
        .with_loader(SiftPluginSpec::new("out"));

    pipeline.execute(&config, SiftExecutionMode::HalfAuto, Some("p-seq")).unwrap();

    use SiftAuditEventType::*;
    let some = |s: &str| Some(s.to_string());
    assert_eq!(
        kinds(&audit),
        vec![
            (PipelineStart, None),
            (PluginStart, some("src")),
            (PluginComplete, some("src")),
            (PluginStart, some("prof")),
            (PluginComplete, some("prof")),
            (PluginStart, some("fix")),
            (PluginComplete, some("fix")),
            (PluginStart, some("out")),
            (PluginComplete, some("out")),
            (PipelineComplete, None),
        ]
    );
    let start = &audit.events()[0];
    assert_eq!(start.data["mode"], json!("half-auto"));
    assert_eq!(start.data["config"]["extractor"]["plugin"], json!("src"));
    assert!(audit.events().iter().all(|e| e.pipeline_id == "p-seq"));
}

#[test]
fn test_extraction_failure_wraps_stage() {
    let p = probe();
    let (mut pipeline, audit) = pipeline(vec![extractor(Mock::new("src", &p).failing()), loader(Mock::new("out", &p))]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src").with_policy(SiftErrorPolicy::Continue))
        .with_loader(SiftPluginSpec::new("out"));

    let err = pipeline.execute(&config, SiftExecutionMode::Manual, None).unwrap_err();
    assert_eq!(err.stage(), Some("extract"));
    assert_eq!(count(&p, "setup:out"), 0);
    assert_eq!(audit.events().pop().unwrap().event_type, SiftAuditEventType::PipelineError);
}

#[test]
fn test_unknown_plugin_fails_in_its_stage() {
    let p = probe();
    let (mut pipeline, _audit) = pipeline(vec![extractor(Mock::new("src", &p)), loader(Mock::new("out", &p))]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_profiler(SiftPluginSpec::new("ghost"))
        .with_loader(SiftPluginSpec::new("out"));

    let err = pipeline.execute(&config, SiftExecutionMode::Manual, None).unwrap_err();
    assert_eq!(err.stage(), Some("profile"));
    match err {
        SiftError::PipelineExecution { source, .. } => {
            assert!(matches!(*source, SiftError::PluginNotFound { .. }))
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn test_generated_pipeline_ids_are_unique() {
    let p = probe();
    let (mut pipeline, _audit) = pipeline(vec![extractor(Mock::new("src", &p)), loader(Mock::new("out", &p))]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src")).with_loader(SiftPluginSpec::new("out"));

    let a = pipeline.execute(&config, SiftExecutionMode::Manual, None).unwrap();
    let b = pipeline.execute(&config, SiftExecutionMode::Manual, None).unwrap();
    assert_ne!(a.pipeline_id, b.pipeline_id);
    assert_eq!(count(&p, "setup:src"), 2);
    assert_eq!(pipeline.registry().active_count(), 0);
}

#[test]
fn test_scratch_directory_removed_on_every_path() {
    let p = probe();
    let temp = tempfile::tempdir().unwrap();
    let (mut pipeline, _audit) = pipeline(vec![
        extractor(Mock::new("src", &p)),
        transformer(Mock::new("fix", &p).with_mode(TransformMode::DropFirst)),
        loader(Mock::new("out", &p)),
        loader(Mock::new("broken", &p).failing()),
    ]);

    let ok = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_transformer(SiftPluginSpec::new("fix"))
        .with_loader(SiftPluginSpec::new("out"))
        .with_temp_dir(temp.path());
    pipeline.execute(&ok, SiftExecutionMode::Manual, None).unwrap();
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);

    let failing = SiftPipelineConfig::new(SiftPluginSpec::new("src"))
        .with_loader(SiftPluginSpec::new("broken"))
        .with_temp_dir(temp.path());
    assert!(pipeline.execute(&failing, SiftExecutionMode::Manual, None).is_err());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    assert!(temp.path().is_dir());
}

#[test]
fn test_audit_history_is_idempotent() {
    let p = probe();
    let (mut pipeline, audit) = pipeline(vec![extractor(Mock::new("src", &p)), loader(Mock::new("out", &p))]);
    let config = SiftPipelineConfig::new(SiftPluginSpec::new("src")).with_loader(SiftPluginSpec::new("out"));
    pipeline.execute(&config, SiftExecutionMode::Manual, Some("p-idem")).unwrap();

    let first = audit.query_by_pipeline("p-idem").unwrap();
    let second = audit.query_by_pipeline("p-idem").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), audit.len());
}

#[test]
fn test_engine_runs_from_file_with_jsonl_audit() {
    let p = probe();
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit").join("audit.jsonl");
    let entry_points = SiftStaticDiscovery::new()
        .register(extractor(Mock::new("src", &p).with_data(data_with_duplicate())))
        .register(loader(Mock::new("out", &p)));
    let mut engine = SiftEngine::with_defaults(Some(audit_path.clone()), vec![dir.path().join("plugins")], entry_points)
        .unwrap();

    let config_path = dir.path().join("pipeline.yml");
    fs::write(
        &config_path,
        r#"
name: dedupe
extractor: {plugin: src}
profilers: [{plugin: basic_profiler}]
transformers:
  - plugin: basic_cleaner
    params: {drop_duplicates: true}
loaders: [{plugin: out}]
"#,
    )
    .unwrap();

    let result = engine
        .run_pipeline_from_file(&config_path, SiftExecutionMode::Manual, Some("run-1"))
        .unwrap();
    assert_eq!(result.rows_processed, 4);
    engine
        .run_pipeline_from_file(&config_path, SiftExecutionMode::Manual, Some("run-2"))
        .unwrap();

    let recent = engine.recent_executions(10).unwrap();
    let ids: Vec<_> = recent.iter().map(|e| e.pipeline_id.as_str()).collect();
    assert_eq!(ids, vec!["run-2", "run-1"]);
    assert_eq!(engine.recent_executions(1).unwrap().len(), 1);

    let history = engine.pipeline_history("run-1").unwrap();
    assert_eq!(history.first().unwrap().event_type, SiftAuditEventType::PipelineStart);
    assert_eq!(history.last().unwrap().event_type, SiftAuditEventType::PipelineComplete);
    let run_1 = engine.audit_log(Some("run-1"), 3).unwrap();
    assert_eq!(run_1, engine.pipeline_history("run-1").unwrap());
    assert!(run_1.len() > 3);
    assert_eq!(engine.audit_log(None, 5).unwrap().len(), 5);

    let on_disk = SiftJsonlAuditSink::new(&audit_path).unwrap();
    assert_eq!(on_disk.query_by_pipeline("run-1").unwrap().len(), history.len());

    let transformers = engine.list_plugins(Some(SiftPluginRole::Transformer)).unwrap();
    assert_eq!(transformers[0].name, "basic_cleaner");
}

#[test]
fn test_engine_refresh_picks_up_new_manifests() {
    let p = probe();
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    let discovery = SiftCompositeDiscovery::new().with(builtin_plugins()).with(sift::SiftManifestDiscovery::new(
        vec![plugins.clone()],
        SiftStaticDiscovery::new().register(loader(Mock::new("acme.sink", &p))),
    ));
    let mut engine = SiftEngine::new(Arc::new(discovery), Arc::new(SiftMemoryAuditSink::new()));
    assert!(engine.list_plugins(Some(SiftPluginRole::Loader)).unwrap().is_empty());

    fs::write(plugins.join("plugin.yml"), "name: sink\ntype: loader\nentry_point: acme.sink\n").unwrap();
    assert!(engine.list_plugins(Some(SiftPluginRole::Loader)).unwrap().is_empty());
    engine.refresh_plugins().unwrap();
    let loaders = engine.list_plugins(Some(SiftPluginRole::Loader)).unwrap();
    assert_eq!(loaders.len(), 1);
    assert_eq!(loaders[0].version, "unknown");
}

#[test]
fn test_padded_plugin_names_resolve() {
    let p = probe();
    let (mut pipeline, _audit) = pipeline(vec![extractor(Mock::new("src", &p)), loader(Mock::new("out", &p))]);

    assert_eq!(SiftPluginSpec::new(" out ").plugin, "out");
    let mut padded = SiftPluginSpec::new("out");
    padded.plugin = "  out\t".to_string();
    let config = SiftPipelineConfig::new(SiftPluginSpec::new(" src")).with_loader(padded);

    let result = pipeline.execute(&config, SiftExecutionMode::ControlledAuto, None).unwrap();
    assert_eq!(result.load_results[0].plugin, "out");
    assert_eq!(count(&p, "load:out"), 1);
}
