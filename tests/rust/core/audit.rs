//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Sift.
//! The Sift project belongs to the Dunimd Team.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use sift::{
    SiftAuditEvent, SiftAuditEventType, SiftAuditSink, SiftJsonlAuditSink, SiftMemoryAuditSink, SiftPluginRole,
};

fn event(kind: SiftAuditEventType, pipeline: &str, offset_secs: i64) -> SiftAuditEvent {
    let mut event = SiftAuditEvent::new(kind, pipeline);
    event.timestamp = Utc::now() + Duration::seconds(offset_secs);
    event
}

#[test]
fn test_jsonl_append_and_query_by_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let sink = SiftJsonlAuditSink::new(dir.path().join("logs").join("audit.jsonl")).unwrap();

    let late = sink.append(event(SiftAuditEventType::PipelineComplete, "p1", 10)).unwrap();
    let early = sink.append(event(SiftAuditEventType::PipelineStart, "p1", 0)).unwrap();
    sink.append(event(SiftAuditEventType::PipelineStart, "p2", 5)).unwrap();

    let events = sink.query_by_pipeline("p1").unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec![early, late]);
    assert!(sink.query_by_pipeline("nope").unwrap().is_empty());
}

#[test]
fn test_jsonl_query_recent_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let sink = SiftJsonlAuditSink::new(dir.path().join("audit.jsonl")).unwrap();
    for offset in [3, 1, 2, 0] {
        sink.append(event(SiftAuditEventType::PluginStart, "p", offset)).unwrap();
    }
    let recent = sink.query_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].timestamp > recent[1].timestamp);
    assert_eq!(sink.query_recent(10).unwrap().len(), 4);
}

#[test]
fn test_jsonl_round_trips_event_fields() {
    let dir = tempfile::tempdir().unwrap();
    let sink = SiftJsonlAuditSink::new(dir.path().join("audit.jsonl")).unwrap();
    let original = SiftAuditEvent::new(SiftAuditEventType::PluginError, "p")
        .with_stage("load")
        .with_plugin("json_writer", SiftPluginRole::Loader)
        .with_field("attempt", 1)
        .failed("disk full");
    sink.append(original.clone()).unwrap();

    let stored = sink.query_by_pipeline("p").unwrap();
    assert_eq!(stored, vec![original]);
    assert!(!stored[0].success);
    assert_eq!(stored[0].error_message.as_deref(), Some("disk full"));
}

#[test]
fn test_jsonl_skips_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = SiftJsonlAuditSink::new(&path).unwrap();
    sink.append(event(SiftAuditEventType::PipelineStart, "p", 0)).unwrap();

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"truncated\": \n\n").unwrap();
    drop(file);

    sink.append(event(SiftAuditEventType::PipelineComplete, "p", 1)).unwrap();
    assert_eq!(sink.query_by_pipeline("p").unwrap().len(), 2);
}

#[test]
fn test_jsonl_concurrent_appends_keep_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(SiftJsonlAuditSink::new(dir.path().join("audit.jsonl")).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for _ in 0..25 {
                    sink.append(SiftAuditEvent::new(SiftAuditEventType::PluginStart, format!("p{}", t)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.query_recent(usize::MAX).unwrap().len(), 100);
    assert_eq!(sink.query_by_pipeline("p2").unwrap().len(), 25);
}

#[test]
fn test_memory_sink_query_is_idempotent() {
    let sink = SiftMemoryAuditSink::new();
    for i in 0..5 {
        sink.append(event(SiftAuditEventType::PluginStart, "p", i)).unwrap();
    }
    sink.append(event(SiftAuditEventType::PluginStart, "other", 0)).unwrap();

    let first = sink.query_by_pipeline("p").unwrap();
    let second = sink.query_by_pipeline("p").unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert_eq!(sink.len(), 6);
}

#[test]
fn test_memory_sink_equal_timestamps_keep_append_order() {
    let sink = SiftMemoryAuditSink::new();
    let at = Utc::now();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut e = SiftAuditEvent::new(SiftAuditEventType::PluginStart, "p");
        e.timestamp = at;
        ids.push(sink.append(e).unwrap());
    }
    let asc: Vec<_> = sink.query_by_pipeline("p").unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(asc, ids);

    let desc: Vec<_> = sink.query_recent(3).unwrap().into_iter().map(|e| e.id).collect();
    let mut reversed = ids.clone();
    reversed.reverse();
    assert_eq!(desc, reversed);
}
