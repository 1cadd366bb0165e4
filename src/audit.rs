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

//! # Sift Audit Module
//!
//! Append-only structured record of every pipeline and plugin lifecycle
//! step. Events are never mutated or deleted once appended.
//!
//! Two sinks are provided:
//!
//! - [`SiftJsonlAuditSink`]: one JSON object per line in a durable file;
//!   each append is flushed and synced before it returns
//! - [`SiftMemoryAuditSink`]: process-local storage for embedding and tests

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{Result, SiftError};
use crate::plugin::SiftPluginRole;

/// Lifecycle occurrence captured by an audit event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiftAuditEventType {
    PipelineStart,
    PipelineComplete,
    PipelineError,
    PluginStart,
    PluginComplete,
    PluginError,
}

impl SiftAuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiftAuditEventType::PipelineStart => "pipeline_start",
            SiftAuditEventType::PipelineComplete => "pipeline_complete",
            SiftAuditEventType::PipelineError => "pipeline_error",
            SiftAuditEventType::PluginStart => "plugin_start",
            SiftAuditEventType::PluginComplete => "plugin_complete",
            SiftAuditEventType::PluginError => "plugin_error",
        }
    }
}

/// Immutable audit log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiftAuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: SiftAuditEventType,
    pub pipeline_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_type: Option<SiftPluginRole>,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SiftAuditEvent {
    /// A successful event stamped with a fresh id and the current time.
    pub fn new(event_type: SiftAuditEventType, pipeline_id: impl Into<String>) -> Self {
        SiftAuditEvent {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            pipeline_id: pipeline_id.into(),
            stage: None,
            plugin_name: None,
            plugin_type: None,
            data: Map::new(),
            success: true,
            error_message: None,
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_plugin(mut self, name: impl Into<String>, role: SiftPluginRole) -> Self {
        self.plugin_name = Some(name.into());
        self.plugin_type = Some(role);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Marks the event as a failure carrying `message`.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }
}

/// Durable, append-only destination for audit events.
pub trait SiftAuditSink: Send + Sync {
    /// Appends one event and returns its id.
    fn append(&self, event: SiftAuditEvent) -> Result<String>;

    /// All events of one pipeline, oldest first.
    fn query_by_pipeline(&self, pipeline_id: &str) -> Result<Vec<SiftAuditEvent>>;

    /// At most `limit` events across pipelines, newest first.
    fn query_recent(&self, limit: usize) -> Result<Vec<SiftAuditEvent>>;
}

fn sort_ascending(events: &mut [SiftAuditEvent]) {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}

/// Newest first; events sharing a timestamp come out in reverse append order.
fn newest_first(mut events: Vec<SiftAuditEvent>, limit: usize) -> Vec<SiftAuditEvent> {
    events.reverse();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(limit);
    events
}

/// JSON-lines audit log stored on disk.
#[derive(Debug)]
pub struct SiftJsonlAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SiftJsonlAuditSink {
    /// Opens (creating if needed) the log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        log::debug!("audit.sink.open: audit log ready - path={}", path.display());
        Ok(SiftJsonlAuditSink {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Opens the log at [`default_audit_path`].
    pub fn open_default() -> Result<Self> {
        Self::new(default_audit_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<SiftAuditEvent>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut events = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SiftAuditEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => log::warn!(
                    "audit.sink.skip: malformed audit line ignored - path={}, line={}, error={}",
                    self.path.display(),
                    idx + 1,
                    e
                ),
            }
        }
        Ok(events)
    }
}

impl SiftAuditSink for SiftJsonlAuditSink {
    fn append(&self, event: SiftAuditEvent) -> Result<String> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SiftError::internal("audit write lock poisoned"))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        // one write per event so a crash cannot interleave partial lines
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        Ok(event.id)
    }

    fn query_by_pipeline(&self, pipeline_id: &str) -> Result<Vec<SiftAuditEvent>> {
        let mut events: Vec<SiftAuditEvent> = self
            .read_all()?
            .into_iter()
            .filter(|e| e.pipeline_id == pipeline_id)
            .collect();
        sort_ascending(&mut events);
        Ok(events)
    }

    fn query_recent(&self, limit: usize) -> Result<Vec<SiftAuditEvent>> {
        Ok(newest_first(self.read_all()?, limit))
    }
}

/// Default audit log location: `<data dir>/sift/audit.jsonl`.
///
/// Honors `XDG_DATA_HOME`, then the platform data directory, then
/// `~/.local/share`.
pub fn default_audit_path() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join("sift").join("audit.jsonl"));
    }
    if let Some(dirs) = directories::ProjectDirs::from("", "", "sift") {
        return Ok(dirs.data_dir().join("audit.jsonl"));
    }
    directories::BaseDirs::new()
        .map(|base| {
            base.home_dir()
                .join(".local")
                .join("share")
                .join("sift")
                .join("audit.jsonl")
        })
        .ok_or_else(|| SiftError::internal("cannot determine a data directory for the audit log"))
}

/// In-process audit sink.
#[derive(Debug, Default)]
pub struct SiftMemoryAuditSink {
    events: Mutex<Vec<SiftAuditEvent>>,
}

impl SiftMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in append order.
    pub fn events(&self) -> Vec<SiftAuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SiftAuditSink for SiftMemoryAuditSink {
    fn append(&self, event: SiftAuditEvent) -> Result<String> {
        let id = event.id.clone();
        self.events
            .lock()
            .map_err(|_| SiftError::internal("audit memory lock poisoned"))?
            .push(event);
        Ok(id)
    }

    fn query_by_pipeline(&self, pipeline_id: &str) -> Result<Vec<SiftAuditEvent>> {
        let mut events: Vec<SiftAuditEvent> = self
            .events
            .lock()
            .map_err(|_| SiftError::internal("audit memory lock poisoned"))?
            .iter()
            .filter(|e| e.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        sort_ascending(&mut events);
        Ok(events)
    }

    fn query_recent(&self, limit: usize) -> Result<Vec<SiftAuditEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| SiftError::internal("audit memory lock poisoned"))?
            .clone();
        Ok(newest_first(events, limit))
    }
}
