//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Sift.
//! The Sift project belongs to the Dunimd Team.

//! Shared test plugins. Every call a plugin receives is recorded in a probe
//! as `"<op>:<name>"`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use sift::{
    Result, SiftAppliedFix, SiftDataset, SiftDiscoveredPlugin, SiftExtractor, SiftIssue, SiftLoadResult, SiftLoader,
    SiftParams, SiftPlugin, SiftPluginDiscovery, SiftPluginFactory, SiftPluginMetadata, SiftPluginSource,
    SiftProfileResult, SiftProfiler, SiftSeverity, SiftStaticDiscovery, SiftSuggestion, SiftTransformResult,
    SiftTransformer, SiftError,
};

pub type Probe = Arc<Mutex<Vec<String>>>;

pub fn probe() -> Probe {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(probe: &Probe) -> Vec<String> {
    probe.lock().unwrap().clone()
}

pub fn count(probe: &Probe, call: &str) -> usize {
    probe.lock().unwrap().iter().filter(|c| c.as_str() == call).count()
}

/// What a mock transformer does to its input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformMode {
    /// Returns the input unchanged.
    Identity,
    /// Appends one row whose cells all hold the plugin name.
    Tag,
    /// Removes the first row.
    DropFirst,
}

#[derive(Clone)]
pub struct Mock {
    pub name: String,
    pub probe: Probe,
    pub data: SiftDataset,
    pub issues: usize,
    pub mode: TransformMode,
    pub fail_setup: bool,
    pub fail_run: bool,
    pub fail_teardown: bool,
}

impl Mock {
    pub fn new(name: &str, probe: &Probe) -> Self {
        Mock {
            name: name.to_string(),
            probe: Arc::clone(probe),
            data: sample_data(),
            issues: 0,
            mode: TransformMode::Identity,
            fail_setup: false,
            fail_run: false,
            fail_teardown: false,
        }
    }

    pub fn with_data(mut self, data: SiftDataset) -> Self {
        self.data = data;
        self
    }

    pub fn with_issues(mut self, issues: usize) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_mode(mut self, mode: TransformMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    fn record(&self, op: &str) {
        self.probe.lock().unwrap().push(format!("{}:{}", op, self.name));
    }

    fn run(&self, op: &str) -> Result<()> {
        self.record(op);
        if self.fail_run {
            return Err(SiftError::plugin(&self.name, format!("{} exploded", op)));
        }
        Ok(())
    }
}

impl SiftPlugin for Mock {
    fn metadata() -> SiftPluginMetadata {
        SiftPluginMetadata::new("Mock", "0.1.0")
    }

    fn setup(&mut self, _params: &SiftParams) -> Result<()> {
        self.record("setup");
        if self.fail_setup {
            return Err(SiftError::validation("missing required parameter 'path'"));
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.record("teardown");
        if self.fail_teardown {
            return Err(SiftError::Io("handle already closed".into()));
        }
        Ok(())
    }
}

impl SiftExtractor for Mock {
    fn extract(&mut self) -> Result<SiftDataset> {
        self.run("extract")?;
        Ok(self.data.clone())
    }
}

impl SiftProfiler for Mock {
    fn profile(&mut self, _data: &SiftDataset) -> Result<SiftProfileResult> {
        self.run("profile")?;
        let issues = (0..self.issues)
            .map(|i| {
                SiftIssue::new("mock_issue", SiftSeverity::Low)
                    .with_column(format!("{}#{}", self.name, i))
                    .with_detail("index", i)
            })
            .collect();
        Ok(SiftProfileResult {
            issues,
            ..Default::default()
        })
    }
}

impl SiftTransformer for Mock {
    fn transform(&mut self, data: &SiftDataset) -> Result<SiftTransformResult> {
        self.run("transform")?;
        let mut out = data.clone();
        let mut fixes = Vec::new();
        match self.mode {
            TransformMode::Identity => {}
            TransformMode::Tag => {
                let row = vec![Value::from(self.name.as_str()); out.columns().len()];
                out.push_row(row)?;
                fixes.push(SiftAppliedFix::new("tag", 1, format!("tagged by {}", self.name)));
            }
            TransformMode::DropFirst => {
                let mut first = true;
                let removed = out.retain_rows(|_| !std::mem::take(&mut first));
                fixes.push(SiftAppliedFix::new("drop_first", removed, "dropped first row"));
            }
        }
        Ok(SiftTransformResult::new(out, fixes))
    }

    fn suggest_fixes(&self, _data: &SiftDataset, issues: &[SiftIssue]) -> Result<Vec<SiftSuggestion>> {
        self.record("suggest");
        Ok(issues
            .iter()
            .map(|i| {
                let mut suggestion = SiftSuggestion::new("mock_fix", format!("fix {}", i.issue_type));
                suggestion.column = i.column.clone();
                suggestion
            })
            .collect())
    }

    fn can_handle_issue(&self, issue_type: &str) -> bool {
        issue_type == "mock_issue"
    }
}

impl SiftLoader for Mock {
    fn load(&mut self, data: &SiftDataset) -> Result<SiftLoadResult> {
        self.run("load")?;
        Ok(SiftLoadResult::loaded(data.len()).with_metadata("destination", self.name.as_str()))
    }
}

pub fn metadata(api_version: &str) -> SiftPluginMetadata {
    SiftPluginMetadata::new("Mock", "0.1.0").with_api_version(api_version)
}

pub fn extractor(mock: Mock) -> SiftDiscoveredPlugin {
    let name = mock.name.clone();
    let factory = SiftPluginFactory::Extractor(Arc::new(move || -> Box<dyn SiftExtractor> { Box::new(mock.clone()) }));
    SiftDiscoveredPlugin::new(name, factory, metadata("1.0"), SiftPluginSource::Registered)
}

pub fn profiler(mock: Mock) -> SiftDiscoveredPlugin {
    let name = mock.name.clone();
    let factory = SiftPluginFactory::Profiler(Arc::new(move || -> Box<dyn SiftProfiler> { Box::new(mock.clone()) }));
    SiftDiscoveredPlugin::new(name, factory, metadata("1.0"), SiftPluginSource::Registered)
}

pub fn transformer(mock: Mock) -> SiftDiscoveredPlugin {
    let name = mock.name.clone();
    let factory =
        SiftPluginFactory::Transformer(Arc::new(move || -> Box<dyn SiftTransformer> { Box::new(mock.clone()) }));
    SiftDiscoveredPlugin::new(name, factory, metadata("1.0"), SiftPluginSource::Registered)
}

pub fn loader(mock: Mock) -> SiftDiscoveredPlugin {
    let name = mock.name.clone();
    let factory = SiftPluginFactory::Loader(Arc::new(move || -> Box<dyn SiftLoader> { Box::new(mock.clone()) }));
    SiftDiscoveredPlugin::new(name, factory, metadata("1.0"), SiftPluginSource::Registered)
}

pub fn discovery(plugins: Vec<SiftDiscoveredPlugin>) -> Arc<dyn SiftPluginDiscovery> {
    let table = plugins
        .into_iter()
        .fold(SiftStaticDiscovery::new(), |table, p| table.register(p));
    Arc::new(table)
}

/// Three rows of `{id, value}`.
pub fn sample_data() -> SiftDataset {
    SiftDataset::from_rows(
        vec!["id".into(), "value".into()],
        vec![
            vec![json!(1), json!("a")],
            vec![json!(2), json!("b")],
            vec![json!(3), json!("c")],
        ],
    )
    .unwrap()
}

/// Five rows of `{id, email}`, the last repeating the second.
pub fn data_with_duplicate() -> SiftDataset {
    SiftDataset::from_rows(
        vec!["id".into(), "email".into()],
        vec![
            vec![json!(1), json!("a@x.io")],
            vec![json!(2), json!("b@x.io")],
            vec![json!(3), json!("c@x.io")],
            vec![json!(4), json!("d@x.io")],
            vec![json!(2), json!("b@x.io")],
        ],
    )
    .unwrap()
}
