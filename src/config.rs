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

//! # Sift Configuration Module
//!
//! Pipeline configuration documents are YAML (JSON is accepted as well).
//! Loading happens in three steps:
//!
//! 1. Parse the document into a generic YAML tree.
//! 2. Replace `${NAME}` and `${NAME:default}` references in every string
//!    scalar with values from the environment.
//! 3. Deserialize into [`SiftPipelineConfig`], normalize plugin names and
//!    validate.
//!
//! ```yaml
//! name: nightly-customers
//! extractor:
//!   plugin: csv_extractor
//!   params:
//!     path: ${DATA_DIR:/srv/data}/customers.csv
//! transformers:
//!   - plugin: basic_cleaner
//!     params: { drop_duplicates: true }
//! loaders:
//!   - plugin: csv_loader
//!     on_error: continue
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SiftError};
use crate::plugin::SiftParams;

/// What a stage does when one of its plugins fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiftErrorPolicy {
    /// Abort the pipeline.
    #[default]
    Stop,
    /// Record the failure and move on to the next plugin.
    Continue,
    /// Accepted by the schema; stages reject it when a failure actually happens.
    Retry,
}

impl SiftErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiftErrorPolicy::Stop => "stop",
            SiftErrorPolicy::Continue => "continue",
            SiftErrorPolicy::Retry => "retry",
        }
    }
}

impl fmt::Display for SiftErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level hint for embedding applications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SiftLogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl SiftLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiftLogLevel::Debug => "DEBUG",
            SiftLogLevel::Info => "INFO",
            SiftLogLevel::Warning => "WARNING",
            SiftLogLevel::Error => "ERROR",
            SiftLogLevel::Critical => "CRITICAL",
        }
    }

    /// The matching `log` filter; CRITICAL maps to ERROR.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            SiftLogLevel::Debug => log::LevelFilter::Debug,
            SiftLogLevel::Info => log::LevelFilter::Info,
            SiftLogLevel::Warning => log::LevelFilter::Warn,
            SiftLogLevel::Error | SiftLogLevel::Critical => log::LevelFilter::Error,
        }
    }
}

impl FromStr for SiftLogLevel {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(SiftLogLevel::Debug),
            "INFO" => Ok(SiftLogLevel::Info),
            "WARNING" | "WARN" => Ok(SiftLogLevel::Warning),
            "ERROR" => Ok(SiftLogLevel::Error),
            "CRITICAL" => Ok(SiftLogLevel::Critical),
            other => Err(SiftError::config(format!(
                "log_level must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL (got '{}')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SiftLogLevel {
    type Error = SiftError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SiftLogLevel> for String {
    fn from(level: SiftLogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// One configured plugin invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiftPluginSpec {
    pub plugin: String,
    #[serde(default)]
    pub params: SiftParams,
    #[serde(default)]
    pub on_error: SiftErrorPolicy,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds; validated and stored, not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl SiftPluginSpec {
    /// Descriptor for `plugin`; the name is stored trimmed.
    pub fn new(plugin: impl Into<String>) -> Self {
        SiftPluginSpec {
            plugin: plugin.into().trim().to_string(),
            params: SiftParams::new(),
            on_error: SiftErrorPolicy::Stop,
            enabled: true,
            timeout: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_policy(mut self, policy: SiftErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn validate(&self, slot: &str) -> Result<()> {
        if self.plugin.trim().is_empty() {
            return Err(SiftError::config(format!("{}: plugin name cannot be empty", slot)));
        }
        if self.timeout == Some(0) {
            return Err(SiftError::config(format!(
                "{}: timeout for plugin '{}' must be positive",
                slot, self.plugin
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_version() -> Option<String> {
    Some("1.0.0".to_string())
}

/// Immutable description of one pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiftPipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: Option<String>,

    pub extractor: SiftPluginSpec,
    #[serde(default)]
    pub profilers: Vec<SiftPluginSpec>,
    #[serde(default)]
    pub transformers: Vec<SiftPluginSpec>,
    #[serde(default)]
    pub loaders: Vec<SiftPluginSpec>,

    #[serde(default = "default_true")]
    pub cache_intermediate_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub parallel_execution: bool,
    #[serde(default)]
    pub log_level: SiftLogLevel,
}

impl SiftPipelineConfig {
    /// Starts a configuration with the given extractor and no other plugins.
    pub fn new(extractor: SiftPluginSpec) -> Self {
        SiftPipelineConfig {
            name: None,
            description: None,
            version: default_version(),
            extractor,
            profilers: Vec::new(),
            transformers: Vec::new(),
            loaders: Vec::new(),
            cache_intermediate_results: true,
            max_memory_mb: None,
            temp_dir: None,
            parallel_execution: false,
            log_level: SiftLogLevel::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_profiler(mut self, spec: SiftPluginSpec) -> Self {
        self.profilers.push(spec);
        self
    }

    pub fn with_transformer(mut self, spec: SiftPluginSpec) -> Self {
        self.transformers.push(spec);
        self
    }

    pub fn with_loader(mut self, spec: SiftPluginSpec) -> Self {
        self.loaders.push(spec);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_cache_intermediate_results(mut self, enabled: bool) -> Self {
        self.cache_intermediate_results = enabled;
        self
    }

    /// Loads, substitutes and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SiftError::config(format!("cannot read configuration '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parses a document using the process environment for substitution.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::from_yaml_str_with(text, |name| std::env::var(name).ok())
    }

    /// Parses a document with a custom variable lookup.
    pub fn from_yaml_str_with<F>(text: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut document: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| SiftError::config(format!("malformed configuration document: {}", e)))?;
        if document.is_null() {
            return Err(SiftError::config("configuration document is empty"));
        }
        substitute_env(&mut document, &lookup)?;

        let mut config: SiftPipelineConfig = serde_yaml::from_value(document)
            .map_err(|e| SiftError::config(format!("invalid configuration: {}", e)))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Trims every plugin name in place.
    pub(crate) fn normalize(&mut self) {
        self.extractor.plugin = self.extractor.plugin.trim().to_string();
        for spec in self
            .profilers
            .iter_mut()
            .chain(self.transformers.iter_mut())
            .chain(self.loaders.iter_mut())
        {
            spec.plugin = spec.plugin.trim().to_string();
        }
    }

    /// Checks every invariant the executors rely on.
    ///
    /// A missing `temp_dir` is created here, so validation may touch the filesystem.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(SiftError::config("pipeline name cannot be blank"));
            }
        }
        if let Some(version) = &self.version {
            if version.trim().is_empty() {
                return Err(SiftError::config("pipeline version cannot be blank"));
            }
        }

        self.extractor.validate("extractor")?;
        if !self.extractor.enabled {
            return Err(SiftError::config("the extractor cannot be disabled"));
        }
        for (idx, spec) in self.profilers.iter().enumerate() {
            spec.validate(&format!("profilers[{}]", idx))?;
        }
        for (idx, spec) in self.transformers.iter().enumerate() {
            spec.validate(&format!("transformers[{}]", idx))?;
        }
        if self.loaders.is_empty() {
            return Err(SiftError::config("at least one loader must be configured"));
        }
        for (idx, spec) in self.loaders.iter().enumerate() {
            spec.validate(&format!("loaders[{}]", idx))?;
        }

        if self.max_memory_mb == Some(0) {
            return Err(SiftError::config("max_memory_mb must be positive"));
        }
        if let Some(dir) = &self.temp_dir {
            if dir.exists() {
                if !dir.is_dir() {
                    return Err(SiftError::config(format!(
                        "temp_dir '{}' exists but is not a directory",
                        dir.display()
                    )));
                }
            } else {
                fs::create_dir_all(dir).map_err(|e| {
                    SiftError::config(format!("cannot create temp_dir '{}': {}", dir.display(), e))
                })?;
            }
        }
        Ok(())
    }

    /// Enabled profiler descriptors in configuration order.
    pub fn enabled_profilers(&self) -> impl Iterator<Item = &SiftPluginSpec> {
        self.profilers.iter().filter(|s| s.enabled)
    }

    pub fn enabled_transformers(&self) -> impl Iterator<Item = &SiftPluginSpec> {
        self.transformers.iter().filter(|s| s.enabled)
    }

    pub fn enabled_loaders(&self) -> impl Iterator<Item = &SiftPluginSpec> {
        self.loaders.iter().filter(|s| s.enabled)
    }
}

fn env_reference() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}"))
        .as_ref()
        .map_err(|e| SiftError::internal(format!("invalid substitution pattern: {}", e)))
}

/// Replaces `${NAME}` and `${NAME:default}` in one string.
pub fn substitute_str<F>(input: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = env_reference()?;
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in pattern.captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&input[last..whole.start()]);
        let value = match (lookup(name.as_str()), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                return Err(SiftError::config(format!(
                    "environment variable '{}' is not set and has no default",
                    name.as_str()
                )));
            }
        };
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Applies [`substitute_str`] to every string scalar of a YAML tree.
pub fn substitute_env<F>(value: &mut serde_yaml::Value, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        serde_yaml::Value::String(s) => {
            if s.contains("${") {
                *s = substitute_str(s, lookup)?;
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                substitute_env(item, lookup)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                substitute_env(item, lookup)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => substitute_env(&mut tagged.value, lookup)?,
        _ => {}
    }
    Ok(())
}
