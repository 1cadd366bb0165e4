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

//! # Sift Error Module
//!
//! This module defines the error types shared by every layer of the Sift
//! pipeline engine, from configuration loading to plugin execution.
//!
//! ## Error Categories
//!
//! - **Config**: Malformed documents, missing loaders, invalid field values
//! - **PluginNotFound / PluginVersionIncompatible / PluginLoad**: Resolution
//!   and discovery failures
//! - **PluginSetup**: A plugin rejected its own parameter mapping
//! - **Plugin**: Failures raised by extract, profile, transform or load
//! - **UnsupportedPolicy**: An error policy that is accepted but not implemented
//! - **PipelineExecution**: The orchestrator's wrapper around any unrecovered
//!   stage failure; the original cause is kept as the error source
//! - **Io / Serde / Yaml**: Conversions from std and serde errors
//! - **Validation / Internal**: Invalid values and unexpected situations
//!
//! ## Usage
//!
//! ```rust
//! use sift::errors::{Result, SiftError};
//!
//! fn check(rows: usize) -> Result<()> {
//!     if rows == 0 {
//!         return Err(SiftError::plugin("csv_extractor", "source file is empty"));
//!     }
//!     Ok(())
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Sift.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Canonical error enumeration for Sift.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum SiftError {
    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Invalid or incomplete pipeline configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Validation errors triggered by invalid parameters or inputs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// No plugin with the given name is advertised for the role.
    #[error("plugin '{name}' of type '{role}' not found")]
    PluginNotFound { name: String, role: String },

    /// The plugin declares an API version the platform does not support.
    #[error("plugin '{name}' requires API version {required}, but found {found}")]
    PluginVersionIncompatible {
        name: String,
        required: String,
        found: String,
    },

    /// Discovery or registration produced an unusable plugin entry.
    #[error("failed to load plugin '{name}': {message}")]
    PluginLoad { name: String, message: String },

    /// The plugin's setup hook rejected its parameters.
    #[error("failed to set up plugin '{name}': {message}")]
    PluginSetup { name: String, message: String },

    /// Any failure raised by a plugin role operation.
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// The configured error policy is not implemented by the stage executors.
    #[error("error policy '{policy}' for plugin '{plugin}' is not yet supported (plugin failed with: {message})")]
    UnsupportedPolicy {
        plugin: String,
        policy: String,
        message: String,
    },

    /// Unrecovered failure while the orchestrator was running a stage.
    #[error("error occurred in stage '{stage}': {source}")]
    PipelineExecution {
        stage: String,
        #[source]
        source: Box<SiftError>,
    },

    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapper for YAML parsing issues.
    #[error("yaml error: {0}")]
    Yaml(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for SiftError {
    fn from(err: io::Error) -> Self {
        SiftError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for SiftError {
    fn from(err: serde_yaml::Error) -> Self {
        SiftError::Yaml(err.to_string())
    }
}

impl SiftError {
    /// Helper to construct configuration errors.
    pub fn config<T: Into<String>>(message: T) -> Self {
        SiftError::Config {
            message: message.into(),
        }
    }

    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        SiftError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct plugin execution errors.
    pub fn plugin(name: impl Into<String>, message: impl Into<String>) -> Self {
        SiftError::Plugin {
            plugin: name.into(),
            message: message.into(),
        }
    }

    /// Helper to construct plugin setup errors.
    pub fn plugin_setup(name: impl Into<String>, message: impl Into<String>) -> Self {
        SiftError::PluginSetup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Helper to construct plugin load errors.
    pub fn plugin_load(name: impl Into<String>, message: impl Into<String>) -> Self {
        SiftError::PluginLoad {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wraps a stage failure, keeping the cause as the error source.
    pub fn pipeline_execution(stage: impl Into<String>, source: SiftError) -> Self {
        SiftError::PipelineExecution {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        SiftError::Internal(message.into())
    }

    /// Returns the stage name when this is a pipeline execution error.
    pub fn stage(&self) -> Option<&str> {
        match self {
            SiftError::PipelineExecution { stage, .. } => Some(stage.as_str()),
            _ => None,
        }
    }

    /// Returns `true` for errors raised before any stage executes.
    pub fn is_config(&self) -> bool {
        matches!(self, SiftError::Config { .. })
    }
}
