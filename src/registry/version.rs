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

use std::fmt;

use crate::errors::{Result, SiftError};
use crate::plugin::SIFT_PLUGIN_API_MAJOR;

/// Plugin API version in `major.minor` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SiftApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl SiftApiVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        SiftApiVersion { major, minor }
    }

    /// Parses exactly two dot-separated non-negative integers.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.trim().split('.').collect();
        if parts.len() != 2 {
            return Err(SiftError::validation(format!(
                "invalid API version '{}', expected major.minor",
                version_str
            )));
        }
        let major = parts[0]
            .parse::<u32>()
            .map_err(|_| SiftError::validation(format!("invalid major API version in '{}'", version_str)))?;
        let minor = parts[1]
            .parse::<u32>()
            .map_err(|_| SiftError::validation(format!("invalid minor API version in '{}'", version_str)))?;
        Ok(SiftApiVersion { major, minor })
    }

    /// Compatible iff the major component matches the platform's.
    pub fn is_compatible(&self) -> bool {
        self.major == SIFT_PLUGIN_API_MAJOR
    }
}

impl fmt::Display for SiftApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Gate applied by the registry before a plugin is handed out.
pub fn check_api_version(name: &str, api_version: &str) -> Result<SiftApiVersion> {
    let parsed = SiftApiVersion::parse(api_version).map_err(|_| SiftError::PluginVersionIncompatible {
        name: name.to_string(),
        required: "a valid major.minor version".to_string(),
        found: api_version.to_string(),
    })?;
    if !parsed.is_compatible() {
        return Err(SiftError::PluginVersionIncompatible {
            name: name.to_string(),
            required: format!("{}.x", SIFT_PLUGIN_API_MAJOR),
            found: api_version.to_string(),
        });
    }
    Ok(parsed)
}
