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

//! Local `plugin.yml` manifests bound to in-process entry points.
//!
//! ```yaml
//! name: warehouse_loader
//! type: loader
//! entry_point: acme.warehouse
//! version: 2.1.0
//! api_version: "1.0"
//! description: Loads into the ACME warehouse
//! ```
//!
//! `entry_point` is looked up in the entry-point table given to
//! [`SiftManifestDiscovery::new`]; no code is loaded from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::errors::{Result, SiftError};
use crate::plugin::{SiftPluginMetadata, SiftPluginRole};
use crate::registry::discovery::{
    SiftDiscoveredPlugin, SiftPluginCatalog, SiftPluginDiscovery, SiftPluginSource, SiftStaticDiscovery,
};

const MANIFEST_NAMES: [&str; 2] = ["plugin.yml", "plugin.yaml"];

#[derive(Debug, Deserialize)]
struct SiftPluginManifestFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    plugin_type: Option<String>,
    #[serde(default)]
    entry_point: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default)]
    description: String,
}

fn default_version() -> String {
    "unknown".to_string()
}

fn default_api_version() -> String {
    "1.0".to_string()
}

impl SiftPluginManifestFile {
    fn into_runtime(self, path: &Path, entry_points: &SiftStaticDiscovery) -> Result<SiftDiscoveredPlugin> {
        let label = path.display().to_string();
        let name = required(self.name, "name", &label)?;
        let plugin_type = required(self.plugin_type, "type", &name)?;
        let entry_point = required(self.entry_point, "entry_point", &name)?;

        let role: SiftPluginRole = plugin_type
            .parse()
            .map_err(|_| SiftError::plugin_load(&name, format!("invalid plugin type '{}'", plugin_type)))?;
        let target = entry_points
            .get(&entry_point)
            .ok_or_else(|| SiftError::plugin_load(&name, format!("unknown entry point '{}'", entry_point)))?;
        if target.role() != role {
            return Err(SiftError::plugin_load(
                &name,
                format!(
                    "entry point '{}' implements {} but the manifest declares {}",
                    entry_point,
                    target.role(),
                    role
                ),
            ));
        }

        let description = if self.description.is_empty() {
            target.metadata.description.clone()
        } else {
            self.description
        };
        let metadata = SiftPluginMetadata {
            display_name: target.metadata.display_name.clone(),
            version: self.version,
            api_version: self.api_version,
            description,
        };
        Ok(SiftDiscoveredPlugin::new(
            name,
            target.factory.clone(),
            metadata,
            SiftPluginSource::Local {
                path: path.to_path_buf(),
            },
        ))
    }
}

fn required(value: Option<String>, field: &str, owner: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SiftError::plugin_load(owner, format!("manifest missing required field '{}'", field))),
    }
}

/// Scans directories for plugin manifests.
#[derive(Clone, Debug)]
pub struct SiftManifestDiscovery {
    roots: Vec<PathBuf>,
    entry_points: SiftStaticDiscovery,
}

impl SiftManifestDiscovery {
    pub fn new(roots: Vec<PathBuf>, entry_points: SiftStaticDiscovery) -> Self {
        SiftManifestDiscovery { roots, entry_points }
    }

    /// `~/.sift/plugins` and `./plugins`.
    pub fn default_roots() -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(base) = directories::BaseDirs::new() {
            roots.push(base.home_dir().join(".sift").join("plugins"));
        }
        roots.push(PathBuf::from("plugins"));
        roots
    }

    fn manifest_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                log::debug!("registry.manifest.skip_root: not a directory - root={}", root.display());
                continue;
            }
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("registry.manifest.walk_error: {} - root={}", e, root.display());
                        continue;
                    }
                };
                let is_manifest = entry
                    .file_name()
                    .to_str()
                    .map(|n| MANIFEST_NAMES.contains(&n))
                    .unwrap_or(false);
                if entry.file_type().is_file() && is_manifest {
                    paths.push(entry.into_path());
                }
            }
        }
        paths
    }
}

impl SiftPluginDiscovery for SiftManifestDiscovery {
    fn discover(&self) -> Result<SiftPluginCatalog> {
        let mut catalog = SiftPluginCatalog::new();
        for path in self.manifest_paths() {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("registry.manifest.unreadable: {} - path={}", e, path.display());
                    continue;
                }
            };
            let file: SiftPluginManifestFile = match serde_yaml::from_str(&text) {
                Ok(file) => file,
                Err(e) => {
                    log::warn!("registry.manifest.invalid: {} - path={}", e, path.display());
                    continue;
                }
            };
            let plugin = file.into_runtime(&path, &self.entry_points)?;
            log::info!(
                "registry.manifest.found: local plugin discovered - plugin={}, type={}, version={}, path={}",
                plugin.name,
                plugin.role(),
                plugin.metadata.version,
                path.display()
            );
            catalog.add(plugin)?;
        }
        Ok(catalog)
    }
}
