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

//! Discovery results: factories keyed by role and name.
//!
//! A factory is a closure producing a boxed role trait object. The factory
//! variant fixes the role, so registering an entry under a role it does not
//! implement is rejected by [`SiftPluginCatalog::insert`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SiftError};
use crate::plugin::{
    SiftExtractor, SiftLoader, SiftPluginInstance, SiftPluginMetadata, SiftPluginRole,
    SiftProfiler, SiftTransformer,
};

pub type SiftExtractorFactory = Arc<dyn Fn() -> Box<dyn SiftExtractor> + Send + Sync>;
pub type SiftProfilerFactory = Arc<dyn Fn() -> Box<dyn SiftProfiler> + Send + Sync>;
pub type SiftTransformerFactory = Arc<dyn Fn() -> Box<dyn SiftTransformer> + Send + Sync>;
pub type SiftLoaderFactory = Arc<dyn Fn() -> Box<dyn SiftLoader> + Send + Sync>;

/// Constructor for bare plugin instances of one role.
#[derive(Clone)]
pub enum SiftPluginFactory {
    Extractor(SiftExtractorFactory),
    Profiler(SiftProfilerFactory),
    Transformer(SiftTransformerFactory),
    Loader(SiftLoaderFactory),
}

impl SiftPluginFactory {
    pub fn extractor<T: SiftExtractor + Default + 'static>() -> Self {
        SiftPluginFactory::Extractor(Arc::new(|| -> Box<dyn SiftExtractor> { Box::new(T::default()) }))
    }

    pub fn profiler<T: SiftProfiler + Default + 'static>() -> Self {
        SiftPluginFactory::Profiler(Arc::new(|| -> Box<dyn SiftProfiler> { Box::new(T::default()) }))
    }

    pub fn transformer<T: SiftTransformer + Default + 'static>() -> Self {
        SiftPluginFactory::Transformer(Arc::new(|| -> Box<dyn SiftTransformer> { Box::new(T::default()) }))
    }

    pub fn loader<T: SiftLoader + Default + 'static>() -> Self {
        SiftPluginFactory::Loader(Arc::new(|| -> Box<dyn SiftLoader> { Box::new(T::default()) }))
    }

    pub fn role(&self) -> SiftPluginRole {
        match self {
            SiftPluginFactory::Extractor(_) => SiftPluginRole::Extractor,
            SiftPluginFactory::Profiler(_) => SiftPluginRole::Profiler,
            SiftPluginFactory::Transformer(_) => SiftPluginRole::Transformer,
            SiftPluginFactory::Loader(_) => SiftPluginRole::Loader,
        }
    }

    /// Constructs a bare, not yet set up, instance.
    pub fn create(&self) -> SiftPluginInstance {
        match self {
            SiftPluginFactory::Extractor(f) => SiftPluginInstance::Extractor(f()),
            SiftPluginFactory::Profiler(f) => SiftPluginInstance::Profiler(f()),
            SiftPluginFactory::Transformer(f) => SiftPluginInstance::Transformer(f()),
            SiftPluginFactory::Loader(f) => SiftPluginInstance::Loader(f()),
        }
    }
}

impl fmt::Debug for SiftPluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiftPluginFactory({})", self.role())
    }
}

/// Where a discovered plugin came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SiftPluginSource {
    /// Bundled with the crate.
    Builtin,
    /// Registered in-process by the embedding application.
    Registered,
    /// Bound from a `plugin.yml` manifest on disk.
    Local { path: PathBuf },
}

impl fmt::Display for SiftPluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiftPluginSource::Builtin => f.write_str("builtin"),
            SiftPluginSource::Registered => f.write_str("registered"),
            SiftPluginSource::Local { path } => write!(f, "local:{}", path.display()),
        }
    }
}

/// One lookup-table entry produced by discovery.
#[derive(Clone, Debug)]
pub struct SiftDiscoveredPlugin {
    pub name: String,
    pub factory: SiftPluginFactory,
    pub metadata: SiftPluginMetadata,
    pub source: SiftPluginSource,
}

impl SiftDiscoveredPlugin {
    pub fn new(
        name: impl Into<String>,
        factory: SiftPluginFactory,
        metadata: SiftPluginMetadata,
        source: SiftPluginSource,
    ) -> Self {
        SiftDiscoveredPlugin {
            name: name.into(),
            factory,
            metadata,
            source,
        }
    }

    pub fn extractor<T: SiftExtractor + Default + 'static>(name: impl Into<String>, source: SiftPluginSource) -> Self {
        Self::new(name, SiftPluginFactory::extractor::<T>(), T::metadata(), source)
    }

    pub fn profiler<T: SiftProfiler + Default + 'static>(name: impl Into<String>, source: SiftPluginSource) -> Self {
        Self::new(name, SiftPluginFactory::profiler::<T>(), T::metadata(), source)
    }

    pub fn transformer<T: SiftTransformer + Default + 'static>(
        name: impl Into<String>,
        source: SiftPluginSource,
    ) -> Self {
        Self::new(name, SiftPluginFactory::transformer::<T>(), T::metadata(), source)
    }

    pub fn loader<T: SiftLoader + Default + 'static>(name: impl Into<String>, source: SiftPluginSource) -> Self {
        Self::new(name, SiftPluginFactory::loader::<T>(), T::metadata(), source)
    }

    pub fn role(&self) -> SiftPluginRole {
        self.factory.role()
    }

    pub fn info(&self) -> SiftPluginInfo {
        SiftPluginInfo {
            name: self.name.clone(),
            role: self.role(),
            display_name: self.metadata.display_name.clone(),
            version: self.metadata.version.clone(),
            api_version: self.metadata.api_version.clone(),
            description: self.metadata.description.clone(),
            source: self.source.clone(),
        }
    }
}

/// Serializable listing entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiftPluginInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub role: SiftPluginRole,
    pub display_name: String,
    pub version: String,
    pub api_version: String,
    pub description: String,
    pub source: SiftPluginSource,
}

/// Per-role ordered lookup table.
#[derive(Clone, Debug, Default)]
pub struct SiftPluginCatalog {
    entries: BTreeMap<SiftPluginRole, Vec<SiftDiscoveredPlugin>>,
}

impl SiftPluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `plugin` under `role`, checking it actually implements that role.
    ///
    /// When the name is already taken for the role the first entry is kept.
    pub fn insert(&mut self, role: SiftPluginRole, plugin: SiftDiscoveredPlugin) -> Result<()> {
        if plugin.role() != role {
            return Err(SiftError::plugin_load(
                &plugin.name,
                format!("advertised as {} but implements {}", role, plugin.role()),
            ));
        }
        let list = self.entries.entry(role).or_default();
        if let Some(existing) = list.iter().find(|p| p.name == plugin.name) {
            log::warn!(
                "registry.catalog.duplicate: plugin name already registered; keeping first entry - plugin={}, type={}, kept={}, ignored={}",
                plugin.name,
                role,
                existing.source,
                plugin.source
            );
            return Ok(());
        }
        list.push(plugin);
        Ok(())
    }

    /// Adds `plugin` under the role its factory implements.
    pub fn add(&mut self, plugin: SiftDiscoveredPlugin) -> Result<()> {
        self.insert(plugin.role(), plugin)
    }

    pub fn extend(&mut self, other: SiftPluginCatalog) -> Result<()> {
        for (_, plugins) in other.entries {
            for plugin in plugins {
                self.add(plugin)?;
            }
        }
        Ok(())
    }

    pub fn find(&self, role: SiftPluginRole, name: &str) -> Option<&SiftDiscoveredPlugin> {
        self.entries.get(&role)?.iter().find(|p| p.name == name)
    }

    pub fn list(&self, role: SiftPluginRole) -> &[SiftDiscoveredPlugin] {
        self.entries.get(&role).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiftDiscoveredPlugin> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of plugin lookup tables, re-run whenever the registry refreshes.
pub trait SiftPluginDiscovery: Send + Sync {
    fn discover(&self) -> Result<SiftPluginCatalog>;
}

/// Fixed in-process registration table.
#[derive(Clone, Debug, Default)]
pub struct SiftStaticDiscovery {
    plugins: Vec<SiftDiscoveredPlugin>,
}

impl SiftStaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, plugin: SiftDiscoveredPlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn push(&mut self, plugin: SiftDiscoveredPlugin) {
        self.plugins.push(plugin);
    }

    /// First entry registered under `name`, in any role.
    pub fn get(&self, name: &str) -> Option<&SiftDiscoveredPlugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn plugins(&self) -> &[SiftDiscoveredPlugin] {
        &self.plugins
    }
}

impl SiftPluginDiscovery for SiftStaticDiscovery {
    fn discover(&self) -> Result<SiftPluginCatalog> {
        let mut catalog = SiftPluginCatalog::new();
        for plugin in &self.plugins {
            catalog.add(plugin.clone())?;
        }
        Ok(catalog)
    }
}

/// Concatenates several discovery sources; earlier sources win on name clashes.
#[derive(Default)]
pub struct SiftCompositeDiscovery {
    sources: Vec<Box<dyn SiftPluginDiscovery>>,
}

impl SiftCompositeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl SiftPluginDiscovery + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl SiftPluginDiscovery for SiftCompositeDiscovery {
    fn discover(&self) -> Result<SiftPluginCatalog> {
        let mut catalog = SiftPluginCatalog::new();
        for source in &self.sources {
            catalog.extend(source.discover()?)?;
        }
        Ok(catalog)
    }
}
