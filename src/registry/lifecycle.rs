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

//! # Sift Plugin Registry
//!
//! The registry turns a `(name, role)` pair into a live, set-up plugin
//! instance and guarantees the instance is torn down again.
//!
//! - [`SiftPluginRegistry::resolve`] looks the name up in the discovered
//!   catalog, applies the API version gate and caches the factory.
//! - [`SiftPluginRegistry::instantiate`] constructs an instance, runs its
//!   `setup` hook, registers it under `(role, name)` and returns a
//!   [`SiftPluginLease`].
//! - [`SiftPluginRegistry::release`] runs `teardown` and discards the
//!   instance. Teardown failures are logged and returned to the caller for
//!   auditing; the instance is discarded either way.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{Result, SiftError};
use crate::plugin::{
    SiftExtractor, SiftLoader, SiftParams, SiftPluginInstance, SiftPluginRole, SiftProfiler,
    SiftTransformer,
};
use crate::registry::discovery::{SiftPluginCatalog, SiftPluginDiscovery, SiftPluginFactory, SiftPluginInfo};
use crate::registry::version::check_api_version;

type SiftPluginKey = (SiftPluginRole, String);

/// Resolves plugins and owns the instances of the running stage.
pub struct SiftPluginRegistry {
    discovery: Arc<dyn SiftPluginDiscovery>,
    catalog: Option<SiftPluginCatalog>,
    resolved: HashMap<SiftPluginKey, SiftPluginFactory>,
    instances: HashMap<SiftPluginKey, SiftPluginInstance>,
}

impl SiftPluginRegistry {
    /// Creates a registry; discovery runs lazily on first resolution.
    pub fn new(discovery: Arc<dyn SiftPluginDiscovery>) -> Self {
        SiftPluginRegistry {
            discovery,
            catalog: None,
            resolved: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Re-runs discovery and forgets cached resolutions.
    pub fn refresh(&mut self) -> Result<()> {
        let catalog = self.discovery.discover()?;
        log::info!(
            "registry.refresh: plugin catalog refreshed - plugins={}",
            catalog.len()
        );
        self.catalog = Some(catalog);
        self.resolved.clear();
        Ok(())
    }

    fn catalog(&mut self) -> Result<&SiftPluginCatalog> {
        if self.catalog.is_none() {
            self.refresh()?;
        }
        self.catalog
            .as_ref()
            .ok_or_else(|| SiftError::internal("plugin catalog unavailable after discovery"))
    }

    /// Looks up a version-compatible factory for `(name, role)`.
    pub fn resolve(&mut self, name: &str, role: SiftPluginRole) -> Result<SiftPluginFactory> {
        let key = (role, name.to_string());
        if let Some(factory) = self.resolved.get(&key) {
            return Ok(factory.clone());
        }

        let plugin = self
            .catalog()?
            .find(role, name)
            .ok_or_else(|| SiftError::PluginNotFound {
                name: name.to_string(),
                role: role.to_string(),
            })?;
        check_api_version(name, &plugin.metadata.api_version)?;
        let factory = plugin.factory.clone();
        log::debug!(
            "registry.resolve: plugin resolved - plugin={}, type={}, version={}, api_version={}",
            name,
            role,
            plugin.metadata.version,
            plugin.metadata.api_version
        );

        self.resolved.insert(key, factory.clone());
        Ok(factory)
    }

    /// Creates and sets up an instance, registering it until the lease is released.
    pub fn instantiate(
        &mut self,
        name: &str,
        role: SiftPluginRole,
        params: &SiftParams,
    ) -> Result<SiftPluginLease<'_>> {
        let factory = self.resolve(name, role)?;
        if self.is_active(name, role) {
            log::warn!(
                "registry.instantiate.stale: releasing instance left registered - plugin={}, type={}",
                name,
                role
            );
            let _ = self.release(name, role);
        }

        let mut instance = factory.create();
        instance
            .setup(params)
            .map_err(|e| SiftError::plugin_setup(name, e.to_string()))?;
        self.instances.insert((role, name.to_string()), instance);
        log::debug!("registry.instantiate: plugin ready - plugin={}, type={}", name, role);

        Ok(SiftPluginLease {
            registry: self,
            role,
            name: name.to_string(),
            released: false,
        })
    }

    /// Tears down and discards the registered instance, if any.
    ///
    /// Returns the teardown failure so callers can audit it; it is never
    /// raised past the stage.
    pub fn release(&mut self, name: &str, role: SiftPluginRole) -> Result<()> {
        let Some(mut instance) = self.instances.remove(&(role, name.to_string())) else {
            return Ok(());
        };
        match instance.teardown() {
            Ok(()) => {
                log::debug!("registry.release: plugin released - plugin={}, type={}", name, role);
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "registry.release.teardown_failed: {} - plugin={}, type={}",
                    e,
                    name,
                    role
                );
                Err(e)
            }
        }
    }

    /// Releases every registered instance, collecting teardown failures.
    pub fn release_all(&mut self) -> Vec<SiftError> {
        let keys: Vec<SiftPluginKey> = self.instances.keys().cloned().collect();
        keys.into_iter()
            .filter_map(|(role, name)| self.release(&name, role).err())
            .collect()
    }

    pub fn instance_mut(&mut self, name: &str, role: SiftPluginRole) -> Option<&mut SiftPluginInstance> {
        self.instances.get_mut(&(role, name.to_string()))
    }

    pub fn is_active(&self, name: &str, role: SiftPluginRole) -> bool {
        self.instances.contains_key(&(role, name.to_string()))
    }

    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    /// Discovered plugins, optionally restricted to one role, sorted by role then name.
    pub fn list_plugins(&mut self, role: Option<SiftPluginRole>) -> Result<Vec<SiftPluginInfo>> {
        let catalog = self.catalog()?;
        let mut infos: Vec<SiftPluginInfo> = catalog
            .iter()
            .filter(|p| role.map_or(true, |r| p.role() == r))
            .map(|p| p.info())
            .collect();
        infos.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.name.cmp(&b.name)));
        Ok(infos)
    }
}

/// Scoped handle to a registered plugin instance.
///
/// Call [`SiftPluginLease::release`] to tear down explicitly and observe
/// teardown failures; a lease dropped without it is released on drop.
pub struct SiftPluginLease<'r> {
    registry: &'r mut SiftPluginRegistry,
    role: SiftPluginRole,
    name: String,
    released: bool,
}

impl<'r> SiftPluginLease<'r> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> SiftPluginRole {
        self.role
    }

    pub fn instance(&mut self) -> Result<&mut SiftPluginInstance> {
        self.registry
            .instance_mut(&self.name, self.role)
            .ok_or_else(|| SiftError::internal("leased plugin instance is no longer registered"))
    }

    pub fn extractor(&mut self) -> Result<&mut dyn SiftExtractor> {
        let name = self.name.clone();
        self.instance()?
            .as_extractor()
            .ok_or_else(|| SiftError::internal(format!("plugin '{}' is not an extractor", name)))
    }

    pub fn profiler(&mut self) -> Result<&mut dyn SiftProfiler> {
        let name = self.name.clone();
        self.instance()?
            .as_profiler()
            .ok_or_else(|| SiftError::internal(format!("plugin '{}' is not a profiler", name)))
    }

    pub fn transformer(&mut self) -> Result<&mut dyn SiftTransformer> {
        let name = self.name.clone();
        self.instance()?
            .as_transformer()
            .ok_or_else(|| SiftError::internal(format!("plugin '{}' is not a transformer", name)))
    }

    pub fn loader(&mut self) -> Result<&mut dyn SiftLoader> {
        let name = self.name.clone();
        self.instance()?
            .as_loader()
            .ok_or_else(|| SiftError::internal(format!("plugin '{}' is not a loader", name)))
    }

    /// Tears the instance down now, returning any teardown failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.registry.release(&self.name, self.role)
    }
}

impl Drop for SiftPluginLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            // failures were already logged by release
            let _ = self.registry.release(&self.name, self.role);
        }
    }
}
