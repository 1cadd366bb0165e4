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

//! Plugin discovery, resolution and per-stage instance lifecycle.
//!
//! Discovery produces a [`SiftPluginCatalog`] mapping `(role, name)` to a
//! factory. [`SiftPluginRegistry`] resolves names against the catalog,
//! applies the API version gate and hands out [`SiftPluginLease`] guards
//! that always tear the instance down.

pub mod discovery;
pub mod lifecycle;
pub mod manifest;
pub mod version;

pub use discovery::{
    SiftCompositeDiscovery, SiftDiscoveredPlugin, SiftPluginCatalog, SiftPluginDiscovery,
    SiftPluginFactory, SiftPluginInfo, SiftPluginSource, SiftStaticDiscovery,
};
pub use lifecycle::{SiftPluginLease, SiftPluginRegistry};
pub use manifest::SiftManifestDiscovery;
pub use version::{check_api_version, SiftApiVersion};
