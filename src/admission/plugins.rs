// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plugin registry for admission controllers.

use super::errors::{AdmissionError, AdmissionResult};
use super::interfaces::Interface;
use super::readiness::Readiness;
use crate::authorizer::{AlwaysAllowAuthorizer, Authorizer};
use crate::lookup::{InMemoryStore, Lookup};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// PluginContext carries the shared capabilities a plugin is built with.
#[derive(Clone)]
pub struct PluginContext {
    pub lookup: Arc<dyn Lookup>,
    pub authorizer: Arc<dyn Authorizer>,
    pub readiness: Readiness,
}

impl PluginContext {
    pub fn new(
        lookup: Arc<dyn Lookup>,
        authorizer: Arc<dyn Authorizer>,
        readiness: Readiness,
    ) -> Self {
        Self {
            lookup,
            authorizer,
            readiness,
        }
    }

    /// A context over the given store, reporting ready when the store is
    /// synced, with an authorizer that allows everything.
    pub fn for_store(store: Arc<InMemoryStore>) -> Self {
        let readiness = store.readiness();
        Self::new(store, Arc::new(AlwaysAllowAuthorizer), readiness)
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::for_store(Arc::new(InMemoryStore::new()))
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

/// Factory is a function that creates an admission plugin instance from its
/// optional configuration.
pub type Factory =
    fn(config: Option<&mut dyn Read>, context: &PluginContext) -> AdmissionResult<Arc<dyn Interface>>;

/// Plugins is a registry of admission plugins.
#[derive(Default)]
pub struct Plugins {
    registry: RwLock<HashMap<String, Factory>>,
}

impl Plugins {
    /// Create a new empty plugin registry.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new admission plugin with the given name and factory.
    pub fn register(&self, name: &str, factory: Factory) {
        let mut registry = self.registry.write();
        if registry.insert(name.to_string(), factory).is_some() {
            tracing::warn!(plugin = name, "admission plugin registered twice");
        }
    }

    /// Get a factory for the given plugin name.
    pub fn get_factory(&self, name: &str) -> Option<Factory> {
        self.registry.read().get(name).copied()
    }

    /// Get all registered plugin names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a plugin is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.read().contains_key(name)
    }

    /// Create a new instance of the named plugin.
    pub fn new_from_plugins(
        &self,
        name: &str,
        config: Option<&mut dyn Read>,
        context: &PluginContext,
    ) -> AdmissionResult<Arc<dyn Interface>> {
        let factory = self.get_factory(name).ok_or_else(|| {
            AdmissionError::internal_error(format!("unknown admission plugin: {}", name))
        })?;
        tracing::debug!(plugin = name, "initializing admission plugin");
        factory(config, context)
    }
}
