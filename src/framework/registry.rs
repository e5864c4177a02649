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

//! Plugin registry for scheduler plugins.

use super::errors::{SchedulingError, SchedulingResult};
use super::handle::Handle;
use super::interfaces::Plugin;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};

/// Factory is a function that creates a scheduler plugin instance from its
/// optional JSON args and the framework handle.
pub type Factory =
    fn(config: Option<&mut dyn Read>, handle: &Handle) -> SchedulingResult<Arc<dyn Plugin>>;

/// Registry maps plugin names to their factories.
#[derive(Default)]
pub struct Registry {
    factories: RwLock<HashMap<String, Factory>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin with the given name and factory.
    pub fn register(&self, name: &str, factory: Factory) {
        self.factories
            .write()
            .expect("plugin registry lock poisoned")
            .insert(name.to_string(), factory);
    }

    /// Get the factory for the given plugin name.
    pub fn get_factory(&self, name: &str) -> Option<Factory> {
        self.factories
            .read()
            .expect("plugin registry lock poisoned")
            .get(name)
            .copied()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories
            .read()
            .expect("plugin registry lock poisoned")
            .contains_key(name)
    }

    /// Create a new instance of the named plugin.
    pub fn new_plugin(
        &self,
        name: &str,
        config: Option<&mut dyn Read>,
        handle: &Handle,
    ) -> SchedulingResult<Arc<dyn Plugin>> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| SchedulingError::UnknownPlugin(name.to_string()))?;
        factory(config, handle)
    }
}
