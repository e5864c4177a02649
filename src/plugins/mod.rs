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

//! Scheduler plugins module.

pub mod nodevolumelimits;

use crate::framework::Registry;

/// All in-tree scheduler plugins provided by this crate.
pub const ALL_PLUGINS: &[&str] = &[
    nodevolumelimits::PLUGIN_NAME, // NodeVolumeLimits
];

/// Register all scheduler plugins.
/// This corresponds to NewInTreeRegistry in registry.go
pub fn register_all_plugins(registry: &Registry) {
    nodevolumelimits::register(registry);
}
