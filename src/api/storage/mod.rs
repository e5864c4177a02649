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

//! storage.k8s.io API types (StorageClass, CSINode).

use std::collections::HashMap;

/// Annotation on a CSINode listing the in-tree plugins migrated to CSI on that node.
pub const MIGRATED_PLUGINS_ANNOTATION_KEY: &str = "storage.alpha.kubernetes.io/migrated-plugins";

// ============================================================================
// StorageClass
// ============================================================================

/// StorageClass describes the parameters for a class of storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageClass {
    /// Name of the StorageClass.
    pub name: String,
    /// Provisioner indicates the type of the provisioner.
    pub provisioner: String,
}

impl StorageClass {
    /// Create a new StorageClass.
    pub fn new(name: &str, provisioner: &str) -> Self {
        Self {
            name: name.to_string(),
            provisioner: provisioner.to_string(),
        }
    }
}

// ============================================================================
// CSINode
// ============================================================================

/// VolumeNodeResources is a set of resource limits for scheduling of volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeNodeResources {
    /// Maximum number of unique volumes managed by the CSI driver that can be used on a node.
    /// A nil value means the number is unbounded.
    pub count: Option<i32>,
}

/// CSINodeDriver holds information about a CSI driver installed on a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSINodeDriver {
    /// Name of the CSI driver.
    pub name: String,
    /// NodeID of the node from the driver point of view.
    pub node_id: String,
    /// Allocatable represents the volume resources of a node available for scheduling.
    pub allocatable: Option<VolumeNodeResources>,
}

impl CSINodeDriver {
    /// Create a driver entry without a declared limit.
    pub fn new(name: &str, node_id: &str) -> Self {
        Self {
            name: name.to_string(),
            node_id: node_id.to_string(),
            allocatable: None,
        }
    }

    /// Create a driver entry with a volume count limit.
    pub fn with_count(name: &str, node_id: &str, count: i32) -> Self {
        Self {
            name: name.to_string(),
            node_id: node_id.to_string(),
            allocatable: Some(VolumeNodeResources { count: Some(count) }),
        }
    }

    /// Returns the declared count, or None when the driver is unbounded.
    pub fn allocatable_count(&self) -> Option<i32> {
        self.allocatable.and_then(|a| a.count)
    }
}

/// CSINodeSpec holds information about the specification of all CSI drivers installed on a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSINodeSpec {
    pub drivers: Vec<CSINodeDriver>,
}

/// CSINode holds information about all CSI drivers installed on a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSINode {
    /// Name matches the name of the Node object.
    pub name: String,
    pub annotations: HashMap<String, String>,
    pub spec: CSINodeSpec,
}

impl CSINode {
    /// Create a new CSINode with no drivers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotations: HashMap::new(),
            spec: CSINodeSpec::default(),
        }
    }

    /// Add a driver entry.
    pub fn with_driver(mut self, driver: CSINodeDriver) -> Self {
        self.spec.drivers.push(driver);
        self
    }

    /// Find the entry for a driver by name.
    pub fn driver(&self, name: &str) -> Option<&CSINodeDriver> {
        self.spec.drivers.iter().find(|d| d.name == name)
    }

    /// Record in-tree plugins as migrated on this node.
    pub fn with_migrated_plugins(mut self, plugins: &[&str]) -> Self {
        let mut names: Vec<&str> = plugins.to_vec();
        names.sort_unstable();
        names.dedup();
        self.annotations
            .insert(MIGRATED_PLUGINS_ANNOTATION_KEY.to_string(), names.join(","));
        self
    }

    /// Returns true if the in-tree plugin is listed as migrated to CSI on this node.
    pub fn is_migrated(&self, plugin_name: &str) -> bool {
        if plugin_name.is_empty() {
            return false;
        }
        self.annotations
            .get(MIGRATED_PLUGINS_ANNOTATION_KEY)
            .map(|v| v.split(',').any(|p| p.trim() == plugin_name))
            .unwrap_or(false)
    }
}
