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

//! Read-only views of cluster state used by the scheduler plugins.
//!
//! Each lister returns an owned snapshot of the object, or None if it does not exist.
//! The in-memory stores back the listers in tests and in embedders without an informer cache.

use crate::api::core::{PersistentVolume, PersistentVolumeClaim};
use crate::api::storage::{CSINode, StorageClass};
use std::collections::HashMap;
use std::sync::RwLock;

/// PersistentVolumeClaimLister looks up claims by namespace and name.
pub trait PersistentVolumeClaimLister: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Option<PersistentVolumeClaim>;
}

/// PersistentVolumeLister looks up persistent volumes by name.
pub trait PersistentVolumeLister: Send + Sync {
    fn get(&self, name: &str) -> Option<PersistentVolume>;
}

/// StorageClassLister looks up storage classes by name.
pub trait StorageClassLister: Send + Sync {
    fn get(&self, name: &str) -> Option<StorageClass>;
}

/// CSINodeLister looks up CSINode objects by node name.
pub trait CSINodeLister: Send + Sync {
    fn get(&self, name: &str) -> Option<CSINode>;
}

/// In-memory PersistentVolumeClaim store.
#[derive(Default)]
pub struct InMemoryPersistentVolumeClaimStore {
    claims: RwLock<HashMap<(String, String), PersistentVolumeClaim>>,
}

impl InMemoryPersistentVolumeClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, claim: PersistentVolumeClaim) {
        self.claims
            .write()
            .expect("claim store lock poisoned")
            .insert((claim.namespace.clone(), claim.name.clone()), claim);
    }
}

impl PersistentVolumeClaimLister for InMemoryPersistentVolumeClaimStore {
    fn get(&self, namespace: &str, name: &str) -> Option<PersistentVolumeClaim> {
        self.claims
            .read()
            .expect("claim store lock poisoned")
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

/// In-memory PersistentVolume store.
#[derive(Default)]
pub struct InMemoryPersistentVolumeStore {
    volumes: RwLock<HashMap<String, PersistentVolume>>,
}

impl InMemoryPersistentVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, volume: PersistentVolume) {
        self.volumes
            .write()
            .expect("volume store lock poisoned")
            .insert(volume.name.clone(), volume);
    }
}

impl PersistentVolumeLister for InMemoryPersistentVolumeStore {
    fn get(&self, name: &str) -> Option<PersistentVolume> {
        self.volumes
            .read()
            .expect("volume store lock poisoned")
            .get(name)
            .cloned()
    }
}

/// In-memory StorageClass store.
#[derive(Default)]
pub struct InMemoryStorageClassStore {
    classes: RwLock<HashMap<String, StorageClass>>,
}

impl InMemoryStorageClassStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, class: StorageClass) {
        self.classes
            .write()
            .expect("storage class store lock poisoned")
            .insert(class.name.clone(), class);
    }
}

impl StorageClassLister for InMemoryStorageClassStore {
    fn get(&self, name: &str) -> Option<StorageClass> {
        self.classes
            .read()
            .expect("storage class store lock poisoned")
            .get(name)
            .cloned()
    }
}

/// In-memory CSINode store.
#[derive(Default)]
pub struct InMemoryCSINodeStore {
    csi_nodes: RwLock<HashMap<String, CSINode>>,
}

impl InMemoryCSINodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, csi_node: CSINode) {
        self.csi_nodes
            .write()
            .expect("csinode store lock poisoned")
            .insert(csi_node.name.clone(), csi_node);
    }
}

impl CSINodeLister for InMemoryCSINodeStore {
    fn get(&self, name: &str) -> Option<CSINode> {
        self.csi_nodes
            .read()
            .expect("csinode store lock poisoned")
            .get(name)
            .cloned()
    }
}
