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

//! Shared dependencies handed to plugin factories.

use crate::listers::{
    CSINodeLister, PersistentVolumeClaimLister, PersistentVolumeLister, StorageClassLister,
};
use crate::translation::{CsiTranslator, InTreeTranslator};
use std::sync::Arc;

/// Handle gives plugins access to cluster state and shared helpers.
#[derive(Clone)]
pub struct Handle {
    pub pvc_lister: Arc<dyn PersistentVolumeClaimLister>,
    pub pv_lister: Arc<dyn PersistentVolumeLister>,
    pub sc_lister: Arc<dyn StorageClassLister>,
    pub csi_node_lister: Arc<dyn CSINodeLister>,
    pub translator: Arc<dyn InTreeTranslator>,
}

impl Handle {
    /// Create a handle using the default in-tree translator.
    pub fn new(
        pvc_lister: Arc<dyn PersistentVolumeClaimLister>,
        pv_lister: Arc<dyn PersistentVolumeLister>,
        sc_lister: Arc<dyn StorageClassLister>,
        csi_node_lister: Arc<dyn CSINodeLister>,
    ) -> Self {
        Self {
            pvc_lister,
            pv_lister,
            sc_lister,
            csi_node_lister,
            translator: Arc::new(CsiTranslator::new()),
        }
    }

    /// Replace the in-tree translator.
    pub fn with_translator(mut self, translator: Arc<dyn InTreeTranslator>) -> Self {
        self.translator = translator;
        self
    }
}
