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

//! Resolution of pod volumes to per-driver sets of unique volume keys.

use crate::api::core::{
    ephemeral_claim_name, InTreeVolumeSource, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeSource, Pod, Volume, VolumeSource,
};
use crate::api::storage::CSINode;
use crate::framework::{SchedulingError, SchedulingResult};
use crate::listers::{PersistentVolumeClaimLister, PersistentVolumeLister, StorageClassLister};
use crate::translation::{CsiVolumeIdentity, InTreeTranslator};
use std::collections::{BTreeMap, HashSet};

/// How lookup failures are treated while resolving a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// The pod being scheduled. Lookup failures abort resolution.
    Candidate,
    /// A pod already on the node. Volumes that fail to resolve are skipped.
    Committed,
}

/// Unique volume keys grouped by CSI driver name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachableVolumes {
    by_driver: BTreeMap<String, HashSet<String>>,
}

impl AttachableVolumes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a volume. Returns false if it was already recorded for the driver.
    pub fn insert(&mut self, driver: impl Into<String>, key: impl Into<String>) -> bool {
        self.by_driver
            .entry(driver.into())
            .or_default()
            .insert(key.into())
    }

    pub fn contains(&self, driver: &str, key: &str) -> bool {
        self.by_driver
            .get(driver)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    /// Number of distinct volumes recorded for the driver.
    pub fn count(&self, driver: &str) -> usize {
        self.by_driver.get(driver).map(HashSet::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_driver.is_empty()
    }

    /// Iterate drivers in name order with their keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.by_driver.iter().map(|(d, keys)| (d.as_str(), keys))
    }

    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.by_driver.keys().map(String::as_str)
    }

    /// Drop every driver that `other` does not mention.
    pub fn retain_drivers_of(&mut self, other: &AttachableVolumes) {
        self.by_driver
            .retain(|driver, _| other.by_driver.contains_key(driver));
    }
}

/// VolumeResolver maps the volumes of a pod to the CSI volumes they attach on one node.
pub struct VolumeResolver<'a> {
    pub(super) pvc_lister: &'a dyn PersistentVolumeClaimLister,
    pub(super) pv_lister: &'a dyn PersistentVolumeLister,
    pub(super) sc_lister: &'a dyn StorageClassLister,
    pub(super) translator: &'a dyn InTreeTranslator,
    /// The node's CSINode object. Without it no in-tree plugin counts as migrated.
    pub(super) csi_node: Option<&'a CSINode>,
    /// Mixed into keys that do not come from a real volume handle.
    pub(super) prefix: &'a str,
}

impl<'a> VolumeResolver<'a> {
    /// Add the volumes of a pod to `volumes`.
    pub fn resolve(
        &self,
        pod: &Pod,
        mode: ResolveMode,
        volumes: &mut AttachableVolumes,
    ) -> SchedulingResult<()> {
        for volume in &pod.spec.volumes {
            match self.resolve_volume(pod, volume) {
                Ok(Some(identity))
                    if identity.driver.is_empty() || identity.volume_handle.is_empty() =>
                {
                    tracing::debug!(
                        pod = %pod.key(),
                        volume = %volume.name,
                        driver = %identity.driver,
                        "Volume has no driver or volume handle, not counting it"
                    );
                }
                Ok(Some(identity)) => {
                    volumes.insert(identity.driver, identity.volume_handle);
                }
                Ok(None) => {}
                Err(err) if mode == ResolveMode::Candidate => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        pod = %pod.key(),
                        volume = %volume.name,
                        error = %err,
                        "Not counting volume of pod on node"
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve the volumes of every pod already on the node, keeping only the
    /// drivers that `needed` mentions.
    pub fn count_attached(&self, pods: &[Pod], needed: &AttachableVolumes) -> AttachableVolumes {
        let mut attached = AttachableVolumes::new();
        for pod in pods {
            if let Err(err) = self.resolve(pod, ResolveMode::Committed, &mut attached) {
                tracing::warn!(
                    pod = %pod.key(),
                    error = %err,
                    "Failed to count volumes of pod on node"
                );
            }
        }
        attached.retain_drivers_of(needed);
        attached
    }

    fn resolve_volume(
        &self,
        pod: &Pod,
        volume: &Volume,
    ) -> SchedulingResult<Option<CsiVolumeIdentity>> {
        match &volume.volume_source {
            VolumeSource::PersistentVolumeClaim(source) => {
                if source.claim_name.is_empty() {
                    return Err(SchedulingError::EmptyClaimName);
                }
                let claim = self
                    .pvc_lister
                    .get(&pod.namespace, &source.claim_name)
                    .ok_or_else(|| {
                        SchedulingError::claim_not_found(&pod.namespace, &source.claim_name)
                    })?;
                Ok(self.resolve_claim(&claim))
            }
            VolumeSource::Ephemeral => {
                let claim_name = ephemeral_claim_name(pod, volume);
                let claim = self
                    .pvc_lister
                    .get(&pod.namespace, &claim_name)
                    .ok_or_else(|| SchedulingError::claim_not_found(&pod.namespace, &claim_name))?;
                if claim.namespace != pod.namespace || !claim.is_controlled_by(pod) {
                    return Err(SchedulingError::claim_not_owned(
                        &claim.namespace,
                        &claim.name,
                        &pod.namespace,
                        &pod.name,
                    ));
                }
                Ok(self.resolve_claim(&claim))
            }
            VolumeSource::Csi(source) if source.volume_handle.is_empty() => Ok(None),
            VolumeSource::Csi(source) => Ok(Some(CsiVolumeIdentity::new(
                source.driver.as_str(),
                format!("{}/{}", self.prefix, source.volume_handle),
            ))),
            VolumeSource::InTree(source) => Ok(self.translate_in_tree(source)),
            VolumeSource::ConfigMap(_)
            | VolumeSource::Secret(_)
            | VolumeSource::EmptyDir
            | VolumeSource::Image => Ok(None),
        }
    }

    fn resolve_claim(&self, claim: &PersistentVolumeClaim) -> Option<CsiVolumeIdentity> {
        if let Some(volume_name) = claim.bound_volume_name() {
            match self.pv_lister.get(volume_name) {
                Some(pv) => return self.resolve_persistent_volume(&pv),
                None => {
                    // The claim may be pre-bound to a volume that does not exist yet.
                    tracing::debug!(
                        pvc = %claim.key(),
                        pv = volume_name,
                        "Unable to look up PV, using storage class"
                    );
                }
            }
        }
        self.resolve_from_storage_class(claim)
    }

    fn resolve_persistent_volume(&self, pv: &PersistentVolume) -> Option<CsiVolumeIdentity> {
        match &pv.spec.persistent_volume_source {
            PersistentVolumeSource::Csi(csi) => Some(CsiVolumeIdentity::new(
                csi.driver.as_str(),
                csi.volume_handle.as_str(),
            )),
            PersistentVolumeSource::InTree(source) => self.translate_in_tree(source),
        }
    }

    /// An unbound claim is keyed by its own name, since it has no volume handle yet.
    fn resolve_from_storage_class(&self, claim: &PersistentVolumeClaim) -> Option<CsiVolumeIdentity> {
        let Some(class_name) = claim.storage_class_name() else {
            tracing::debug!(pvc = %claim.key(), "PVC has no storage class");
            return None;
        };
        let Some(class) = self.sc_lister.get(class_name) else {
            tracing::debug!(
                pvc = %claim.key(),
                storage_class = class_name,
                "Unable to look up storage class"
            );
            return None;
        };

        let driver = match self.translator.csi_driver_for_plugin(&class.provisioner) {
            Some(driver) => {
                if !self.is_migrated(&class.provisioner) {
                    return None;
                }
                driver
            }
            None => class.provisioner,
        };
        Some(CsiVolumeIdentity::new(
            driver,
            format!("{}-{}/{}", self.prefix, claim.namespace, claim.name),
        ))
    }

    fn translate_in_tree(&self, source: &InTreeVolumeSource) -> Option<CsiVolumeIdentity> {
        let plugin_name = source.plugin_name();
        if !self.is_migrated(plugin_name) {
            tracing::trace!(plugin = plugin_name, "In-tree plugin not migrated on node");
            return None;
        }
        self.translator.translate(source)
    }

    fn is_migrated(&self, plugin_name: &str) -> bool {
        self.csi_node
            .map(|n| n.is_migrated(plugin_name))
            .unwrap_or(false)
    }
}
