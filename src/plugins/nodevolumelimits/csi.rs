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

use super::limits::{csi_attach_limit_key, LimitSource, NodeVolumeLimits};
use super::volumes::{AttachableVolumes, ResolveMode, VolumeResolver};
use super::{ERR_REASON_MAX_VOLUME_COUNT_EXCEEDED, PLUGIN_NAME};
use crate::api::core::{Pod, VolumeSource};
use crate::api::storage::CSINode;
use crate::framework::{
    FilterPlugin, Handle, NodeInfo, Plugin, PreFilterPlugin, SchedulingError, SchedulingResult,
    Status,
};
use crate::listers::{
    CSINodeLister, PersistentVolumeClaimLister, PersistentVolumeLister, StorageClassLister,
};
use crate::translation::InTreeTranslator;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

const VOLUME_ID_PREFIX_LENGTH: usize = 32;

/// Process-wide prefix for keys of volumes that have no real volume handle.
static RANDOM_VOLUME_ID_PREFIX: Lazy<String> = Lazy::new(|| {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VOLUME_ID_PREFIX_LENGTH)
        .map(char::from)
        .collect()
});

/// CSILimitsArgs holds the arguments used to configure the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CSILimitsArgs {
    /// Fixed prefix for synthesized volume keys. Defaults to a random per-process prefix.
    #[serde(default)]
    pub volume_id_prefix: Option<String>,
}

/// Outcome of the node-independent pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreCheck {
    /// The pod has volumes that may count against a limit.
    Proceed,
    /// No volume of the pod can count against a limit on any node.
    Skip,
}

/// Details of a rejected placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLimitExceeded {
    pub driver: String,
    pub limit_key: String,
    pub source: LimitSource,
    pub limit: i64,
    /// Distinct volumes of the driver already attached to the node.
    pub attached: usize,
    /// Volumes of the pod not yet attached to the node.
    pub requested: usize,
}

impl fmt::Display for VolumeLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver {} has {} attached and {} requested volumes, limit {} from {} ({})",
            self.driver, self.attached, self.requested, self.limit, self.source, self.limit_key
        )
    }
}

/// Outcome of placing a pod on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject(VolumeLimitExceeded),
}

/// CSILimits rejects placements that would exceed a node's per-driver limit
/// on attachable CSI volumes.
pub struct CSILimits {
    pvc_lister: Arc<dyn PersistentVolumeClaimLister>,
    pv_lister: Arc<dyn PersistentVolumeLister>,
    sc_lister: Arc<dyn StorageClassLister>,
    csi_node_lister: Arc<dyn CSINodeLister>,
    translator: Arc<dyn InTreeTranslator>,
    volume_id_prefix: String,
}

impl CSILimits {
    /// Create the plugin with the process-wide volume ID prefix.
    pub fn new(handle: &Handle) -> Self {
        Self::from_args(CSILimitsArgs::default(), handle)
    }

    pub fn from_args(args: CSILimitsArgs, handle: &Handle) -> Self {
        let volume_id_prefix = args
            .volume_id_prefix
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| RANDOM_VOLUME_ID_PREFIX.clone());
        Self {
            pvc_lister: Arc::clone(&handle.pvc_lister),
            pv_lister: Arc::clone(&handle.pv_lister),
            sc_lister: Arc::clone(&handle.sc_lister),
            csi_node_lister: Arc::clone(&handle.csi_node_lister),
            translator: Arc::clone(&handle.translator),
            volume_id_prefix,
        }
    }

    /// Create the plugin from optional JSON-encoded `CSILimitsArgs`.
    pub fn from_config(config: Option<&mut dyn Read>, handle: &Handle) -> SchedulingResult<Self> {
        let args = match config {
            Some(reader) => serde_json::from_reader(reader)
                .map_err(|e| SchedulingError::invalid_args(PLUGIN_NAME, e))?,
            None => CSILimitsArgs::default(),
        };
        Ok(Self::from_args(args, handle))
    }

    pub fn volume_id_prefix(&self) -> &str {
        &self.volume_id_prefix
    }

    /// Returns Skip if no volume of the pod can count against a limit on any node.
    pub fn pre_check(&self, pod: &Pod) -> PreCheck {
        let counts = pod.spec.volumes.iter().any(|v| match &v.volume_source {
            VolumeSource::PersistentVolumeClaim(_)
            | VolumeSource::Ephemeral
            | VolumeSource::Csi(_) => true,
            VolumeSource::InTree(source) => self.translator.translate(source).is_some(),
            _ => false,
        });
        if counts {
            PreCheck::Proceed
        } else {
            PreCheck::Skip
        }
    }

    /// Decide whether the pod fits on the node.
    ///
    /// Lookup failures for the pod's own volumes are returned as errors. Failures
    /// for pods already on the node only cause the affected volume to be ignored.
    #[tracing::instrument(level = "debug", skip_all, fields(pod = %pod.key()))]
    pub fn decide(&self, pod: &Pod, node_info: &NodeInfo) -> SchedulingResult<Decision> {
        if pod.spec.volumes.is_empty() {
            return Ok(Decision::Admit);
        }
        let node = node_info.node().ok_or(SchedulingError::NodeNotFound)?;

        let csi_node = self.csi_node_lister.get(&node.name);
        if csi_node.is_none() {
            tracing::debug!(node = %node.name, "Could not find a CSINode object for the node");
        }
        let resolver = self.resolver(csi_node.as_ref());

        let mut new_volumes = AttachableVolumes::new();
        resolver.resolve(pod, ResolveMode::Candidate, &mut new_volumes)?;
        if new_volumes.is_empty() {
            return Ok(Decision::Admit);
        }

        let limits = NodeVolumeLimits::new(node, csi_node.as_ref());
        if !limits.has_any_limit() {
            return Ok(Decision::Admit);
        }

        let attached = resolver.count_attached(node_info.pods(), &new_volumes);
        for (driver, keys) in new_volumes.iter() {
            let Some(limit) = limits.limit_for(driver) else {
                continue;
            };
            let attached_count = attached.count(driver);
            let requested = keys
                .iter()
                .filter(|key| !attached.contains(driver, key))
                .count();
            tracing::trace!(
                node = %node.name,
                driver,
                attached = attached_count,
                requested,
                limit = limit.max,
                "Checking volume limit"
            );
            if (attached_count + requested) as i64 > limit.max {
                return Ok(Decision::Reject(VolumeLimitExceeded {
                    driver: driver.to_string(),
                    limit_key: csi_attach_limit_key(driver),
                    source: limit.source,
                    limit: limit.max,
                    attached: attached_count,
                    requested,
                }));
            }
        }
        Ok(Decision::Admit)
    }

    fn resolver<'a>(&'a self, csi_node: Option<&'a CSINode>) -> VolumeResolver<'a> {
        VolumeResolver {
            pvc_lister: self.pvc_lister.as_ref(),
            pv_lister: self.pv_lister.as_ref(),
            sc_lister: self.sc_lister.as_ref(),
            translator: self.translator.as_ref(),
            csi_node,
            prefix: &self.volume_id_prefix,
        }
    }
}

impl Plugin for CSILimits {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        Some(self)
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        Some(self)
    }
}

impl PreFilterPlugin for CSILimits {
    fn pre_filter(&self, pod: &Pod) -> Status {
        match self.pre_check(pod) {
            PreCheck::Proceed => Status::success(),
            PreCheck::Skip => Status::skip().with_plugin(PLUGIN_NAME),
        }
    }
}

impl FilterPlugin for CSILimits {
    fn filter(&self, pod: &Pod, node_info: &NodeInfo) -> Status {
        match self.decide(pod, node_info) {
            Ok(Decision::Admit) => Status::success(),
            Ok(Decision::Reject(exceeded)) => {
                tracing::debug!(pod = %pod.key(), %exceeded, "Pod exceeds node volume limit");
                Status::unschedulable(ERR_REASON_MAX_VOLUME_COUNT_EXCEEDED).with_plugin(PLUGIN_NAME)
            }
            Err(err) => Status::as_status(err).with_plugin(PLUGIN_NAME),
        }
    }
}
