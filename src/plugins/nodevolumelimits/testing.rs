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

//! Fake cluster state for NodeVolumeLimits tests.
//!
//! For every driver the fake cluster holds four claims named
//! `csi-<driver>-<n>`, each bound to a volume of the same name. It also holds
//! `csi-4` (unbound, with storage class), `csi-5` (no class) and `csi-6`
//! (bound to a missing volume, with storage class). The storage class
//! `csi-sc` is provisioned by the first driver.

use super::limits::csi_attach_limit_key;
use crate::api::core::{
    InTreeVolumeSource, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    AWS_EBS_IN_TREE_PLUGIN_NAME, HOST_PATH_IN_TREE_PLUGIN_NAME,
};
use crate::api::storage::{CSINode, CSINodeDriver, StorageClass};
use crate::framework::{Handle, NodeInfo};
use crate::listers::{
    InMemoryCSINodeStore, InMemoryPersistentVolumeClaimStore, InMemoryPersistentVolumeStore,
    InMemoryStorageClassStore,
};
use std::sync::Arc;

pub const EBS_CSI_DRIVER: &str = "ebs.csi.aws.com";
pub const GCE_CSI_DRIVER: &str = "pd.csi.storage.gke.io";
pub const STORAGE_CLASS: &str = "csi-sc";
pub const NODE_NAME: &str = "node-for-max-pd-test-1";

const VOLUME_NAME: &str = "csi";

/// Where the fake node declares its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeLimitSource {
    None,
    Node,
    CsiNode,
    Both,
    CsiNodeWithoutLimit,
    NoCsiDriver,
}

pub struct FakeCluster {
    pub pvcs: Arc<InMemoryPersistentVolumeClaimStore>,
    pub pvs: Arc<InMemoryPersistentVolumeStore>,
    pub classes: Arc<InMemoryStorageClassStore>,
    pub csi_nodes: Arc<InMemoryCSINodeStore>,
}

impl FakeCluster {
    pub fn new(drivers: &[&str]) -> Self {
        let cluster = Self {
            pvcs: Arc::new(InMemoryPersistentVolumeClaimStore::new()),
            pvs: Arc::new(InMemoryPersistentVolumeStore::new()),
            classes: Arc::new(InMemoryStorageClassStore::new()),
            csi_nodes: Arc::new(InMemoryCSINodeStore::new()),
        };

        for driver in drivers {
            for j in 0..4 {
                let name = format!("{}-{}-{}", VOLUME_NAME, driver, j);
                let pv = match *driver {
                    AWS_EBS_IN_TREE_PLUGIN_NAME => {
                        PersistentVolume::new_in_tree(&name, InTreeVolumeSource::aws_ebs(&name))
                    }
                    HOST_PATH_IN_TREE_PLUGIN_NAME => {
                        PersistentVolume::new_in_tree(&name, InTreeVolumeSource::host_path("/tmp"))
                    }
                    _ => PersistentVolume::new_csi(&name, driver, &name),
                };
                cluster.pvs.add(pv);
                cluster
                    .pvcs
                    .add(PersistentVolumeClaim::new(&name, "").with_volume_name(&name));
            }
        }

        cluster.pvcs.add(
            PersistentVolumeClaim::new(&format!("{}-4", VOLUME_NAME), "")
                .with_storage_class(STORAGE_CLASS),
        );
        cluster
            .pvcs
            .add(PersistentVolumeClaim::new(&format!("{}-5", VOLUME_NAME), ""));
        cluster.pvcs.add(
            PersistentVolumeClaim::new(&format!("{}-6", VOLUME_NAME), "")
                .with_storage_class(STORAGE_CLASS)
                .with_volume_name("missing-in-action"),
        );

        if let Some(provisioner) = drivers.first() {
            cluster
                .classes
                .add(StorageClass::new(STORAGE_CLASS, provisioner));
        }
        cluster
    }

    pub fn handle(&self) -> Handle {
        Handle::new(
            self.pvcs.clone(),
            self.pvs.clone(),
            self.classes.clone(),
            self.csi_nodes.clone(),
        )
    }
}

/// Build a handle over the fake cluster, optionally holding a CSINode.
pub fn fake_handle(drivers: &[&str], csi_node: Option<CSINode>) -> Handle {
    let cluster = FakeCluster::new(drivers);
    if let Some(csi_node) = csi_node {
        cluster.csi_nodes.add(csi_node);
    }
    cluster.handle()
}

/// Build the node info for the given pods and the CSINode, if the limit source needs one.
pub fn node_with_limits(
    limit_source: FakeLimitSource,
    pods: Vec<Pod>,
    limit: i32,
    drivers: &[&str],
) -> (NodeInfo, Option<CSINode>) {
    let mut node = Node::new(NODE_NAME);
    let add_limit_to_node = |node: &mut Node| {
        for driver in drivers {
            node.status
                .allocatable
                .insert(csi_attach_limit_key(driver), limit.to_string());
        }
    };
    let csi_node_with_drivers = |with_limits: bool| {
        drivers.iter().fold(CSINode::new(NODE_NAME), |csi_node, driver| {
            let entry = if with_limits {
                CSINodeDriver::with_count(driver, NODE_NAME, limit)
            } else {
                CSINodeDriver::new(driver, NODE_NAME)
            };
            csi_node.with_driver(entry)
        })
    };

    let csi_node = match limit_source {
        FakeLimitSource::None => None,
        FakeLimitSource::Node => {
            add_limit_to_node(&mut node);
            None
        }
        FakeLimitSource::CsiNode => Some(csi_node_with_drivers(true)),
        FakeLimitSource::Both => {
            add_limit_to_node(&mut node);
            Some(csi_node_with_drivers(true))
        }
        FakeLimitSource::CsiNodeWithoutLimit => Some(csi_node_with_drivers(false)),
        FakeLimitSource::NoCsiDriver => Some(CSINode::new(NODE_NAME)),
    };

    (NodeInfo::new(pods).with_node(node), csi_node)
}

/// A pod in the default namespace using the given claims.
pub fn pod_with_claims(claims: &[&str]) -> Pod {
    claims
        .iter()
        .fold(Pod::new("", ""), |pod, claim| pod.with_pvc(claim))
}
