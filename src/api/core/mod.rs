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

//! Core Kubernetes API types (Pod, Volume, PersistentVolumeClaim, PersistentVolume, Node).

use std::collections::HashMap;
use std::fmt;

/// ResourceList is a map of resource names to quantity strings.
pub type ResourceList = HashMap<String, String>;

// ============================================================================
// Constants
// ============================================================================

/// Prefix shared by every attachable volume resource name on a node.
pub const ATTACHABLE_VOLUMES_PREFIX: &str = "attachable-volumes-";

/// In-tree plugin name for AWS Elastic Block Store.
pub const AWS_EBS_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/aws-ebs";

/// In-tree plugin name for GCE Persistent Disk.
pub const GCE_PD_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/gce-pd";

/// In-tree plugin name for Azure Disk.
pub const AZURE_DISK_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/azure-disk";

/// In-tree plugin name for OpenStack Cinder.
pub const CINDER_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/cinder";

/// In-tree plugin name for vSphere volumes.
pub const VSPHERE_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/vsphere-volume";

/// In-tree plugin name for host path volumes.
pub const HOST_PATH_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/host-path";

/// In-tree plugin name for NFS volumes.
pub const NFS_IN_TREE_PLUGIN_NAME: &str = "kubernetes.io/nfs";

/// Check if a resource name describes an attachable volume limit.
pub fn is_attachable_volume_resource_name(name: &str) -> bool {
    name.starts_with(ATTACHABLE_VOLUMES_PREFIX)
}

// ============================================================================
// Object References
// ============================================================================

/// OwnerReference contains information about an owning object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// If true, this reference points to the managing controller.
    pub controller: Option<bool>,
}

impl OwnerReference {
    pub fn new(api_version: &str, kind: &str, name: &str, uid: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: uid.to_string(),
            controller: None,
        }
    }

    /// Create a controller owner reference for the given pod.
    pub fn controller_of(pod: &Pod) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            name: pod.name.clone(),
            uid: pod.uid.clone(),
            controller: Some(true),
        }
    }

    /// Returns true if this reference is marked as the managing controller.
    pub fn is_controller(&self) -> bool {
        self.controller.unwrap_or(false)
    }
}

/// Returns the owner reference marked as controller, if any.
pub fn get_controller_of(owner_references: &[OwnerReference]) -> Option<&OwnerReference> {
    owner_references.iter().find(|r| r.is_controller())
}

// ============================================================================
// Volume Sources
// ============================================================================

/// PersistentVolumeClaimVolumeSource references a PVC in the same namespace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistentVolumeClaimVolumeSource {
    /// ClaimName is the name of a PersistentVolumeClaim in the pod's namespace.
    pub claim_name: String,
}

/// CSIVolumeSource is an inline volume handled by a CSI driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSIVolumeSource {
    /// Driver is the name of the CSI driver that handles this volume.
    pub driver: String,
    /// VolumeHandle uniquely identifies the volume within the driver.
    pub volume_handle: String,
}

impl CSIVolumeSource {
    pub fn new(driver: &str, volume_handle: &str) -> Self {
        Self {
            driver: driver.to_string(),
            volume_handle: volume_handle.to_string(),
        }
    }
}

/// InTreeVolumeSource is a driver-specific volume source that predates CSI.
#[derive(Debug, Clone, PartialEq)]
pub enum InTreeVolumeSource {
    AwsElasticBlockStore { volume_id: String },
    GcePersistentDisk { pd_name: String },
    AzureDisk { disk_name: String, data_disk_uri: String },
    Cinder { volume_id: String },
    VsphereVolume { volume_path: String },
    HostPath { path: String },
    Nfs { server: String, path: String },
}

impl InTreeVolumeSource {
    /// Returns the name of the in-tree plugin that handles this source.
    pub fn plugin_name(&self) -> &'static str {
        match self {
            InTreeVolumeSource::AwsElasticBlockStore { .. } => AWS_EBS_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::GcePersistentDisk { .. } => GCE_PD_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::AzureDisk { .. } => AZURE_DISK_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::Cinder { .. } => CINDER_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::VsphereVolume { .. } => VSPHERE_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::HostPath { .. } => HOST_PATH_IN_TREE_PLUGIN_NAME,
            InTreeVolumeSource::Nfs { .. } => NFS_IN_TREE_PLUGIN_NAME,
        }
    }

    /// Create an AWS EBS source.
    pub fn aws_ebs(volume_id: &str) -> Self {
        InTreeVolumeSource::AwsElasticBlockStore {
            volume_id: volume_id.to_string(),
        }
    }

    /// Create a host path source.
    pub fn host_path(path: &str) -> Self {
        InTreeVolumeSource::HostPath {
            path: path.to_string(),
        }
    }
}

/// ConfigMapVolumeSource projects a ConfigMap into a volume.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigMapVolumeSource {
    pub name: String,
}

/// SecretVolumeSource projects a Secret into a volume.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecretVolumeSource {
    pub secret_name: String,
}

/// VolumeSource represents the source of a volume.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeSource {
    PersistentVolumeClaim(PersistentVolumeClaimVolumeSource),
    /// A generic ephemeral volume. Its claim is created for, and owned by, the pod.
    Ephemeral,
    Csi(CSIVolumeSource),
    InTree(InTreeVolumeSource),
    ConfigMap(ConfigMapVolumeSource),
    Secret(SecretVolumeSource),
    EmptyDir,
    Image,
}

impl Default for VolumeSource {
    fn default() -> Self {
        VolumeSource::EmptyDir
    }
}

/// Volume represents a named volume in a pod.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Name of the volume. Must be unique within the pod.
    pub name: String,
    /// Volume source.
    pub volume_source: VolumeSource,
}

impl Volume {
    /// Create a new emptyDir volume with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::default(),
        }
    }

    /// Create a volume backed by a PersistentVolumeClaim.
    pub fn new_pvc(name: &str, claim_name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::PersistentVolumeClaim(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.to_string(),
            }),
        }
    }

    /// Create a generic ephemeral volume.
    pub fn new_ephemeral(name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::Ephemeral,
        }
    }

    /// Create an inline CSI volume.
    pub fn new_csi(name: &str, driver: &str, volume_handle: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::Csi(CSIVolumeSource::new(driver, volume_handle)),
        }
    }

    /// Create an inline in-tree volume.
    pub fn new_in_tree(name: &str, source: InTreeVolumeSource) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::InTree(source),
        }
    }

    /// Create a ConfigMap volume.
    pub fn new_config_map(name: &str, config_map: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::ConfigMap(ConfigMapVolumeSource {
                name: config_map.to_string(),
            }),
        }
    }

    /// Create a Secret volume.
    pub fn new_secret(name: &str, secret_name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_source: VolumeSource::Secret(SecretVolumeSource {
                secret_name: secret_name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Pod
// ============================================================================

/// PodSpec describes the specification of a pod.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodSpec {
    /// List of volumes.
    pub volumes: Vec<Volume>,
}

/// Pod represents a Kubernetes Pod.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pod {
    /// Name of the pod.
    pub name: String,
    /// Namespace of the pod.
    pub namespace: String,
    /// UID of the pod.
    pub uid: String,
    /// Pod specification.
    pub spec: PodSpec,
}

impl Pod {
    /// Create a new pod with the given name and namespace.
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: String::new(),
            spec: PodSpec::default(),
        }
    }

    /// Set the pod UID.
    pub fn with_uid(mut self, uid: &str) -> Self {
        self.uid = uid.to_string();
        self
    }

    /// Append a volume.
    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.spec.volumes.push(volume);
        self
    }

    /// Append a PVC-backed volume named after the claim.
    pub fn with_pvc(self, claim_name: &str) -> Self {
        let volume = Volume::new_pvc(claim_name, claim_name);
        self.with_volume(volume)
    }

    /// Returns a reference in `namespace/name` form.
    pub fn key(&self) -> ObjectKey<'_> {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

/// ObjectKey renders `namespace/name` for logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKey<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
}

impl<'a> ObjectKey<'a> {
    pub fn new(namespace: &'a str, name: &'a str) -> Self {
        Self { namespace, name }
    }
}

impl fmt::Display for ObjectKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

// ============================================================================
// PersistentVolumeClaim
// ============================================================================

/// PersistentVolumeClaimSpec represents the specification of a PVC.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistentVolumeClaimSpec {
    /// VolumeName is the binding reference to the PersistentVolume backing this claim.
    pub volume_name: Option<String>,
    /// StorageClassName is the name of the StorageClass required by the claim.
    pub storage_class_name: Option<String>,
}

/// PersistentVolumeClaim represents a user's request for storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistentVolumeClaim {
    /// Name of the PVC.
    pub name: String,
    /// Namespace of the PVC.
    pub namespace: String,
    /// Objects depended on by this claim.
    pub owner_references: Vec<OwnerReference>,
    /// Spec is the desired state of the PVC.
    pub spec: PersistentVolumeClaimSpec,
}

impl PersistentVolumeClaim {
    /// Create a new PVC.
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            owner_references: Vec::new(),
            spec: PersistentVolumeClaimSpec::default(),
        }
    }

    /// Bind the claim to a PersistentVolume.
    pub fn with_volume_name(mut self, volume_name: &str) -> Self {
        self.spec.volume_name = Some(volume_name.to_string());
        self
    }

    /// Request a storage class.
    pub fn with_storage_class(mut self, class_name: &str) -> Self {
        self.spec.storage_class_name = Some(class_name.to_string());
        self
    }

    /// Add an owner reference.
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner_references.push(owner);
        self
    }

    /// Returns the bound volume name, treating an empty name as unbound.
    pub fn bound_volume_name(&self) -> Option<&str> {
        self.spec.volume_name.as_deref().filter(|n| !n.is_empty())
    }

    /// Returns the storage class name, treating an empty name as unset.
    pub fn storage_class_name(&self) -> Option<&str> {
        self.spec.storage_class_name.as_deref().filter(|n| !n.is_empty())
    }

    /// Returns true if the pod is the managing controller of this claim.
    pub fn is_controlled_by(&self, pod: &Pod) -> bool {
        get_controller_of(&self.owner_references)
            .map(|r| r.uid == pod.uid)
            .unwrap_or(false)
    }

    /// Returns a reference in `namespace/name` form.
    pub fn key(&self) -> ObjectKey<'_> {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

/// Returns the name of the claim created for a generic ephemeral volume.
pub fn ephemeral_claim_name(pod: &Pod, volume: &Volume) -> String {
    format!("{}-{}", pod.name, volume.name)
}

// ============================================================================
// PersistentVolume
// ============================================================================

/// CSIPersistentVolumeSource is a PersistentVolume handled by a CSI driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSIPersistentVolumeSource {
    /// Driver is the name of the driver to use for this volume.
    pub driver: String,
    /// VolumeHandle is the unique volume name returned by the driver.
    pub volume_handle: String,
}

impl CSIPersistentVolumeSource {
    pub fn new(driver: &str, volume_handle: &str) -> Self {
        Self {
            driver: driver.to_string(),
            volume_handle: volume_handle.to_string(),
        }
    }
}

/// PersistentVolumeSource is the backing storage of a PersistentVolume.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistentVolumeSource {
    Csi(CSIPersistentVolumeSource),
    InTree(InTreeVolumeSource),
}

/// PersistentVolumeSpec is the specification of a persistent volume.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentVolumeSpec {
    pub persistent_volume_source: PersistentVolumeSource,
}

/// PersistentVolume represents a storage resource in the cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentVolume {
    /// Name of the PV.
    pub name: String,
    pub spec: PersistentVolumeSpec,
}

impl PersistentVolume {
    /// Create a new CSI-backed PersistentVolume.
    pub fn new_csi(name: &str, driver: &str, volume_handle: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: PersistentVolumeSpec {
                persistent_volume_source: PersistentVolumeSource::Csi(
                    CSIPersistentVolumeSource::new(driver, volume_handle),
                ),
            },
        }
    }

    /// Create a new PersistentVolume backed by an in-tree source.
    pub fn new_in_tree(name: &str, source: InTreeVolumeSource) -> Self {
        Self {
            name: name.to_string(),
            spec: PersistentVolumeSpec {
                persistent_volume_source: PersistentVolumeSource::InTree(source),
            },
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// NodeStatus represents the status of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeStatus {
    /// Allocatable represents the resources of a node available for scheduling.
    pub allocatable: ResourceList,
}

/// Node represents a Kubernetes Node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub status: NodeStatus,
}

impl Node {
    /// Create a new node with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: NodeStatus::default(),
        }
    }

    /// Set an allocatable quantity.
    pub fn with_allocatable(mut self, resource: &str, quantity: &str) -> Self {
        self.status
            .allocatable
            .insert(resource.to_string(), quantity.to_string());
        self
    }

    /// Returns the allocatable attachable-volume limits, keyed by resource name.
    ///
    /// Values that are not plain integers are skipped.
    pub fn attachable_volume_limits(&self) -> HashMap<&str, i64> {
        let mut limits = HashMap::new();
        for (name, quantity) in &self.status.allocatable {
            if !is_attachable_volume_resource_name(name) {
                continue;
            }
            match quantity.trim().parse::<i64>() {
                Ok(value) => {
                    limits.insert(name.as_str(), value);
                }
                Err(_) => {
                    tracing::debug!(
                        node = %self.name,
                        resource = %name,
                        quantity = %quantity,
                        "Ignoring non-integer attachable volume quantity"
                    );
                }
            }
        }
        limits
    }
}

// ============================================================================
// Tests
// ============================================================================
