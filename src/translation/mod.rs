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

//! Translation of in-tree volume sources to their CSI equivalents.

use crate::api::core::{
    InTreeVolumeSource, AWS_EBS_IN_TREE_PLUGIN_NAME, AZURE_DISK_IN_TREE_PLUGIN_NAME,
    CINDER_IN_TREE_PLUGIN_NAME, GCE_PD_IN_TREE_PLUGIN_NAME, VSPHERE_IN_TREE_PLUGIN_NAME,
};

pub const AWS_EBS_DRIVER_NAME: &str = "ebs.csi.aws.com";
pub const GCE_PD_DRIVER_NAME: &str = "pd.csi.storage.gke.io";
pub const AZURE_DISK_DRIVER_NAME: &str = "disk.csi.azure.com";
pub const CINDER_DRIVER_NAME: &str = "cinder.csi.openstack.org";
pub const VSPHERE_DRIVER_NAME: &str = "csi.vsphere.vmware.com";

const UNSPECIFIED: &str = "UNSPECIFIED";

/// The CSI identity of a volume: the driver that handles it and the handle it uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CsiVolumeIdentity {
    pub driver: String,
    pub volume_handle: String,
}

impl CsiVolumeIdentity {
    pub fn new(driver: impl Into<String>, volume_handle: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            volume_handle: volume_handle.into(),
        }
    }
}

/// InTreeTranslator maps in-tree volume sources onto CSI drivers.
pub trait InTreeTranslator: Send + Sync {
    /// Translate an in-tree source to its CSI identity.
    /// Returns None if the source has no CSI equivalent.
    fn translate(&self, source: &InTreeVolumeSource) -> Option<CsiVolumeIdentity>;

    /// Returns the CSI driver that replaces an in-tree plugin, if any.
    fn csi_driver_for_plugin(&self, _plugin_name: &str) -> Option<String> {
        None
    }
}

/// CsiTranslator knows the CSI drivers that replace the in-tree block storage plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsiTranslator;

impl CsiTranslator {
    pub fn new() -> Self {
        Self
    }
}

/// Strip the `aws://<zone>/` form of a Kubernetes EBS volume ID down to the EBS volume ID.
fn ebs_volume_id(volume_id: &str) -> &str {
    match volume_id.strip_prefix("aws://") {
        Some(rest) => {
            let rest = rest.trim_matches('/');
            rest.rsplit('/').next().unwrap_or(rest)
        }
        None => volume_id,
    }
}

impl InTreeTranslator for CsiTranslator {
    fn translate(&self, source: &InTreeVolumeSource) -> Option<CsiVolumeIdentity> {
        let identity = match source {
            InTreeVolumeSource::AwsElasticBlockStore { volume_id } => {
                CsiVolumeIdentity::new(AWS_EBS_DRIVER_NAME, ebs_volume_id(volume_id))
            }
            InTreeVolumeSource::GcePersistentDisk { pd_name } => CsiVolumeIdentity::new(
                GCE_PD_DRIVER_NAME,
                format!(
                    "projects/{}/zones/{}/disks/{}",
                    UNSPECIFIED, UNSPECIFIED, pd_name
                ),
            ),
            InTreeVolumeSource::AzureDisk { data_disk_uri, .. } => {
                CsiVolumeIdentity::new(AZURE_DISK_DRIVER_NAME, data_disk_uri.as_str())
            }
            InTreeVolumeSource::Cinder { volume_id } => {
                CsiVolumeIdentity::new(CINDER_DRIVER_NAME, volume_id.as_str())
            }
            InTreeVolumeSource::VsphereVolume { volume_path } => {
                CsiVolumeIdentity::new(VSPHERE_DRIVER_NAME, volume_path.as_str())
            }
            InTreeVolumeSource::HostPath { .. } | InTreeVolumeSource::Nfs { .. } => return None,
        };
        Some(identity)
    }

    fn csi_driver_for_plugin(&self, plugin_name: &str) -> Option<String> {
        let driver = match plugin_name {
            AWS_EBS_IN_TREE_PLUGIN_NAME => AWS_EBS_DRIVER_NAME,
            GCE_PD_IN_TREE_PLUGIN_NAME => GCE_PD_DRIVER_NAME,
            AZURE_DISK_IN_TREE_PLUGIN_NAME => AZURE_DISK_DRIVER_NAME,
            CINDER_IN_TREE_PLUGIN_NAME => CINDER_DRIVER_NAME,
            VSPHERE_IN_TREE_PLUGIN_NAME => VSPHERE_DRIVER_NAME,
            _ => return None,
        };
        Some(driver.to_string())
    }
}
