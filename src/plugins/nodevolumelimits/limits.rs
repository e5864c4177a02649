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

//! Per-driver attach limits of a node.
//!
//! A driver's limit comes from the first source that mentions it:
//! 1. the driver's entry in the node's CSINode object, where an entry without
//!    a count means the driver is unbounded;
//! 2. the node's allocatable resources under the driver's limit key.
//!
//! A driver that neither source mentions is unbounded.

use crate::api::core::Node;
use crate::api::storage::CSINode;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;

/// Prefix of the allocatable resource holding a CSI driver's attach limit.
pub const CSI_ATTACH_LIMIT_PREFIX: &str = "attachable-volumes-csi-";

/// Maximum length of a resource name.
pub const RESOURCE_NAME_LENGTH_LIMIT: usize = 63;

const DRIVER_NAME_CHARS_IN_HASHED_KEY: usize = 23;
const HASH_CHARS_IN_HASHED_KEY: usize = 16;

/// Returns the allocatable resource name holding the attach limit of a CSI driver.
///
/// Names that would not fit in a resource name are shortened to a prefix of the
/// driver name followed by part of its SHA-1 hash.
pub fn csi_attach_limit_key(driver_name: &str) -> String {
    if CSI_ATTACH_LIMIT_PREFIX.len() + driver_name.len() < RESOURCE_NAME_LENGTH_LIMIT {
        return format!("{}{}", CSI_ATTACH_LIMIT_PREFIX, driver_name);
    }
    let head: String = driver_name
        .chars()
        .take(DRIVER_NAME_CHARS_IN_HASHED_KEY)
        .collect();
    let hashed = format!("{:x}", Sha1::digest(driver_name.as_bytes()));
    format!(
        "{}{}{}",
        CSI_ATTACH_LIMIT_PREFIX,
        head,
        &hashed[..HASH_CHARS_IN_HASHED_KEY]
    )
}

/// Where a driver's limit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitSource {
    /// The driver's entry in the node's CSINode object.
    CsiNode,
    /// The node's allocatable resources.
    NodeAllocatable,
}

impl fmt::Display for LimitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitSource::CsiNode => write!(f, "CSINode"),
            LimitSource::NodeAllocatable => write!(f, "node allocatable"),
        }
    }
}

/// A finite attach limit and its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLimit {
    pub max: i64,
    pub source: LimitSource,
}

/// NodeVolumeLimits resolves driver limits for one node.
#[derive(Debug)]
pub struct NodeVolumeLimits<'a> {
    csi_node: Option<&'a CSINode>,
    allocatable: HashMap<&'a str, i64>,
}

impl<'a> NodeVolumeLimits<'a> {
    pub fn new(node: &'a Node, csi_node: Option<&'a CSINode>) -> Self {
        let allocatable = node
            .attachable_volume_limits()
            .into_iter()
            .filter(|(name, _)| name.starts_with(CSI_ATTACH_LIMIT_PREFIX))
            .collect();
        Self {
            csi_node,
            allocatable,
        }
    }

    /// Returns the limit for a driver, or None if the driver is unbounded on this node.
    pub fn limit_for(&self, driver_name: &str) -> Option<VolumeLimit> {
        if let Some(entry) = self.csi_node.and_then(|n| n.driver(driver_name)) {
            return entry.allocatable_count().map(|count| VolumeLimit {
                max: i64::from(count),
                source: LimitSource::CsiNode,
            });
        }
        self.allocatable
            .get(csi_attach_limit_key(driver_name).as_str())
            .map(|&max| VolumeLimit {
                max,
                source: LimitSource::NodeAllocatable,
            })
    }

    /// Returns true if any driver has a finite limit on this node.
    pub fn has_any_limit(&self) -> bool {
        if !self.allocatable.is_empty() {
            return true;
        }
        self.csi_node
            .map(|n| n.spec.drivers.iter().any(|d| d.allocatable_count().is_some()))
            .unwrap_or(false)
    }
}
