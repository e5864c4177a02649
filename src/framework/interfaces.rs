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

//! Core scheduler plugin interfaces.

use super::node_info::NodeInfo;
use super::status::Status;
use crate::api::core::Pod;
use std::fmt;

/// ExtensionPoint is a point in the scheduling cycle where plugins run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// PreFilter runs once per pod before any node is evaluated.
    PreFilter,
    /// Filter runs once per candidate node.
    Filter,
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionPoint::PreFilter => write!(f, "PreFilter"),
            ExtensionPoint::Filter => write!(f, "Filter"),
        }
    }
}

/// Plugin is the parent type for all scheduling framework plugins.
/// This corresponds to k8s.io/kubernetes/pkg/scheduler/framework.Plugin
pub trait Plugin: Send + Sync {
    /// Returns the name of the plugin.
    fn name(&self) -> &str;

    /// Returns the plugin as a PreFilterPlugin if it runs at PreFilter.
    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        None
    }

    /// Returns the plugin as a FilterPlugin if it runs at Filter.
    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        None
    }

    /// Returns the extension points the plugin implements.
    fn extension_points(&self) -> Vec<ExtensionPoint> {
        let mut points = Vec::new();
        if self.as_pre_filter().is_some() {
            points.push(ExtensionPoint::PreFilter);
        }
        if self.as_filter().is_some() {
            points.push(ExtensionPoint::Filter);
        }
        points
    }
}

/// PreFilterPlugin is called once per pod at the beginning of a scheduling cycle.
pub trait PreFilterPlugin: Plugin {
    /// PreFilter returns Skip if the plugin's Filter has nothing to check for this pod.
    fn pre_filter(&self, pod: &Pod) -> Status;
}

/// FilterPlugin decides whether a pod fits on a node.
pub trait FilterPlugin: Plugin {
    /// Filter returns Success if the pod fits, Unschedulable if it does not,
    /// and Error if the decision could not be made.
    fn filter(&self, pod: &Pod, node_info: &NodeInfo) -> Status;
}
