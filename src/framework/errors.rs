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

//! Scheduling error types.

use thiserror::Error;

/// Result type for scheduling operations.
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// SchedulingError represents faults that abort a scheduling decision.
///
/// These are distinct from rejections: a node that cannot fit a pod is reported
/// through an unschedulable `Status`, not through an error.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// ClaimNotFound indicates a PVC referenced by the pod does not exist.
    #[error("looking up PVC {namespace}/{name}: persistentvolumeclaim \"{name}\" not found")]
    ClaimNotFound { namespace: String, name: String },

    /// ClaimNotOwned indicates an ephemeral volume's PVC was not created for the pod.
    #[error(
        "PVC {namespace}/{name} was not created for pod {pod_namespace}/{pod_name} (pod is not owner)"
    )]
    ClaimNotOwned {
        namespace: String,
        name: String,
        pod_namespace: String,
        pod_name: String,
    },

    /// EmptyClaimName indicates a PVC volume source without a claim name.
    #[error("PersistentVolumeClaim had no name")]
    EmptyClaimName,

    /// NodeNotFound indicates the node info carries no node object.
    #[error("node not found")]
    NodeNotFound,

    /// InvalidArgs indicates the plugin configuration could not be decoded.
    #[error("decoding {plugin} args: {source}")]
    InvalidArgs {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    /// UnknownPlugin indicates the registry has no factory for the plugin.
    #[error("unknown scheduler plugin: {0}")]
    UnknownPlugin(String),
}

impl SchedulingError {
    /// Create a ClaimNotFound error.
    pub fn claim_not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        SchedulingError::ClaimNotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a ClaimNotOwned error.
    pub fn claim_not_owned(
        namespace: impl Into<String>,
        name: impl Into<String>,
        pod_namespace: impl Into<String>,
        pod_name: impl Into<String>,
    ) -> Self {
        SchedulingError::ClaimNotOwned {
            namespace: namespace.into(),
            name: name.into(),
            pod_namespace: pod_namespace.into(),
            pod_name: pod_name.into(),
        }
    }

    /// Create an InvalidArgs error.
    pub fn invalid_args(plugin: impl Into<String>, source: serde_json::Error) -> Self {
        SchedulingError::InvalidArgs {
            plugin: plugin.into(),
            source,
        }
    }
}
