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

use crate::api::core::{Node, Pod};

/// NodeInfo is the scheduler's view of a node: the node object and the pods
/// already committed to it.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    node: Option<Node>,
    pods: Vec<Pod>,
}

impl NodeInfo {
    /// Create a node info holding the given pods and no node object.
    pub fn new(pods: Vec<Pod>) -> Self {
        Self { node: None, pods }
    }

    pub fn set_node(&mut self, node: Node) {
        self.node = Some(node);
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.set_node(node);
        self
    }

    pub fn add_pod(&mut self, pod: Pod) {
        self.pods.push(pod);
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }
}
