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

//! Scheduler framework interfaces and types.
//!
//! This module provides the core types and traits for implementing scheduler plugins,
//! mirroring the Go interfaces from k8s.io/kubernetes/pkg/scheduler/framework.

pub mod errors;
mod handle;
mod interfaces;
mod node_info;
mod registry;
mod status;

pub use errors::{SchedulingError, SchedulingResult};
pub use handle::Handle;
pub use interfaces::{ExtensionPoint, FilterPlugin, Plugin, PreFilterPlugin};
pub use node_info::NodeInfo;
pub use registry::{Factory, Registry};
pub use status::{Code, Status};
