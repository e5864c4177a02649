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

//! Kubernetes Scheduler Plugins reimplemented in Rust
//!
//! This crate provides a Rust implementation of the scheduler's NodeVolumeLimits
//! filter, which keeps pods off nodes that cannot attach all of their CSI volumes.
//! The implementation follows the same architecture and interfaces as the original
//! Kubernetes scheduler framework.

pub mod api;
pub mod framework;
pub mod listers;
pub mod plugins;
pub mod translation;

// Re-export commonly used types
pub use api::core::{Node, PersistentVolume, PersistentVolumeClaim, Pod, Volume};
pub use framework::{
    Code, FilterPlugin, Handle, NodeInfo, Plugin, PreFilterPlugin, Registry, SchedulingError,
    SchedulingResult, Status,
};
pub use plugins::nodevolumelimits::{CSILimits, Decision, PreCheck};
