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

//! Plugin result status.

use super::errors::SchedulingError;
use std::fmt;

/// Code is the status code returned by a plugin.
/// This corresponds to k8s.io/kubernetes/pkg/scheduler/framework.Code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Code {
    /// Success means the plugin ran correctly and found the pod schedulable.
    #[default]
    Success,
    /// Error is used for internal plugin errors, unexpected input, etc.
    Error,
    /// Unschedulable means the pod does not fit on the node right now,
    /// but may after the cluster changes.
    Unschedulable,
    /// UnschedulableAndUnresolvable means no cluster change will make the pod fit the node.
    UnschedulableAndUnresolvable,
    /// Skip means the plugin has nothing to do for this pod and the
    /// matching later extension point should not run.
    Skip,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Success => write!(f, "Success"),
            Code::Error => write!(f, "Error"),
            Code::Unschedulable => write!(f, "Unschedulable"),
            Code::UnschedulableAndUnresolvable => write!(f, "UnschedulableAndUnresolvable"),
            Code::Skip => write!(f, "Skip"),
        }
    }
}

/// Status indicates the result of running a plugin.
#[derive(Debug, Default)]
pub struct Status {
    code: Code,
    reasons: Vec<String>,
    plugin: String,
}

impl Status {
    /// Create a status with the given code and reasons.
    pub fn new(code: Code, reasons: &[&str]) -> Self {
        Self {
            code,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
            plugin: String::new(),
        }
    }

    /// Create a success status.
    pub fn success() -> Self {
        Self::default()
    }

    /// Create a skip status.
    pub fn skip() -> Self {
        Self::new(Code::Skip, &[])
    }

    /// Create an unschedulable status with a single reason.
    pub fn unschedulable(reason: &str) -> Self {
        Self::new(Code::Unschedulable, &[reason])
    }

    /// Wrap an error into an Error status whose reason is the error message.
    pub fn as_status(error: SchedulingError) -> Self {
        Self {
            code: Code::Error,
            reasons: vec![error.to_string()],
            plugin: String::new(),
        }
    }

    /// Record the plugin that produced this status.
    pub fn with_plugin(mut self, plugin: &str) -> Self {
        self.plugin = plugin.to_string();
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Returns the plugin that produced this status, if recorded.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Message joins the reasons.
    pub fn message(&self) -> String {
        self.reasons.join(", ")
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    pub fn is_skip(&self) -> bool {
        self.code == Code::Skip
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reasons.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message())
        }
    }
}
