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

//! NodeVolumeLimits scheduler plugin.
//!
//! This plugin filters out nodes on which placing a pod would exceed the number
//! of volumes a CSI driver can attach to the node. Volumes are counted per driver
//! and deduplicated by their CSI identity, so a volume shared by several pods, or
//! declared both inline and through a claim, counts once. In-tree volumes count
//! toward the limit of the CSI driver they are migrated to, on nodes that have
//! migrated their plugin.

mod csi;
mod limits;
mod volumes;

#[cfg(test)]
mod testing;

pub use csi::{CSILimits, CSILimitsArgs, Decision, PreCheck, VolumeLimitExceeded};
pub use limits::{
    csi_attach_limit_key, LimitSource, NodeVolumeLimits, VolumeLimit, CSI_ATTACH_LIMIT_PREFIX,
};
pub use volumes::{AttachableVolumes, ResolveMode};

use crate::framework::{Plugin, Registry};
use std::io::Read;
use std::sync::Arc;

/// Plugin name for the NodeVolumeLimits scheduler plugin.
pub const PLUGIN_NAME: &str = "NodeVolumeLimits";

/// Reason reported when a node cannot attach the pod's volumes.
pub const ERR_REASON_MAX_VOLUME_COUNT_EXCEEDED: &str = "node(s) exceed max volume count";

/// Register the NodeVolumeLimits plugin with the plugin registry.
pub fn register(registry: &Registry) {
    registry.register(PLUGIN_NAME, |config: Option<&mut dyn Read>, handle| {
        Ok(Arc::new(CSILimits::from_config(config, handle)?) as Arc<dyn Plugin>)
    });
}

#[cfg(test)]
mod tests {
    use super::testing::{
        node_with_limits, pod_with_claims, FakeCluster, FakeLimitSource, EBS_CSI_DRIVER,
        GCE_CSI_DRIVER, STORAGE_CLASS,
    };
    use super::*;
    use crate::api::core::{
        InTreeVolumeSource, OwnerReference, PersistentVolumeClaim, Pod, Volume,
        AWS_EBS_IN_TREE_PLUGIN_NAME, HOST_PATH_IN_TREE_PLUGIN_NAME,
    };
    use crate::framework::{Code, FilterPlugin, PreFilterPlugin};

    #[derive(Debug, PartialEq)]
    enum Want {
        Success,
        Unschedulable,
        Error(&'static str),
        PreFilterSkip,
    }

    struct TestCase {
        name: &'static str,
        new_pod: Pod,
        existing_pods: Vec<Pod>,
        extra_claims: Vec<PersistentVolumeClaim>,
        max_vols: i32,
        drivers: &'static [&'static str],
        migration_enabled: bool,
        limit_source: FakeLimitSource,
        want: Want,
    }

    impl Default for TestCase {
        fn default() -> Self {
            Self {
                name: "",
                new_pod: Pod::new("", ""),
                existing_pods: Vec::new(),
                extra_claims: Vec::new(),
                max_vols: 0,
                drivers: &[EBS_CSI_DRIVER],
                migration_enabled: false,
                limit_source: FakeLimitSource::None,
                want: Want::Success,
            }
        }
    }

    const EBS_ONLY: &[&str] = &[EBS_CSI_DRIVER];
    const EBS_AND_GCE: &[&str] = &[EBS_CSI_DRIVER, GCE_CSI_DRIVER];
    const IN_TREE_AND_EBS: &[&str] = &[AWS_EBS_IN_TREE_PLUGIN_NAME, EBS_CSI_DRIVER];
    const HOST_PATH_AND_EBS: &[&str] = &[HOST_PATH_IN_TREE_PLUGIN_NAME, EBS_CSI_DRIVER];

    fn running_pod() -> Pod {
        pod_with_claims(&["csi-ebs.csi.aws.com-3"])
    }

    fn pending_volume_pod() -> Pod {
        pod_with_claims(&["csi-4"])
    }

    fn csi_ebs_one_vol_pod() -> Pod {
        pod_with_claims(&["csi-ebs.csi.aws.com-0"])
    }

    fn csi_ebs_two_vol_pod() -> Pod {
        pod_with_claims(&["csi-ebs.csi.aws.com-1", "csi-ebs.csi.aws.com-2"])
    }

    fn gce_two_vol_pod() -> Pod {
        pod_with_claims(&["csi-pd.csi.storage.gke.io-1", "csi-pd.csi.storage.gke.io-2"])
    }

    fn in_tree_one_vol_pod() -> Pod {
        pod_with_claims(&["csi-kubernetes.io/aws-ebs-0"])
    }

    fn in_tree_two_vol_pod() -> Pod {
        pod_with_claims(&["csi-kubernetes.io/aws-ebs-1", "csi-kubernetes.io/aws-ebs-2"])
    }

    fn in_tree_inline_vol_pod(volume_id: &str) -> Pod {
        Pod::new("", "").with_volume(Volume::new_in_tree(
            "",
            InTreeVolumeSource::aws_ebs(volume_id),
        ))
    }

    fn ephemeral_volume_pod() -> Pod {
        Pod::new("abc", "test")
            .with_uid("12345")
            .with_volume(Volume::new_ephemeral("xyz"))
    }

    fn ephemeral_two_volume_pod() -> Pod {
        Pod::new("abc", "test")
            .with_uid("12345II")
            .with_volume(Volume::new_ephemeral("x"))
            .with_volume(Volume::new_ephemeral("y"))
    }

    fn ephemeral_claim_for(pod: &Pod, volume: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim::new(&format!("{}-{}", pod.name, volume), &pod.namespace)
            .with_storage_class(STORAGE_CLASS)
            .with_owner(OwnerReference::controller_of(pod))
    }

    fn conflicting_claim() -> PersistentVolumeClaim {
        PersistentVolumeClaim::new("abc-xyz", "test").with_storage_class(STORAGE_CLASS)
    }

    fn config_and_secret(pod: Pod) -> Pod {
        pod.with_volume(Volume::new_config_map("cm", ""))
            .with_volume(Volume::new_secret("secret", ""))
    }

    fn test_cases() -> Vec<TestCase> {
        vec![
            TestCase {
                name: "fits when node volume limit >= new pods CSI volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                max_vols: 4,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "doesn't when node volume limit <= pods CSI volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "should when driver does not support volume limits",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                max_vols: 2,
                limit_source: FakeLimitSource::CsiNodeWithoutLimit,
                ..Default::default()
            },
            TestCase {
                name: "doesn't when both limit sources declare the limit",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                max_vols: 3,
                limit_source: FakeLimitSource::Both,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "fits when the csi node lists no drivers",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                max_vols: 2,
                limit_source: FakeLimitSource::NoCsiDriver,
                ..Default::default()
            },
            TestCase {
                name: "count pending PVCs towards volume limit <= pods CSI volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![pending_volume_pod(), csi_ebs_two_vol_pod()],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "count multiple pending pvcs towards volume limit >= pods CSI volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![
                    pending_volume_pod(),
                    pending_volume_pod(),
                    csi_ebs_two_vol_pod(),
                ],
                max_vols: 4,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "should count PVCs with invalid PV name but valid SC",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![pod_with_claims(&["csi-6"]), csi_ebs_two_vol_pod()],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "don't count pvcs with missing SC towards volume limit",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), pod_with_claims(&["csi-5"])],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "count pvcs with the same type towards volume limit",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![gce_two_vol_pod(), csi_ebs_two_vol_pod()],
                max_vols: 2,
                drivers: EBS_AND_GCE,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "don't count pvcs with different type towards volume limit",
                new_pod: gce_two_vol_pod(),
                existing_pods: vec![csi_ebs_two_vol_pod(), running_pod()],
                max_vols: 2,
                drivers: EBS_AND_GCE,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "should count in-tree volumes if migration is enabled",
                new_pod: in_tree_one_vol_pod(),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "nil csi node",
                new_pod: in_tree_inline_vol_pod("aws-inline1"),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "should count unbound in-tree volumes if migration is enabled",
                new_pod: pending_volume_pod(),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "should not limit pod if volume used does not report limits",
                new_pod: in_tree_one_vol_pod(),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNodeWithoutLimit,
                ..Default::default()
            },
            TestCase {
                name: "should not count non-migratable in-tree volumes",
                new_pod: pod_with_claims(&["csi-kubernetes.io/host-path-0"]),
                existing_pods: vec![csi_ebs_two_vol_pod()],
                max_vols: 2,
                drivers: HOST_PATH_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                ..Default::default()
            },
            TestCase {
                name: "should count in-tree inline volumes if migration is enabled",
                new_pod: in_tree_inline_vol_pod("aws-inline1"),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "should count in-tree and csi volumes if migration is enabled (when scheduling in-tree volumes)",
                new_pod: in_tree_one_vol_pod(),
                existing_pods: vec![csi_ebs_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "should count in-tree, inline and csi volumes if migration is enabled (when scheduling in-tree volumes)",
                new_pod: in_tree_inline_vol_pod("aws-inline1"),
                existing_pods: vec![csi_ebs_two_vol_pod(), in_tree_one_vol_pod()],
                max_vols: 3,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "should not count in-tree, inline and csi volumes if migration is enabled (when scheduling in-tree volumes)",
                new_pod: in_tree_inline_vol_pod("csi-ebs.csi.aws.com-1"),
                existing_pods: vec![csi_ebs_two_vol_pod(), in_tree_one_vol_pod()],
                max_vols: 3,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                ..Default::default()
            },
            TestCase {
                name: "should count in-tree and csi volumes if migration is enabled (when scheduling csi volumes)",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "ephemeral volume missing",
                new_pod: ephemeral_volume_pod(),
                want: Want::Error(
                    r#"looking up PVC test/abc-xyz: persistentvolumeclaim "abc-xyz" not found"#,
                ),
                ..Default::default()
            },
            TestCase {
                name: "ephemeral volume not owned",
                new_pod: ephemeral_volume_pod(),
                extra_claims: vec![conflicting_claim()],
                want: Want::Error(
                    "PVC test/abc-xyz was not created for pod test/abc (pod is not owner)",
                ),
                ..Default::default()
            },
            TestCase {
                name: "ephemeral volume unbound",
                new_pod: ephemeral_volume_pod(),
                extra_claims: vec![ephemeral_claim_for(&ephemeral_volume_pod(), "xyz")],
                ..Default::default()
            },
            TestCase {
                name: "ephemeral doesn't when node volume limit <= pods CSI volume",
                new_pod: ephemeral_volume_pod(),
                existing_pods: vec![running_pod(), csi_ebs_two_vol_pod()],
                extra_claims: vec![ephemeral_claim_for(&ephemeral_volume_pod(), "xyz")],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "ephemeral doesn't when node volume limit <= pods ephemeral CSI volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), ephemeral_two_volume_pod()],
                extra_claims: vec![
                    ephemeral_claim_for(&ephemeral_two_volume_pod(), "x"),
                    ephemeral_claim_for(&ephemeral_two_volume_pod(), "y"),
                ],
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "persistent doesn't when node volume limit <= pods ephemeral CSI volume + persistent volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), ephemeral_volume_pod(), csi_ebs_two_vol_pod()],
                extra_claims: vec![ephemeral_claim_for(&ephemeral_volume_pod(), "xyz")],
                max_vols: 3,
                limit_source: FakeLimitSource::Node,
                want: Want::Unschedulable,
                ..Default::default()
            },
            TestCase {
                name: "persistent okay when node volume limit > pods ephemeral CSI volume + persistent volume",
                new_pod: csi_ebs_one_vol_pod(),
                existing_pods: vec![running_pod(), ephemeral_volume_pod(), csi_ebs_two_vol_pod()],
                extra_claims: vec![ephemeral_claim_for(&ephemeral_volume_pod(), "xyz")],
                max_vols: 4,
                ..Default::default()
            },
            TestCase {
                name: "skip Filter when the pod only uses secrets and configmaps",
                new_pod: config_and_secret(Pod::new("", "")),
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                want: Want::PreFilterSkip,
                ..Default::default()
            },
            TestCase {
                name: "don't skip Filter when the pod has pvcs",
                new_pod: config_and_secret(Pod::new("", "")).with_pvc("csi-ebs.csi.aws.com-0"),
                max_vols: 2,
                limit_source: FakeLimitSource::Node,
                ..Default::default()
            },
            TestCase {
                name: "don't skip Filter when the pod has ephemeral volumes",
                new_pod: config_and_secret(Pod::new("abc", "test"))
                    .with_volume(Volume::new_ephemeral("xyz")),
                want: Want::Error(
                    r#"looking up PVC test/abc-xyz: persistentvolumeclaim "abc-xyz" not found"#,
                ),
                ..Default::default()
            },
            TestCase {
                name: "don't skip Filter when the pod has inline migratable volumes",
                new_pod: config_and_secret(Pod::new("", ""))
                    .with_volume(Volume::new_in_tree("", InTreeVolumeSource::aws_ebs("aws-inline1"))),
                existing_pods: vec![in_tree_two_vol_pod()],
                max_vols: 2,
                drivers: IN_TREE_AND_EBS,
                migration_enabled: true,
                limit_source: FakeLimitSource::CsiNode,
                want: Want::Unschedulable,
                ..Default::default()
            },
        ]
    }

    fn run(test: TestCase) {
        let (node_info, csi_node) = node_with_limits(
            test.limit_source,
            test.existing_pods,
            test.max_vols,
            test.drivers,
        );
        let cluster = FakeCluster::new(test.drivers);
        if let Some(csi_node) = csi_node {
            let csi_node = if test.migration_enabled {
                csi_node.with_migrated_plugins(&[AWS_EBS_IN_TREE_PLUGIN_NAME])
            } else {
                csi_node
            };
            cluster.csi_nodes.add(csi_node);
        }
        for claim in test.extra_claims {
            cluster.pvcs.add(claim);
        }
        let plugin = CSILimits::new(&cluster.handle());

        let pre_filter = plugin.pre_filter(&test.new_pod);
        if test.want == Want::PreFilterSkip {
            assert_eq!(pre_filter.code(), Code::Skip, "{}", test.name);
            return;
        }
        assert!(pre_filter.is_success(), "{}: PreFilter returned {}", test.name, pre_filter);

        let status = plugin.filter(&test.new_pod, &node_info);
        match test.want {
            Want::Success => assert!(status.is_success(), "{}: got {}", test.name, status),
            Want::Unschedulable => {
                assert_eq!(status.code(), Code::Unschedulable, "{}", test.name);
                assert_eq!(
                    status.reasons(),
                    &[ERR_REASON_MAX_VOLUME_COUNT_EXCEEDED.to_string()],
                    "{}",
                    test.name
                );
            }
            Want::Error(message) => {
                assert_eq!(status.code(), Code::Error, "{}", test.name);
                assert_eq!(status.message(), message, "{}", test.name);
            }
            Want::PreFilterSkip => unreachable!(),
        }
    }

    #[test]
    fn test_csi_limits() {
        for test in test_cases() {
            run(test);
        }
    }

    #[test]
    fn test_register() {
        let registry = Registry::new();
        register(&registry);
        assert!(registry.is_registered(PLUGIN_NAME));

        let cluster = FakeCluster::new(&[EBS_CSI_DRIVER]);
        let plugin = registry
            .new_plugin(PLUGIN_NAME, None, &cluster.handle())
            .unwrap();
        assert_eq!(plugin.name(), PLUGIN_NAME);
        assert!(plugin.as_filter().is_some());
        assert!(plugin.as_pre_filter().is_some());

        let mut bad = "not json".as_bytes();
        let reader: &mut dyn Read = &mut bad;
        let result = registry.new_plugin(PLUGIN_NAME, Some(reader), &cluster.handle());
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_unbound_claim_counts_once() {
        let (node_info, _) = node_with_limits(
            FakeLimitSource::Node,
            vec![pending_volume_pod(), pending_volume_pod()],
            2,
            EBS_ONLY,
        );
        let plugin = CSILimits::new(&FakeCluster::new(EBS_ONLY).handle());

        // One attached volume plus one new volume fits a limit of two.
        let decision = plugin.decide(&csi_ebs_one_vol_pod(), &node_info).unwrap();
        assert_eq!(decision, Decision::Admit);
    }

    #[test]
    fn test_same_identity_inline_and_bound_count_the_same() {
        let cluster = FakeCluster::new(IN_TREE_AND_EBS);
        let (node_info, csi_node) = node_with_limits(
            FakeLimitSource::CsiNode,
            vec![in_tree_two_vol_pod()],
            3,
            IN_TREE_AND_EBS,
        );
        if let Some(csi_node) = csi_node {
            cluster
                .csi_nodes
                .add(csi_node.with_migrated_plugins(&[AWS_EBS_IN_TREE_PLUGIN_NAME]));
        }
        let plugin = CSILimits::new(&cluster.handle());

        let via_claim = plugin.decide(&in_tree_one_vol_pod(), &node_info).unwrap();
        let inline = plugin
            .decide(&in_tree_inline_vol_pod("csi-kubernetes.io/aws-ebs-0"), &node_info)
            .unwrap();
        assert_eq!(via_claim, Decision::Admit);
        assert_eq!(via_claim, inline);

        // The same volume is already attached, so neither form needs capacity.
        let (full, _) = node_with_limits(
            FakeLimitSource::Node,
            vec![in_tree_two_vol_pod(), in_tree_one_vol_pod()],
            3,
            IN_TREE_AND_EBS,
        );
        assert_eq!(plugin.decide(&in_tree_one_vol_pod(), &full).unwrap(), Decision::Admit);
        assert_eq!(
            plugin
                .decide(&in_tree_inline_vol_pod("csi-kubernetes.io/aws-ebs-0"), &full)
                .unwrap(),
            Decision::Admit
        );
    }
}
