// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Property-based tests for the policy engines.

use gardener_admission_plugins::api::core::{
    Project, ProjectMember, Quota, QuotaMetric, Subject, Toleration,
};
use gardener_admission_plugins::api::meta::ObjectMeta;
use gardener_admission_plugins::api::quantity::Quantity;
use gardener_admission_plugins::policy::network::networks_overlap;
use gardener_admission_plugins::policy::quota::{check_quota, Footprint};
use gardener_admission_plugins::policy::tolerations::{is_allowed, merge_defaults};
use gardener_admission_plugins::policy::verbs::{project_custom_verbs, CustomVerb};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Tolerations over a small key space so that collisions are common.
fn toleration() -> impl Strategy<Value = Toleration> {
    (
        prop::sample::select(vec!["a", "b", "c", "d", "e"]),
        prop::option::of(prop::sample::select(vec!["x", "y", ""])),
    )
        .prop_map(|(key, value)| match value {
            Some(value) => Toleration::with_value(key, value),
            None => Toleration::new(key),
        })
}

fn tolerations() -> impl Strategy<Value = Vec<Toleration>> {
    prop::collection::vec(toleration(), 0..6)
}

fn ipv4_net() -> impl Strategy<Value = IpNet> {
    (any::<u32>(), 0u8..=32).prop_map(|(addr, prefix)| {
        Ipv4Net::new(Ipv4Addr::from(addr), prefix)
            .map(|n| IpNet::V4(n.trunc()))
            .unwrap()
    })
}

fn ip_net() -> impl Strategy<Value = IpNet> {
    prop_oneof![
        3 => ipv4_net(),
        1 => (any::<u128>(), 0u8..=128).prop_map(|(addr, prefix)| {
            Ipv6Net::new(Ipv6Addr::from(addr), prefix)
                .map(|n| IpNet::V6(n.trunc()))
                .unwrap()
        }),
    ]
}

fn cpu_footprint(units: i64) -> Footprint {
    let mut footprint = Footprint::default();
    footprint.add(QuotaMetric::Cpu, Quantity::from_units(units));
    footprint
}

fn cpu_quota(units: i64) -> Quota {
    let mut quota = Quota {
        metadata: ObjectMeta::namespaced("garden-dev", "limit"),
        ..Default::default()
    };
    quota.spec.scope.kind = "Project".to_string();
    quota.spec.metrics.insert(QuotaMetric::Cpu, Quantity::from_units(units));
    quota
}

fn project(owner: &str, members: &[String]) -> Project {
    let mut project = Project::new("dev", "garden-dev");
    project.spec.owner = Some(Subject::user(owner));
    project.spec.members = std::iter::once(owner.to_string())
        .chain(members.iter().cloned())
        .map(|m| ProjectMember::new(Subject::user(&m), "admin"))
        .collect();
    project
}

proptest! {
    /// Merging the same layers twice equals merging them once.
    #[test]
    fn merge_is_idempotent(existing in tolerations(), first in tolerations(), second in tolerations()) {
        let once = merge_defaults(&existing, &[&first, &second]);
        let twice = merge_defaults(&once, &[&first, &second]);
        prop_assert_eq!(once, twice);
    }

    /// Entries supplied by the caller are kept unchanged and in front.
    #[test]
    fn merge_keeps_existing_entries(existing in tolerations(), layer in tolerations()) {
        let merged = merge_defaults(&existing, &[&layer]);
        prop_assert_eq!(&merged[..existing.len()], &existing[..]);
    }

    /// A toleration allowed by an allowlist stays allowed when the list grows.
    #[test]
    fn allowlist_is_monotonic(candidate in toleration(), allowlist in tolerations(), extra in tolerations()) {
        if is_allowed(&candidate, &allowlist) {
            let extended: Vec<Toleration> = allowlist.iter().chain(extra.iter()).cloned().collect();
            prop_assert!(is_allowed(&candidate, &extended));
        }
    }

    /// N shoots of footprint F fit a limit of N×F; one more does not.
    #[test]
    fn quota_conservation(count in 1i64..20, units in 1i64..64) {
        let quota = cpu_quota(count * units);
        let target = cpu_footprint(units);

        let at_limit = vec![cpu_footprint(units); (count - 1) as usize];
        prop_assert!(check_quota(&target, &[(quota.clone(), at_limit)]).is_empty());

        let over_limit = vec![cpu_footprint(units); count as usize];
        let exceeded = check_quota(&target, &[(quota, over_limit)]);
        prop_assert_eq!(exceeded.len(), 1);
        prop_assert_eq!(exceeded[0].metric, QuotaMetric::Cpu);
    }

    /// Overlap does not depend on argument order.
    #[test]
    fn overlap_is_symmetric(a in ip_net(), b in ip_net()) {
        prop_assert_eq!(networks_overlap(&a, &b), networks_overlap(&b, &a));
    }

    /// A network always overlaps itself and its supernets.
    #[test]
    fn overlap_with_supernet(net in ipv4_net()) {
        prop_assert!(networks_overlap(&net, &net));
        if let Some(supernet) = net.supernet() {
            prop_assert!(networks_overlap(&net, &supernet));
        }
    }

    /// Member changes by the owner need no custom verb; by anyone else they
    /// need exactly `manage-members`.
    #[test]
    fn member_change_detection(
        old_members in prop::collection::btree_set("[a-z]{3,6}", 0..4),
        added in "[a-z]{7,9}",
    ) {
        let old_members: Vec<String> = old_members.into_iter().collect();
        let mut new_members = old_members.clone();
        new_members.push(added);

        let old = project("owner", &old_members);
        let new = project("owner", &new_members);

        prop_assert!(project_custom_verbs(Some(&old), &new, "owner").is_empty());
        prop_assert_eq!(
            project_custom_verbs(Some(&old), &new, "someone"),
            vec![CustomVerb::ManageMembers]
        );
        prop_assert!(project_custom_verbs(Some(&old), &old, "someone").is_empty());
    }
}
