// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Seed selection for shoots without an explicit seed.
//!
//! Candidates are narrowed in three stages (eligibility, profile/selector/
//! taints/region, network disjointness); the least loaded survivor wins.

use super::network::{disjoint, parse_networks, NamedNetwork, NetworkError};
use crate::api::core::{Seed, Shoot, GARDEN_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// How seeds are matched against the region of a shoot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateDeterminationStrategy {
    /// Only seeds in the shoot's region.
    #[default]
    SameRegion,
    /// Seeds in the shoot's region, or else the seeds whose region shares
    /// the longest name prefix with it.
    MinimalDistance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("no available and visible seed found")]
    NoAvailableSeed,

    #[error("no seed matching cloud profile {cloud_profile:?} and region {region:?} found")]
    NoMatchingCloudProfileOrRegion { cloud_profile: String, region: String },

    #[error("none of the seeds matches the seed selector of the shoot")]
    NoMatchingSeedSelector,

    #[error("none of the seeds has taints that are tolerated by the shoot")]
    NoToleratedSeed,

    #[error("none of the seeds has networks disjoint with the shoot networks")]
    NoDisjointNetwork,

    /// The shoot's own networks do not parse.
    #[error(transparent)]
    ShootNetwork(#[from] NetworkError),
}

/// Networks of a shoot that are set.
pub fn shoot_networks(shoot: &Shoot) -> Result<Vec<NamedNetwork<'static>>, NetworkError> {
    let networking = match &shoot.spec.networking {
        Some(n) => n,
        None => return Ok(Vec::new()),
    };
    parse_networks(&[
        ("pods", networking.pods.as_deref()),
        ("services", networking.services.as_deref()),
        ("nodes", networking.nodes.as_deref()),
    ])
}

/// Networks of a seed that are set.
pub fn seed_networks(seed: &Seed) -> Result<Vec<NamedNetwork<'static>>, NetworkError> {
    let networks = &seed.spec.networks;
    parse_networks(&[
        ("pods", non_empty(&networks.pods)),
        ("services", non_empty(&networks.services)),
        ("nodes", networks.nodes.as_deref()),
    ])
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Number of shoots assigned to each seed.
pub fn seed_usage(shoots: &[Shoot]) -> HashMap<String, usize> {
    let mut usage = HashMap::new();
    for seed_name in shoots.iter().filter_map(|s| s.spec.seed_name.as_deref()) {
        *usage.entry(seed_name.to_string()).or_insert(0) += 1;
    }
    usage
}

fn seed_load(usage: &HashMap<String, usize>, seed: &Seed) -> usize {
    usage.get(seed.name()).copied().unwrap_or(0)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Seeds whose region is closest to `region`. Seeds in the same region are
/// preferred; otherwise those sharing the longest non-empty prefix.
fn closest_regions<'a>(seeds: Vec<&'a Seed>, region: &str) -> Vec<&'a Seed> {
    let same: Vec<&Seed> = seeds.iter().copied().filter(|s| s.region() == region).collect();
    if !same.is_empty() {
        return same;
    }
    let best = seeds
        .iter()
        .map(|s| common_prefix_len(s.region(), region))
        .max()
        .unwrap_or(0);
    if best == 0 {
        return Vec::new();
    }
    seeds
        .into_iter()
        .filter(|s| common_prefix_len(s.region(), region) == best)
        .collect()
}

fn ensure_non_empty<T>(items: Vec<T>, err: SchedulingError) -> Result<Vec<T>, SchedulingError> {
    if items.is_empty() {
        Err(err)
    } else {
        Ok(items)
    }
}

/// Returns true if the seed may be used at all by shoots in `namespace`.
pub fn seed_is_eligible(seed: &Seed, namespace: &str) -> bool {
    !seed.is_deleting()
        && seed.is_visible()
        && seed.is_available()
        && (!seed.is_protected() || namespace == GARDEN_NAMESPACE)
}

/// Returns true if the shoot's seed selector (labels and provider types)
/// accepts the seed. A shoot without selector accepts every seed.
pub fn seed_selector_matches(shoot: &Shoot, seed: &Seed) -> bool {
    match &shoot.spec.seed_selector {
        None => true,
        Some(selector) => {
            selector.label_selector.matches(&seed.metadata.labels)
                && selector.accepts_provider(&seed.spec.provider.type_)
        }
    }
}

/// Pick a seed for the shoot.
///
/// `cloud_profile` is the name of the (parent) cloud profile the shoot uses
/// and `usage` the number of shoots already assigned per seed name.
pub fn select_seed<'a>(
    seeds: &'a [Seed],
    shoot: &Shoot,
    cloud_profile: &str,
    usage: &HashMap<String, usize>,
    strategy: CandidateDeterminationStrategy,
) -> Result<&'a Seed, SchedulingError> {
    let namespace = shoot.metadata.namespace.as_str();
    let region = shoot.spec.region.as_str();
    let no_match = || SchedulingError::NoMatchingCloudProfileOrRegion {
        cloud_profile: cloud_profile.to_string(),
        region: region.to_string(),
    };

    let candidates = ensure_non_empty(
        seeds
            .iter()
            .filter(|s| seed_is_eligible(s, namespace))
            .collect::<Vec<_>>(),
        SchedulingError::NoAvailableSeed,
    )?;

    let candidates = ensure_non_empty(
        candidates
            .into_iter()
            .filter(|s| s.spec.cloud_profile_name == cloud_profile)
            .collect::<Vec<_>>(),
        no_match(),
    )?;

    let candidates = ensure_non_empty(
        candidates
            .into_iter()
            .filter(|s| seed_selector_matches(shoot, s))
            .collect::<Vec<_>>(),
        SchedulingError::NoMatchingSeedSelector,
    )?;

    let candidates = ensure_non_empty(
        candidates
            .into_iter()
            .filter(|s| s.taints_tolerated(&shoot.spec.tolerations))
            .collect::<Vec<_>>(),
        SchedulingError::NoToleratedSeed,
    )?;

    let candidates = match strategy {
        CandidateDeterminationStrategy::SameRegion => candidates
            .into_iter()
            .filter(|s| s.region() == region)
            .collect::<Vec<_>>(),
        CandidateDeterminationStrategy::MinimalDistance => closest_regions(candidates, region),
    };
    let candidates = ensure_non_empty(candidates, no_match())?;

    let shoot_nets = shoot_networks(shoot)?;
    let mut disjoint_candidates = Vec::new();
    for seed in candidates {
        match seed_networks(seed) {
            Ok(seed_nets) if disjoint(&shoot_nets, &seed_nets) => disjoint_candidates.push(seed),
            Ok(_) => {}
            Err(err) => warn!(seed = seed.name(), %err, "skipping seed with invalid networks"),
        }
    }

    disjoint_candidates
        .into_iter()
        .min_by(|a, b| {
            seed_load(usage, a)
                .cmp(&seed_load(usage, b))
                .then_with(|| a.name().cmp(b.name()))
        })
        .ok_or(SchedulingError::NoDisjointNetwork)
}
