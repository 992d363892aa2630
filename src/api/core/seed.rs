// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Seed: a host cluster running shoot control planes.

use super::{Toleration, SEED_CONDITION_GARDENLET_READY, SEED_TAINT_PROTECTED};
use crate::api::meta::{Condition, ConditionStatus, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub metadata: ObjectMeta,
    pub spec: SeedSpec,
    pub status: SeedStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedSpec {
    /// Cloud profile whose shoots this seed hosts.
    pub cloud_profile_name: String,
    pub networks: SeedNetworks,
    pub provider: SeedProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SeedSettings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<SeedTaint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedNetworks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,
    pub pods: String,
    pub services: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedProvider {
    #[serde(rename = "type")]
    pub type_: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SeedSettingScheduling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedSettingScheduling {
    pub visible: bool,
}

/// SeedTaint keeps shoots away unless they tolerate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedTaint {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedStatus {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Seed {
    pub fn new(name: &str, region: &str, cloud_profile: &str) -> Self {
        Self {
            metadata: ObjectMeta::cluster(name),
            spec: SeedSpec {
                cloud_profile_name: cloud_profile.to_string(),
                provider: SeedProvider {
                    region: region.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            status: SeedStatus {
                conditions: vec![Condition::new(
                    SEED_CONDITION_GARDENLET_READY,
                    ConditionStatus::True,
                )],
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn region(&self) -> &str {
        &self.spec.provider.region
    }

    /// Seeds are visible for scheduling unless explicitly hidden.
    pub fn is_visible(&self) -> bool {
        self.spec
            .settings
            .as_ref()
            .and_then(|s| s.scheduling.as_ref())
            .map(|s| s.visible)
            .unwrap_or(true)
    }

    /// A seed is available when its gardenlet reports ready.
    pub fn is_available(&self) -> bool {
        self.status
            .conditions
            .iter()
            .any(|c| c.type_ == SEED_CONDITION_GARDENLET_READY && c.status == ConditionStatus::True)
    }

    pub fn is_protected(&self) -> bool {
        self.spec.taints.iter().any(|t| t.key == SEED_TAINT_PROTECTED)
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.is_deleting()
    }

    /// Returns true if every taint of the seed is tolerated. A taint without a
    /// value is tolerated by any toleration with its key; a taint with a value
    /// needs a toleration carrying the same value, where an unset toleration
    /// value counts as empty.
    pub fn taints_tolerated(&self, tolerations: &[Toleration]) -> bool {
        let values: HashMap<&str, &str> = tolerations
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_deref().unwrap_or("")))
            .collect();
        self.spec.taints.iter().all(|taint| match values.get(taint.key.as_str()) {
            None => false,
            Some(value) => taint.value.as_deref().map_or(true, |v| v == *value),
        })
    }
}
