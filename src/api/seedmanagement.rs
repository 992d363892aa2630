// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ManagedSeed: a shoot promoted to act as a seed.

use crate::api::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

/// API group of the seed management resources.
pub const GROUP_NAME: &str = "seedmanagement.gardener.cloud";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedSeed {
    pub metadata: ObjectMeta,
    pub spec: ManagedSeedSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedSeedSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoot: Option<ShootReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gardenlet: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShootReference {
    pub name: String,
}

impl ManagedSeed {
    pub fn new(namespace: &str, name: &str, shoot: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            spec: ManagedSeedSpec {
                shoot: Some(ShootReference {
                    name: shoot.to_string(),
                }),
                gardenlet: None,
            },
        }
    }

    pub fn shoot_name(&self) -> Option<&str> {
        self.spec
            .shoot
            .as_ref()
            .map(|s| s.name.as_str())
            .filter(|n| !n.is_empty())
    }
}
