// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Quota and SecretBinding.

use crate::api::meta::{ObjectMeta, ObjectReference};
use crate::api::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// QuotaMetric is a resource dimension a quota can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuotaMetric {
    #[serde(rename = "cpu")]
    Cpu,
    #[serde(rename = "gpu")]
    Gpu,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "storage.standard")]
    StorageStandard,
    #[serde(rename = "storage.premium")]
    StoragePremium,
    #[serde(rename = "loadbalancer")]
    LoadBalancer,
}

impl QuotaMetric {
    pub const ALL: [QuotaMetric; 6] = [
        QuotaMetric::Cpu,
        QuotaMetric::Gpu,
        QuotaMetric::Memory,
        QuotaMetric::StorageStandard,
        QuotaMetric::StoragePremium,
        QuotaMetric::LoadBalancer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaMetric::Cpu => "cpu",
            QuotaMetric::Gpu => "gpu",
            QuotaMetric::Memory => "memory",
            QuotaMetric::StorageStandard => "storage.standard",
            QuotaMetric::StoragePremium => "storage.premium",
            QuotaMetric::LoadBalancer => "loadbalancer",
        }
    }
}

impl fmt::Display for QuotaMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// QuotaScope decides which shoots share the consumption of a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaScope {
    /// Only shoots in the namespace of the requesting shoot.
    Project,
    /// All shoots, in any namespace, using a binding to the quota.
    Secret,
}

/// Quota caps the aggregate consumption of the shoots bound to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quota {
    pub metadata: ObjectMeta,
    pub spec: QuotaSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotaSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_lifetime_days: Option<i32>,
    pub metrics: BTreeMap<QuotaMetric, Quantity>,
    pub scope: ObjectReference,
}

impl Quota {
    /// Resolves the scope reference. Unknown kinds yield `None`.
    pub fn scope(&self) -> Option<QuotaScope> {
        match self.spec.scope.kind.as_str() {
            "Project" => Some(QuotaScope::Project),
            "Secret" => Some(QuotaScope::Secret),
            _ => None,
        }
    }
}

/// SecretBinding links infrastructure credentials to a list of quotas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretBinding {
    pub metadata: ObjectMeta,
    pub secret_ref: ObjectReference,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quotas: Vec<ObjectReference>,
}

impl SecretBinding {
    /// Returns true if the binding references the given quota.
    pub fn references_quota(&self, quota: &Quota) -> bool {
        self.quotas
            .iter()
            .any(|q| q.name == quota.metadata.name && q.namespace == quota.metadata.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_scope() {
        let mut quota = Quota::default();
        quota.spec.scope.kind = "Project".to_string();
        assert_eq!(quota.scope(), Some(QuotaScope::Project));
        quota.spec.scope.kind = "Secret".to_string();
        assert_eq!(quota.scope(), Some(QuotaScope::Secret));
        quota.spec.scope.kind = "Foo".to_string();
        assert_eq!(quota.scope(), None);
    }

    #[test]
    fn test_quota_metrics_deserialize() {
        let spec: QuotaSpec = serde_json::from_str(
            r#"{"clusterLifetimeDays": 14, "metrics": {"cpu": "200", "storage.standard": "1Ti"},
                "scope": {"apiVersion": "v1", "kind": "Secret"}}"#,
        )
        .unwrap();
        assert_eq!(spec.cluster_lifetime_days, Some(14));
        assert_eq!(spec.metrics[&QuotaMetric::Cpu], Quantity::from_units(200));
        assert!(spec.metrics.contains_key(&QuotaMetric::StorageStandard));
    }

    #[test]
    fn test_references_quota() {
        let quota = Quota {
            metadata: ObjectMeta::namespaced("garden-trial", "trial"),
            ..Default::default()
        };
        let binding = SecretBinding {
            metadata: ObjectMeta::namespaced("garden-dev", "creds"),
            secret_ref: ObjectReference::new("garden-dev", "creds"),
            quotas: vec![ObjectReference::new("garden-trial", "trial")],
        };
        assert!(binding.references_quota(&quota));
        assert!(!SecretBinding::default().references_quota(&quota));
    }
}
