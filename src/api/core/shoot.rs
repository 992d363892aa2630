// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Shoot: a tenant-requested managed Kubernetes cluster.

use super::cloudprofile::CloudProfileReference;
use super::Toleration;
use crate::api::meta::{LabelSelector, ObjectMeta};
use crate::api::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shoot is the specification of a tenant cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Shoot {
    pub metadata: ObjectMeta,
    pub spec: ShootSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ShootStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShootSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Addons>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_profile_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_profile: Option<CloudProfileReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<ShootDns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_class_name: Option<String>,
    pub kubernetes: Kubernetes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_binding_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_selector: Option<SeedSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Addons {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nginx_ingress: Option<NginxIngress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NginxIngress {
    pub enabled: bool,
}

/// ShootDns holds the domain of the cluster and its DNS providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShootDns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<DnsProvider>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsProvider {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Kubernetes {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_pod_autoscaler: Option<VerticalPodAutoscaler>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerticalPodAutoscaler {
    pub enabled: bool,
}

/// Networking holds the CIDRs the cluster requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Networking {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Provider {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<Worker>,
}

/// Worker is a pool of machines of one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Worker {
    pub name: String,
    pub machine: Machine,
    pub minimum: i32,
    pub maximum: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

impl Worker {
    pub fn new(name: &str, machine_type: &str, minimum: i32, maximum: i32) -> Self {
        Self {
            name: name.to_string(),
            machine: Machine {
                type_: machine_type.to_string(),
                image: None,
            },
            minimum,
            maximum,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Machine {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Volume is the root disk of the machines of a worker pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<Quantity>,
}

/// SeedSelector restricts the seeds a shoot may be scheduled to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedSelector {
    #[serde(flatten)]
    pub label_selector: LabelSelector,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provider_types: Vec<String>,
}

impl SeedSelector {
    /// Returns true if the selector accepts the given provider type. An empty
    /// list and the `*` entry accept every type.
    pub fn accepts_provider(&self, provider_type: &str) -> bool {
        self.provider_types.is_empty()
            || self
                .provider_types
                .iter()
                .any(|t| t == "*" || t == provider_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShootStatus {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub last_errors: Vec<LastError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,
}

/// LastError is an error recorded during the last operation on a shoot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LastError {
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<ErrorCode>,
}

/// ErrorCode classifies a last error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_INFRA_UNAUTHENTICATED")]
    InfraUnauthenticated,
    #[serde(rename = "ERR_INFRA_UNAUTHORIZED")]
    InfraUnauthorized,
    #[serde(rename = "ERR_INFRA_QUOTA_EXCEEDED")]
    InfraQuotaExceeded,
    #[serde(rename = "ERR_INFRA_RATE_LIMITS_EXCEEDED")]
    InfraRateLimitsExceeded,
    #[serde(rename = "ERR_INFRA_DEPENDENCIES")]
    InfraDependencies,
    #[serde(rename = "ERR_CLEANUP_CLUSTER_RESOURCES")]
    CleanupClusterResources,
    #[serde(rename = "ERR_CONFIGURATION_PROBLEM")]
    ConfigurationProblem,
    #[serde(rename = "ERR_RETRYABLE_CONFIGURATION_PROBLEM")]
    RetryableConfigurationProblem,
    #[serde(rename = "ERR_PROBLEMATIC_WEBHOOK")]
    ProblematicWebhook,
}

impl Shoot {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            ..Default::default()
        }
    }

    /// Name of the cloud profile the shoot uses, preferring the typed
    /// reference over the legacy name field.
    pub fn cloud_profile_reference(&self) -> Option<CloudProfileReference> {
        if let Some(reference) = &self.spec.cloud_profile {
            return Some(reference.clone());
        }
        self.spec
            .cloud_profile_name
            .as_deref()
            .map(CloudProfileReference::cloud_profile)
    }

    pub fn nginx_ingress_enabled(&self) -> bool {
        self.spec
            .addons
            .as_ref()
            .and_then(|a| a.nginx_ingress.as_ref())
            .map(|n| n.enabled)
            .unwrap_or(false)
    }

    pub fn vpa_enabled(&self) -> bool {
        self.spec
            .kubernetes
            .vertical_pod_autoscaler
            .as_ref()
            .map(|v| v.enabled)
            .unwrap_or(false)
    }

    pub fn nodes_cidr(&self) -> Option<&str> {
        self.spec.networking.as_ref().and_then(|n| n.nodes.as_deref())
    }

    pub fn dns_domain(&self) -> Option<&str> {
        self.spec.dns.as_ref().and_then(|d| d.domain.as_deref())
    }

    /// The primary DNS provider, or the only one if none is marked primary.
    pub fn primary_dns_provider(&self) -> Option<&DnsProvider> {
        let providers = &self.spec.dns.as_ref()?.providers;
        providers
            .iter()
            .find(|p| p.primary == Some(true))
            .or_else(|| if providers.len() == 1 { providers.first() } else { None })
    }

    /// All zones used by any worker pool.
    pub fn worker_zones(&self) -> BTreeSet<&str> {
        self.spec
            .provider
            .workers
            .iter()
            .flat_map(|w| w.zones.iter().map(String::as_str))
            .collect()
    }

    pub fn has_error_code(&self, codes: &[ErrorCode]) -> bool {
        self.status
            .as_ref()
            .map(|s| {
                s.last_errors
                    .iter()
                    .any(|e| e.codes.iter().any(|c| codes.contains(c)))
            })
            .unwrap_or(false)
    }
}
