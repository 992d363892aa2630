// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! CloudProfile and NamespacedCloudProfile: machine and volume catalogs.

use crate::api::meta::ObjectMeta;
use crate::api::quantity::Quantity;
use serde::{Deserialize, Serialize};

/// Kind of a plain cloud profile reference.
pub const KIND_CLOUD_PROFILE: &str = "CloudProfile";
/// Kind of a namespaced cloud profile reference.
pub const KIND_NAMESPACED_CLOUD_PROFILE: &str = "NamespacedCloudProfile";

/// CloudProfileReference points a shoot at a CloudProfile or at a
/// NamespacedCloudProfile in the shoot's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudProfileReference {
    pub kind: String,
    pub name: String,
}

impl CloudProfileReference {
    pub fn cloud_profile(name: &str) -> Self {
        Self {
            kind: KIND_CLOUD_PROFILE.to_string(),
            name: name.to_string(),
        }
    }

    pub fn namespaced(name: &str) -> Self {
        Self {
            kind: KIND_NAMESPACED_CLOUD_PROFILE.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.kind == KIND_NAMESPACED_CLOUD_PROFILE
    }
}

/// CloudProfile is a cluster-scoped catalog for one infrastructure provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudProfile {
    pub metadata: ObjectMeta,
    pub spec: CloudProfileSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudProfileSpec {
    #[serde(rename = "type")]
    pub type_: String,
    pub kubernetes: KubernetesSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub machine_types: Vec<MachineType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_types: Vec<VolumeType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

impl CloudProfileSpec {
    pub fn machine_type(&self, name: &str) -> Option<&MachineType> {
        self.machine_types.iter().find(|m| m.name == name)
    }

    pub fn volume_type(&self, name: &str) -> Option<&VolumeType> {
        self.volume_types.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubernetesSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<ExpirableVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpirableVersion {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineImage {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<ExpirableVersion>,
}

/// MachineType describes the resources of one machine flavour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineType {
    pub name: String,
    pub cpu: Quantity,
    pub gpu: Quantity,
    pub memory: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<MachineTypeStorage>,
}

impl MachineType {
    pub fn new(name: &str, cpu: Quantity, gpu: Quantity, memory: Quantity) -> Self {
        Self {
            name: name.to_string(),
            cpu,
            gpu,
            memory,
            storage: None,
        }
    }
}

/// MachineTypeStorage is the built-in disk of a machine type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineTypeStorage {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<Quantity>,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeType {
    pub name: String,
    pub class: String,
}

impl VolumeType {
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Region {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// NamespacedCloudProfile extends a parent CloudProfile for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespacedCloudProfile {
    pub metadata: ObjectMeta,
    pub spec: NamespacedCloudProfileSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NamespacedCloudProfileStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespacedCloudProfileSpec {
    pub parent: CloudProfileReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesSettings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub machine_types: Vec<MachineType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_types: Vec<VolumeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

/// The status carries the parent spec merged with the namespaced additions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespacedCloudProfileStatus {
    pub cloud_profile_spec: CloudProfileSpec,
}

impl NamespacedCloudProfile {
    /// Returns the merged spec when the status is already populated, or the
    /// parent spec extended with the namespaced machine and volume types.
    pub fn effective_spec(&self, parent: &CloudProfileSpec) -> CloudProfileSpec {
        if let Some(status) = &self.status {
            return status.cloud_profile_spec.clone();
        }
        let mut spec = parent.clone();
        for machine_type in &self.spec.machine_types {
            if spec.machine_type(&machine_type.name).is_none() {
                spec.machine_types.push(machine_type.clone());
            }
        }
        for volume_type in &self.spec.volume_types {
            if spec.volume_type(&volume_type.name).is_none() {
                spec.volume_types.push(volume_type.clone());
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_effective_spec_extends_parent() {
        let parent = CloudProfileSpec {
            type_: "aws".to_string(),
            machine_types: vec![MachineType::new("m5.large", q("2"), q("0"), q("8Gi"))],
            volume_types: vec![VolumeType::new("gp3", "standard")],
            ..Default::default()
        };
        let ncp = NamespacedCloudProfile {
            metadata: ObjectMeta::namespaced("garden-dev", "custom"),
            spec: NamespacedCloudProfileSpec {
                parent: CloudProfileReference::cloud_profile("aws"),
                machine_types: vec![MachineType::new("p3.xlarge", q("4"), q("1"), q("61Gi"))],
                ..Default::default()
            },
            status: None,
        };
        let spec = ncp.effective_spec(&parent);
        assert!(spec.machine_type("m5.large").is_some());
        assert!(spec.machine_type("p3.xlarge").is_some());
        assert_eq!(spec.volume_type("gp3").unwrap().class, "standard");
    }

    #[test]
    fn test_effective_spec_prefers_status() {
        let ncp = NamespacedCloudProfile {
            status: Some(NamespacedCloudProfileStatus {
                cloud_profile_spec: CloudProfileSpec {
                    type_: "merged".to_string(),
                    ..Default::default()
                },
            }),
            ..Default::default()
        };
        assert_eq!(ncp.effective_spec(&CloudProfileSpec::default()).type_, "merged");
    }
}
