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

//! Types of the `core.gardener.cloud` API group (Shoot, Seed, Project, ...).

mod cloudprofile;
mod exposureclass;
mod project;
mod quota;
mod seed;
mod shoot;

pub use cloudprofile::{
    CloudProfile, CloudProfileReference, CloudProfileSpec, ExpirableVersion, KubernetesSettings,
    MachineImage, MachineType, MachineTypeStorage, NamespacedCloudProfile,
    NamespacedCloudProfileSpec, NamespacedCloudProfileStatus, Region, VolumeType,
    KIND_CLOUD_PROFILE, KIND_NAMESPACED_CLOUD_PROFILE,
};
pub use exposureclass::{ExposureClass, ExposureClassScheduling};
pub use project::{
    Project, ProjectMember, ProjectSpec, ProjectTolerations, Subject, RBAC_API_GROUP,
    SERVICE_ACCOUNT_USERNAME_PREFIX, SUBJECT_KIND_GROUP, SUBJECT_KIND_SERVICE_ACCOUNT,
    SUBJECT_KIND_USER,
};
pub use quota::{Quota, QuotaMetric, QuotaScope, QuotaSpec, SecretBinding};
pub use seed::{
    Seed, SeedNetworks, SeedProvider, SeedSettingScheduling, SeedSettings, SeedSpec, SeedStatus,
    SeedTaint,
};
pub use shoot::{
    Addons, DnsProvider, ErrorCode, Kubernetes, LastError, Machine, Networking, NginxIngress,
    Provider, SeedSelector, Shoot, ShootDns, ShootSpec, ShootStatus, VerticalPodAutoscaler,
    Volume, Worker,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// API group of the core resources.
pub const GROUP_NAME: &str = "core.gardener.cloud";

// ============================================================================
// Constants
// ============================================================================

/// Namespace holding system-maintained objects (default domains, managed
/// seeds, protected shoots).
pub const GARDEN_NAMESPACE: &str = "garden";

/// Prefix every project namespace other than `garden` must carry.
pub const PROJECT_NAMESPACE_PREFIX: &str = "garden-";

/// Annotation that must be set to `true` before a resource may be deleted.
pub const ANNOTATION_CONFIRMATION_DELETION: &str = "confirmation.gardener.cloud/deletion";

/// Annotation requesting a forced deletion of a shoot.
pub const ANNOTATION_CONFIRMATION_FORCE_DELETION: &str =
    "confirmation.gardener.cloud/force-deletion";

/// Annotation holding the requested expiration time of a shoot (RFC 3339).
pub const ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP: &str = "shoot.gardener.cloud/expiration-timestamp";

/// Taint key marking a seed that only shoots in the garden namespace may use.
pub const SEED_TAINT_PROTECTED: &str = "seed.gardener.cloud/protected";

/// Condition type reporting that the gardenlet of a seed is ready.
pub const SEED_CONDITION_GARDENLET_READY: &str = "GardenletReady";

/// Label key carrying the role of a garden secret.
pub const LABEL_ROLE: &str = "gardener.cloud/role";

/// Role value of default domain secrets.
pub const ROLE_DEFAULT_DOMAIN: &str = "default-domain";

/// Annotation of a default domain secret naming the domain.
pub const ANNOTATION_DNS_DOMAIN: &str = "dns.gardener.cloud/domain";

/// Annotation of a default domain secret naming the DNS provider type.
pub const ANNOTATION_DNS_PROVIDER: &str = "dns.gardener.cloud/provider";

/// DNS provider type for shoots that manage their DNS records themselves.
pub const DNS_UNMANAGED: &str = "unmanaged";

// ============================================================================
// Toleration Types
// ============================================================================

/// Toleration is a key with an optional value. A shoot or project presents
/// tolerations to match taint-like restrictions; the same type is used for
/// allowlist entries, where an unset value acts as a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Toleration {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Toleration {
    /// Create a toleration without a value.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: None,
        }
    }

    /// Create a toleration with a value.
    pub fn with_value(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Returns true if this allowlist entry permits the given toleration:
    /// keys are equal and the entry either has no value or the same value.
    pub fn permits(&self, candidate: &Toleration) -> bool {
        self.key == candidate.key && (self.value.is_none() || self.value == candidate.value)
    }
}

impl fmt::Display for Toleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => f.write_str(&self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toleration_permits_wildcard() {
        let entry = Toleration::new("foo");
        assert!(entry.permits(&Toleration::new("foo")));
        assert!(entry.permits(&Toleration::with_value("foo", "bar")));
        assert!(!entry.permits(&Toleration::new("bar")));
    }

    #[test]
    fn test_toleration_permits_exact_value() {
        let entry = Toleration::with_value("foo", "bar");
        assert!(entry.permits(&Toleration::with_value("foo", "bar")));
        assert!(!entry.permits(&Toleration::with_value("foo", "baz")));
        assert!(!entry.permits(&Toleration::new("foo")));
    }

    #[test]
    fn test_toleration_display() {
        assert_eq!(Toleration::new("a").to_string(), "a");
        assert_eq!(Toleration::with_value("a", "b").to_string(), "a=b");
    }

    #[test]
    fn test_toleration_deserialize() {
        let t: Vec<Toleration> =
            serde_json::from_str(r#"[{"key":"a"},{"key":"b","value":"c"}]"#).unwrap();
        assert_eq!(t, vec![Toleration::new("a"), Toleration::with_value("b", "c")]);
    }
}
