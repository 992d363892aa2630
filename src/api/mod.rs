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

//! API types handled by the admission plugins.
//!
//! Every resource kind is a plain serde value. [`Object`] is the tagged union
//! passed through admission attributes and the lookup store, and
//! [`ResourceKind`] maps each variant to its group, version and plural
//! resource name.

pub mod core;
pub mod meta;
pub mod quantity;
pub mod secret;
pub mod seedmanagement;

use self::core::{
    CloudProfile, ExposureClass, NamespacedCloudProfile, Project, Quota, Seed, SecretBinding,
    Shoot,
};
use self::meta::ObjectMeta;
use self::secret::Secret;
use self::seedmanagement::ManagedSeed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ResourceKind enumerates the kinds the plugins know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Shoot,
    Project,
    Seed,
    Quota,
    SecretBinding,
    CloudProfile,
    NamespacedCloudProfile,
    ExposureClass,
    ManagedSeed,
    Secret,
}

impl ResourceKind {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceKind::Shoot => "Shoot",
            ResourceKind::Project => "Project",
            ResourceKind::Seed => "Seed",
            ResourceKind::Quota => "Quota",
            ResourceKind::SecretBinding => "SecretBinding",
            ResourceKind::CloudProfile => "CloudProfile",
            ResourceKind::NamespacedCloudProfile => "NamespacedCloudProfile",
            ResourceKind::ExposureClass => "ExposureClass",
            ResourceKind::ManagedSeed => "ManagedSeed",
            ResourceKind::Secret => "Secret",
        }
    }

    /// Plural resource name as used in request paths and authorization checks.
    pub fn resource(&self) -> &'static str {
        match self {
            ResourceKind::Shoot => "shoots",
            ResourceKind::Project => "projects",
            ResourceKind::Seed => "seeds",
            ResourceKind::Quota => "quotas",
            ResourceKind::SecretBinding => "secretbindings",
            ResourceKind::CloudProfile => "cloudprofiles",
            ResourceKind::NamespacedCloudProfile => "namespacedcloudprofiles",
            ResourceKind::ExposureClass => "exposureclasses",
            ResourceKind::ManagedSeed => "managedseeds",
            ResourceKind::Secret => "secrets",
        }
    }

    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::ManagedSeed => seedmanagement::GROUP_NAME,
            ResourceKind::Secret => "",
            _ => self::core::GROUP_NAME,
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            ResourceKind::ManagedSeed => "v1alpha1",
            ResourceKind::Secret => "v1",
            _ => "v1beta1",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Project
                | ResourceKind::Seed
                | ResourceKind::CloudProfile
                | ResourceKind::ExposureClass
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Object is any API object the plugins receive or look up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Shoot(Shoot),
    Project(Project),
    Seed(Seed),
    Quota(Quota),
    SecretBinding(SecretBinding),
    CloudProfile(CloudProfile),
    NamespacedCloudProfile(NamespacedCloudProfile),
    ExposureClass(ExposureClass),
    ManagedSeed(ManagedSeed),
    Secret(Secret),
}

macro_rules! object_variants {
    ($($variant:ident => $as_ref:ident, $as_mut:ident;)*) => {
        impl Object {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Object::$variant(_) => ResourceKind::$variant,)*
                }
            }

            pub fn metadata(&self) -> &ObjectMeta {
                match self {
                    $(Object::$variant(o) => &o.metadata,)*
                }
            }

            pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $(Object::$variant(o) => &mut o.metadata,)*
                }
            }

            $(
                pub fn $as_ref(&self) -> Option<&$variant> {
                    match self {
                        Object::$variant(o) => Some(o),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $variant> {
                    match self {
                        Object::$variant(o) => Some(o),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$variant> for Object {
                fn from(o: $variant) -> Self {
                    Object::$variant(o)
                }
            }

            impl TryFrom<Object> for $variant {
                type Error = ResourceKind;

                /// Fails with the actual kind of the object.
                fn try_from(o: Object) -> Result<Self, Self::Error> {
                    match o {
                        Object::$variant(v) => Ok(v),
                        other => Err(other.kind()),
                    }
                }
            }
        )*
    };
}

object_variants! {
    Shoot => as_shoot, as_shoot_mut;
    Project => as_project, as_project_mut;
    Seed => as_seed, as_seed_mut;
    Quota => as_quota, as_quota_mut;
    SecretBinding => as_secret_binding, as_secret_binding_mut;
    CloudProfile => as_cloud_profile, as_cloud_profile_mut;
    NamespacedCloudProfile => as_namespaced_cloud_profile, as_namespaced_cloud_profile_mut;
    ExposureClass => as_exposure_class, as_exposure_class_mut;
    ManagedSeed => as_managed_seed, as_managed_seed_mut;
    Secret => as_secret, as_secret_mut;
}

impl Object {
    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata().namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_and_accessors() {
        let mut obj = Object::from(Shoot::new("garden-dev", "sh"));
        assert_eq!(obj.kind(), ResourceKind::Shoot);
        assert_eq!(obj.name(), "sh");
        assert_eq!(obj.namespace(), "garden-dev");
        assert!(obj.as_shoot().is_some());
        assert!(obj.as_project().is_none());

        obj.as_shoot_mut().unwrap().spec.region = "eu-west-1".to_string();
        assert_eq!(obj.as_shoot().unwrap().spec.region, "eu-west-1");
    }

    #[test]
    fn test_try_from_wrong_kind() {
        let obj = Object::from(Project::new("dev", "garden-dev"));
        let err = Shoot::try_from(obj).unwrap_err();
        assert_eq!(err, ResourceKind::Project);
    }

    #[test]
    fn test_resource_kind_mapping() {
        assert_eq!(ResourceKind::Shoot.resource(), "shoots");
        assert_eq!(ResourceKind::Shoot.group(), "core.gardener.cloud");
        assert_eq!(ResourceKind::ManagedSeed.group(), "seedmanagement.gardener.cloud");
        assert_eq!(ResourceKind::Secret.group(), "");
        assert!(ResourceKind::Shoot.is_namespaced());
        assert!(!ResourceKind::Project.is_namespaced());
        assert!(!ResourceKind::Seed.is_namespaced());
    }

    #[test]
    fn test_object_deserialize_tagged() {
        let obj: Object = serde_json::from_str(
            r#"{"kind":"Seed","metadata":{"name":"s1"},"spec":{"provider":{"type":"aws","region":"eu-west-1"}}}"#,
        )
        .unwrap();
        assert_eq!(obj.kind(), ResourceKind::Seed);
        assert_eq!(obj.as_seed().unwrap().region(), "eu-west-1");
    }
}
