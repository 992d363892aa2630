// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootSeedScheduling admission controller.
//!
//! Assigns a seed to new shoots that do not name one. The seed must be
//! eligible, match the shoot's cloud profile, seed selector, tolerations and
//! region, and have networks disjoint from the shoot's. The least loaded
//! candidate wins.

use crate::admission::errors::{field_invalid, field_required};
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    PluginContext, Plugins, Readiness,
};
use crate::api::core::Shoot;
use crate::api::{Object, ResourceKind};
use crate::config::load_plugin_config;
use crate::lookup::{Listers, Lookup, LookupError};
use crate::policy::scheduling::{
    seed_usage, select_seed, CandidateDeterminationStrategy, SchedulingError,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin name for ShootSeedScheduling admission controller.
pub const PLUGIN_NAME: &str = "ShootSeedScheduling";

/// Register the ShootSeedScheduling plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |config: Option<&mut dyn Read>, context: &PluginContext| {
        let configuration: Configuration = load_plugin_config(PLUGIN_NAME, config)?;
        Ok(Arc::new(Plugin::new(context).with_config(configuration)) as Arc<dyn Interface>)
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub candidate_determination_strategy: CandidateDeterminationStrategy,
}

/// ShootSeedScheduling plugin.
pub struct Plugin {
    handler: Handler,
    config: Configuration,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new(&[Operation::Create], &[ResourceKind::Shoot]),
            config: Configuration::default(),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
        }
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Name of the cloud profile seeds are registered with. Namespaced
    /// profiles resolve to their parent.
    fn cloud_profile_name(&self, shoot: &Shoot) -> AdmissionResult<String> {
        let invalid = |err| {
            AdmissionError::invalid(ResourceKind::Shoot.kind(), &shoot.metadata.name, vec![err])
        };
        let reference = shoot
            .cloud_profile_reference()
            .ok_or_else(|| invalid(field_required("spec.cloudProfile", "must reference a cloud profile")))?;
        if !reference.is_namespaced() {
            return Ok(reference.name);
        }
        match self
            .lookup
            .namespaced_cloud_profile(&shoot.metadata.namespace, &reference.name)
        {
            Ok(profile) => Ok(profile.spec.parent.name),
            Err(LookupError::NotFound { .. }) => Err(invalid(field_invalid(
                "spec.cloudProfile.name",
                &reference.name,
                "namespaced cloud profile not found",
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new(&PluginContext::default())
    }
}

impl Interface for Plugin {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        Some(self)
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        let shoot = match attributes.get_object().and_then(Object::as_shoot) {
            Some(shoot) if shoot.spec.seed_name.is_none() && !shoot.metadata.is_deleting() => shoot,
            _ => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let cloud_profile = self.cloud_profile_name(shoot)?;
        let seeds = self.lookup.seeds()?;
        let usage = seed_usage(&self.lookup.shoots(None)?);
        let strategy = self.config.candidate_determination_strategy;

        let seed_name = match select_seed(&seeds, shoot, &cloud_profile, &usage, strategy) {
            Ok(seed) => seed.name().to_string(),
            Err(SchedulingError::ShootNetwork(err)) => {
                return Err(AdmissionError::invalid(
                    ResourceKind::Shoot.kind(),
                    attributes.get_name(),
                    vec![field_invalid(
                        &format!("spec.networking.{}", err.field),
                        &err.value,
                        &err.reason,
                    )],
                ));
            }
            Err(err) => {
                debug!(
                    plugin = PLUGIN_NAME,
                    namespace = attributes.get_namespace(),
                    name = attributes.get_name(),
                    ?strategy,
                    %err,
                    "no seed found"
                );
                return Err(AdmissionError::forbidden_reason(
                    attributes.get_name(),
                    attributes.get_namespace(),
                    ResourceKind::Shoot.resource(),
                    format!("failed to determine a seed: {}", err),
                ));
            }
        };

        if let Some(shoot) = attributes.get_object_mut().and_then(Object::as_shoot_mut) {
            info!(
                plugin = PLUGIN_NAME,
                namespace = %shoot.metadata.namespace,
                name = %shoot.metadata.name,
                seed = %seed_name,
                "scheduled shoot"
            );
            shoot.spec.seed_name = Some(seed_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{AttributesRecord, UserInfo};
    use crate::api::core::{
        CloudProfileReference, NamespacedCloudProfile, Networking, Seed,
    };
    use crate::api::meta::ObjectMeta;
    use crate::lookup::InMemoryStore;

    fn seed(name: &str, region: &str) -> Seed {
        let mut seed = Seed::new(name, region, "aws");
        seed.spec.networks.pods = "10.0.0.0/16".to_string();
        seed.spec.networks.services = "10.1.0.0/16".to_string();
        seed
    }

    fn shoot(name: &str, region: &str) -> Shoot {
        let mut shoot = Shoot::new("garden-dev", name);
        shoot.spec.region = region.to_string();
        shoot.spec.cloud_profile_name = Some("aws".to_string());
        shoot
    }

    fn scheduled(name: &str, seed: &str) -> Shoot {
        let mut shoot = shoot(name, "eu-west-1");
        shoot.spec.seed_name = Some(seed.to_string());
        shoot
    }

    fn create(shoot: Shoot) -> AttributesRecord {
        AttributesRecord::for_object(Operation::Create, shoot, None, UserInfo::new("alice"))
    }

    fn plugin(store: Arc<InMemoryStore>, strategy: CandidateDeterminationStrategy) -> Plugin {
        Plugin::new(&PluginContext::for_store(store)).with_config(Configuration {
            candidate_determination_strategy: strategy,
        })
    }

    #[test]
    fn test_handles() {
        let plugin = Plugin::default();
        assert!(plugin.handles(Operation::Create));
        assert!(!plugin.handles(Operation::Update));
    }

    #[test]
    fn test_plugin_registration() {
        let plugins = Plugins::new();
        register(&plugins);
        assert!(plugins.is_registered(PLUGIN_NAME));
    }

    #[test]
    fn test_config_from_yaml() {
        let mut input = "candidateDeterminationStrategy: MinimalDistance\n".as_bytes();
        let config: Configuration =
            load_plugin_config(PLUGIN_NAME, Some(&mut input as &mut dyn Read)).unwrap();
        assert_eq!(
            config.candidate_determination_strategy,
            CandidateDeterminationStrategy::MinimalDistance
        );
    }

    #[test]
    fn test_picks_least_loaded_seed() {
        let store = Arc::new(InMemoryStore::new());
        store.add(seed("a", "eu-west-1"));
        store.add(seed("b", "eu-west-1"));
        store.add(scheduled("x", "a"));
        let plugin = plugin(store, CandidateDeterminationStrategy::SameRegion);

        let mut attrs = create(shoot("sh", "eu-west-1"));
        plugin.admit(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.seed_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_minimal_distance() {
        let store = Arc::new(InMemoryStore::new());
        store.add(seed("eu", "eu-west-2"));
        store.add(seed("us", "us-east-1"));

        let same_region = plugin(store.clone(), CandidateDeterminationStrategy::SameRegion);
        let err = same_region.admit(&mut create(shoot("sh", "eu-west-1"))).unwrap_err();
        assert!(err.is_forbidden());

        let minimal = plugin(store, CandidateDeterminationStrategy::MinimalDistance);
        let mut attrs = create(shoot("sh", "eu-west-1"));
        minimal.admit(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.seed_name.as_deref(), Some("eu"));
    }

    #[test]
    fn test_overlapping_networks_rejected() {
        let store = Arc::new(InMemoryStore::new());
        store.add(seed("a", "eu-west-1"));
        let plugin = plugin(store, CandidateDeterminationStrategy::SameRegion);
        let mut overlapping = shoot("sh", "eu-west-1");
        overlapping.spec.networking = Some(Networking {
            pods: Some("10.0.128.0/17".to_string()),
            ..Default::default()
        });
        let err = plugin.admit(&mut create(overlapping)).unwrap_err();
        assert!(err.to_string().contains("disjoint"));
    }

    #[test]
    fn test_invalid_cidr_is_invalid() {
        let store = Arc::new(InMemoryStore::new());
        store.add(seed("a", "eu-west-1"));
        let plugin = plugin(store, CandidateDeterminationStrategy::SameRegion);
        let mut broken = shoot("sh", "eu-west-1");
        broken.spec.networking = Some(Networking {
            nodes: Some("not-a-cidr".to_string()),
            ..Default::default()
        });
        let err = plugin.admit(&mut create(broken)).unwrap_err();
        assert!(err.is_invalid());
        assert!(err.to_string().contains("spec.networking.nodes"));
    }

    #[test]
    fn test_seed_with_invalid_networks_is_passed_over() {
        let store = Arc::new(InMemoryStore::new());
        let mut broken = seed("a", "eu-west-1");
        broken.spec.networks.pods = "not-a-cidr".to_string();
        store.add(broken);
        store.add(seed("b", "eu-west-1"));
        let plugin = plugin(store, CandidateDeterminationStrategy::SameRegion);

        let mut attrs = create(shoot("sh", "eu-west-1"));
        plugin.admit(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.seed_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_keeps_explicit_seed() {
        let plugin = Plugin::default();
        let mut attrs = create(scheduled("sh", "mine"));
        plugin.admit(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.seed_name.as_deref(), Some("mine"));
    }

    #[test]
    fn test_namespaced_cloud_profile_uses_parent() {
        let store = Arc::new(InMemoryStore::new());
        store.add(seed("a", "eu-west-1"));
        let mut profile = NamespacedCloudProfile {
            metadata: ObjectMeta::namespaced("garden-dev", "custom"),
            ..Default::default()
        };
        profile.spec.parent = CloudProfileReference::cloud_profile("aws");
        store.add(profile);
        let plugin = plugin(store, CandidateDeterminationStrategy::SameRegion);

        let mut namespaced = shoot("sh", "eu-west-1");
        namespaced.spec.cloud_profile_name = None;
        namespaced.spec.cloud_profile = Some(CloudProfileReference::namespaced("custom"));
        let mut attrs = create(namespaced);
        plugin.admit(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.seed_name.as_deref(), Some("a"));
    }

    #[test]
    fn test_missing_cloud_profile_reference() {
        let plugin = Plugin::default();
        let mut unreferenced = shoot("sh", "eu-west-1");
        unreferenced.spec.cloud_profile_name = None;
        let err = plugin.admit(&mut create(unreferenced)).unwrap_err();
        assert!(err.is_invalid());
    }
}
