// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ManagedSeedShoot admission controller.
//!
//! Shoots registered as seeds through a ManagedSeed cannot be deleted, and
//! updates must keep them usable as seeds.

use crate::admission::errors::{field_forbidden, FieldError};
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, Readiness, ValidationInterface,
};
use crate::api::core::{Shoot, GARDEN_NAMESPACE};
use crate::api::seedmanagement::ManagedSeed;
use crate::api::{Object, ResourceKind};
use crate::lookup::{Listers, Lookup, LookupError};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ManagedSeedShoot admission controller.
pub const PLUGIN_NAME: &str = "ManagedSeedShoot";

/// Register the ManagedSeedShoot plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// Field errors for an update of a shoot that backs a seed. `seed_zones` are
/// the zones registered in that seed.
pub fn update_errors(shoot: &Shoot, old: &Shoot, seed_zones: &[String]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if shoot.nginx_ingress_enabled() {
        errors.push(field_forbidden(
            "spec.addons.nginxIngress.enabled",
            "shoot ingress addon is not supported for managed seeds - use the managed seed ingress controller",
        ));
    }
    if !shoot.vpa_enabled() {
        errors.push(field_forbidden(
            "spec.kubernetes.verticalPodAutoscaler.enabled",
            "shoot VPA has to be enabled for managed seeds",
        ));
    }
    if shoot.nodes_cidr() != old.nodes_cidr() {
        errors.push(field_forbidden(
            "spec.networking.nodes",
            "field is immutable for shoots that are registered as seeds",
        ));
    }

    let zones = shoot.worker_zones();
    let mut removed: Vec<&str> = old
        .worker_zones()
        .into_iter()
        .filter(|z| !zones.contains(z) && seed_zones.iter().any(|s| s == z))
        .collect();
    removed.sort_unstable();
    if !removed.is_empty() {
        errors.push(field_forbidden(
            "spec.provider.workers",
            &format!(
                "shoot worker zones {:?} cannot be removed since they are registered in the seed",
                removed
            ),
        ));
    }
    errors
}

/// ManagedSeedShoot plugin.
pub struct Plugin {
    handler: Handler,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new(
                &[Operation::Update, Operation::Delete],
                &[ResourceKind::Shoot],
            ),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
        }
    }

    fn managed_seed_for(&self, shoot_name: &str) -> AdmissionResult<Option<ManagedSeed>> {
        Ok(self
            .lookup
            .managed_seeds(GARDEN_NAMESPACE)?
            .into_iter()
            .find(|ms| ms.shoot_name() == Some(shoot_name)))
    }

    /// Zones of the seed created from the ManagedSeed. A seed that does not
    /// exist yet has none.
    fn seed_zones(&self, managed_seed: &ManagedSeed) -> AdmissionResult<Vec<String>> {
        match self.lookup.seed(&managed_seed.metadata.name) {
            Ok(seed) => Ok(seed.spec.provider.zones),
            Err(LookupError::NotFound { .. }) => Ok(Vec::new()),
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

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        Some(self)
    }
}

impl ValidationInterface for Plugin {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) || attributes.get_namespace() != GARDEN_NAMESPACE {
            return Ok(());
        }
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let name = attributes.get_name();
        let managed_seed = match self.managed_seed_for(name)? {
            Some(managed_seed) => managed_seed,
            None => return Ok(()),
        };

        if attributes.get_operation() == Operation::Delete {
            return Err(AdmissionError::forbidden_reason(
                name,
                GARDEN_NAMESPACE,
                ResourceKind::Shoot.resource(),
                format!(
                    "cannot delete shoot {}/{} since it is still referenced by a managed seed",
                    GARDEN_NAMESPACE, name
                ),
            ));
        }

        let (shoot, old) = match (
            attributes.get_object().and_then(Object::as_shoot),
            attributes.get_old_object().and_then(Object::as_shoot),
        ) {
            (Some(shoot), Some(old)) => (shoot, old),
            _ => return Ok(()),
        };
        let errors = update_errors(shoot, old, &self.seed_zones(&managed_seed)?);
        if errors.is_empty() {
            return Ok(());
        }
        debug!(
            plugin = PLUGIN_NAME,
            name,
            managed_seed = %managed_seed.metadata.name,
            "update of seed shoot rejected"
        );
        Err(AdmissionError::forbidden_fields(
            name,
            GARDEN_NAMESPACE,
            ResourceKind::Shoot.resource(),
            errors,
        ))
    }
}
