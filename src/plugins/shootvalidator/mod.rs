// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootValidator admission controller.
//!
//! Validates shoots naming a seed explicitly: the seed must exist, protected
//! seeds are reserved for the garden namespace, seeds in deletion cannot be
//! newly targeted and the shoot networks must not overlap the seed networks.

use crate::admission::errors::{field_forbidden, field_invalid, FieldError};
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, Readiness, ValidationInterface,
};
use crate::api::core::{Seed, Shoot, GARDEN_NAMESPACE};
use crate::api::{Object, ResourceKind};
use crate::lookup::{Listers, Lookup, LookupError};
use crate::policy::network::overlapping_pairs;
use crate::policy::scheduling::{seed_networks, shoot_networks};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ShootValidator admission controller.
pub const PLUGIN_NAME: &str = "ShootValidator";

const SEED_NAME_PATH: &str = "spec.seedName";

/// Register the ShootValidator plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// Field errors for every shoot network overlapping a seed network.
pub fn network_overlap_errors(shoot: &Shoot, seed: &Seed) -> Result<Vec<FieldError>, FieldError> {
    let shoot_nets = shoot_networks(shoot)
        .map_err(|e| field_invalid(&format!("spec.networking.{}", e.field), &e.value, &e.reason))?;
    let seed_nets = seed_networks(seed).map_err(|e| {
        field_invalid(SEED_NAME_PATH, seed.name(), &format!("seed network is invalid: {}", e))
    })?;
    Ok(overlapping_pairs(&shoot_nets, &seed_nets)
        .into_iter()
        .map(|(shoot_net, seed_net)| {
            field_forbidden(
                &format!("spec.networking.{}", shoot_net.name),
                &format!(
                    "shoot {} network {} intersects with seed {} network {}",
                    shoot_net.name, shoot_net.net, seed_net.name, seed_net.net
                ),
            )
        })
        .collect())
}

fn networking_changed(shoot: &Shoot, old: Option<&Shoot>) -> bool {
    old.map_or(true, |old| old.spec.networking != shoot.spec.networking)
}

/// ShootValidator plugin.
pub struct Plugin {
    handler: Handler,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new_create_update(&[ResourceKind::Shoot]),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
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
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        let shoot = match attributes.get_object().and_then(Object::as_shoot) {
            Some(shoot) => shoot,
            None => return Ok(()),
        };
        let seed_name = match shoot.spec.seed_name.as_deref() {
            Some(name) => name,
            None => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let name = attributes.get_name();
        let namespace = attributes.get_namespace();
        let seed = match self.lookup.seed(seed_name) {
            Ok(seed) => seed,
            Err(LookupError::NotFound { .. }) => {
                return Err(AdmissionError::invalid(
                    ResourceKind::Shoot.kind(),
                    name,
                    vec![field_invalid(SEED_NAME_PATH, seed_name, "seed not found")],
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let old = attributes.get_old_object().and_then(Object::as_shoot);
        let seed_changed = old.map_or(true, |old| old.spec.seed_name != shoot.spec.seed_name);
        let mut errors = Vec::new();

        if seed_changed {
            if seed.is_protected() && namespace != GARDEN_NAMESPACE {
                errors.push(field_forbidden(
                    SEED_NAME_PATH,
                    &format!("forbidden to use a protected seed {:?}", seed_name),
                ));
            }
            if seed.is_deleting() {
                errors.push(field_forbidden(
                    SEED_NAME_PATH,
                    &format!("cannot schedule shoot on seed {:?} that is already marked for deletion", seed_name),
                ));
            }
        }

        if seed_changed || networking_changed(shoot, old) {
            match network_overlap_errors(shoot, &seed) {
                Ok(overlaps) => errors.extend(overlaps),
                Err(err) => {
                    return Err(AdmissionError::invalid(ResourceKind::Shoot.kind(), name, vec![err]));
                }
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        debug!(
            plugin = PLUGIN_NAME,
            namespace,
            name,
            seed = seed_name,
            errors = errors.len(),
            "shoot rejected for seed"
        );
        Err(AdmissionError::forbidden_fields(
            name,
            namespace,
            ResourceKind::Shoot.resource(),
            errors,
        ))
    }
}
