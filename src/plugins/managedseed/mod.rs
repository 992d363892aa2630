// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ManagedSeed admission controller.
//!
//! A ManagedSeed registers an existing shoot in the garden namespace as a
//! seed. The shoot has to be scheduled, run without the nginx ingress addon,
//! run with the vertical pod autoscaler and may back only one ManagedSeed.

use crate::admission::errors::{field_forbidden, field_invalid, field_required, FieldError};
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

/// Plugin name for ManagedSeed admission controller.
pub const PLUGIN_NAME: &str = "ManagedSeed";

const SHOOT_NAME_PATH: &str = "spec.shoot.name";

/// Register the ManagedSeed plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// Requirements a shoot has to meet to back a ManagedSeed.
pub fn shoot_errors(shoot: &Shoot) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if shoot.spec.seed_name.is_none() {
        errors.push(field_invalid(
            SHOOT_NAME_PATH,
            &shoot.metadata.name,
            "shoot is not yet scheduled to a seed",
        ));
    }
    if shoot.nginx_ingress_enabled() {
        errors.push(field_invalid(
            SHOOT_NAME_PATH,
            &shoot.metadata.name,
            "shoot ingress addon is not supported for managed seeds - use the managed seed ingress controller",
        ));
    }
    if !shoot.vpa_enabled() {
        errors.push(field_invalid(
            SHOOT_NAME_PATH,
            &shoot.metadata.name,
            "shoot VPA has to be enabled for managed seeds",
        ));
    }
    errors
}

/// ManagedSeed plugin.
pub struct Plugin {
    handler: Handler,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new_create_update(&[ResourceKind::ManagedSeed]),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
        }
    }

    fn validate_shoot(&self, managed_seed: &ManagedSeed, shoot_name: &str) -> AdmissionResult<Vec<FieldError>> {
        let shoot = match self.lookup.shoot(GARDEN_NAMESPACE, shoot_name) {
            Ok(shoot) => shoot,
            Err(LookupError::NotFound { .. }) => {
                return Ok(vec![field_invalid(
                    SHOOT_NAME_PATH,
                    shoot_name,
                    &format!("shoot {}/{} not found", GARDEN_NAMESPACE, shoot_name),
                )]);
            }
            Err(err) => return Err(err.into()),
        };
        let mut errors = shoot_errors(&shoot);

        let other = self
            .lookup
            .managed_seeds(GARDEN_NAMESPACE)?
            .into_iter()
            .find(|ms| ms.metadata.name != managed_seed.metadata.name && ms.shoot_name() == Some(shoot_name));
        if let Some(other) = other {
            errors.push(field_invalid(
                SHOOT_NAME_PATH,
                shoot_name,
                &format!("shoot is already registered as seed by managed seed {:?}", other.metadata.name),
            ));
        }
        Ok(errors)
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
        let managed_seed = match attributes.get_object().and_then(Object::as_managed_seed) {
            Some(managed_seed) => managed_seed,
            None => return Ok(()),
        };
        let invalid = |errors| {
            AdmissionError::invalid(ResourceKind::ManagedSeed.kind(), attributes.get_name(), errors)
        };

        if managed_seed.metadata.namespace != GARDEN_NAMESPACE {
            return Err(invalid(vec![field_invalid(
                "metadata.namespace",
                &managed_seed.metadata.namespace,
                &format!("namespace must be {:?}", GARDEN_NAMESPACE),
            )]));
        }
        let shoot_name = match managed_seed.shoot_name() {
            Some(name) => name,
            None => {
                return Err(invalid(vec![field_required(SHOOT_NAME_PATH, "shoot name is required")]));
            }
        };
        if let Some(old) = attributes.get_old_object().and_then(Object::as_managed_seed) {
            if old.shoot_name() != Some(shoot_name) {
                return Err(invalid(vec![field_forbidden(
                    SHOOT_NAME_PATH,
                    "field is immutable",
                )]));
            }
        }
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let errors = self.validate_shoot(managed_seed, shoot_name)?;
        if errors.is_empty() {
            return Ok(());
        }
        debug!(
            plugin = PLUGIN_NAME,
            name = attributes.get_name(),
            shoot = shoot_name,
            "managed seed rejected"
        );
        Err(invalid(errors))
    }
}
