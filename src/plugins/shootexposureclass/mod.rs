// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootExposureClass admission controller.
//!
//! Unites the scheduling constraints (seed selector and tolerations) of the
//! exposure class a new shoot references into the shoot. Conflicting label
//! requirements or tolerations reject the shoot.

use crate::admission::errors::{field_invalid, FieldError};
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    PluginContext, Plugins, Readiness,
};
use crate::api::core::{SeedSelector, Toleration};
use crate::api::{Object, ResourceKind};
use crate::lookup::{Listers, Lookup, LookupError};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ShootExposureClass admission controller.
pub const PLUGIN_NAME: &str = "ShootExposureClass";

/// Register the ShootExposureClass plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// Unite `other` into `selector`. Match labels with equal keys must carry
/// equal values; expressions and provider types are combined.
pub fn unite_seed_selectors(
    selector: &mut SeedSelector,
    other: &SeedSelector,
) -> Result<(), FieldError> {
    for (key, value) in &other.label_selector.match_labels {
        match selector.label_selector.match_labels.get(key) {
            Some(existing) if existing != value => {
                return Err(field_invalid(
                    &format!("spec.seedSelector.matchLabels[{}]", key),
                    existing,
                    &format!("conflicts with value {:?} of the exposure class", value),
                ));
            }
            Some(_) => {}
            None => {
                selector
                    .label_selector
                    .match_labels
                    .insert(key.clone(), value.clone());
            }
        }
    }
    for requirement in &other.label_selector.match_expressions {
        if !selector.label_selector.match_expressions.contains(requirement) {
            selector
                .label_selector
                .match_expressions
                .push(requirement.clone());
        }
    }
    for provider in &other.provider_types {
        if !selector.provider_types.contains(provider) {
            selector.provider_types.push(provider.clone());
        }
    }
    Ok(())
}

/// Append `other` to `tolerations`. A toleration with a key already present
/// must be identical to the present one, and is then not added again.
pub fn unite_tolerations(
    tolerations: &mut Vec<Toleration>,
    other: &[Toleration],
) -> Result<(), FieldError> {
    for toleration in other {
        match tolerations
            .iter()
            .position(|existing| existing.key == toleration.key)
        {
            Some(index) if tolerations[index] != *toleration => {
                return Err(field_invalid(
                    &format!("spec.tolerations[{}]", index),
                    &tolerations[index].to_string(),
                    &format!(
                        "conflicts with toleration {:?} of the exposure class",
                        toleration.to_string()
                    ),
                ));
            }
            Some(_) => {}
            None => tolerations.push(toleration.clone()),
        }
    }
    Ok(())
}

/// ShootExposureClass plugin.
pub struct Plugin {
    handler: Handler,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new(&[Operation::Create], &[ResourceKind::Shoot]),
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

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        Some(self)
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        let class_name = match attributes
            .get_object()
            .and_then(Object::as_shoot)
            .and_then(|s| s.spec.exposure_class_name.clone())
        {
            Some(name) => name,
            None => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let exposure_class = match self.lookup.exposure_class(&class_name) {
            Ok(class) => class,
            Err(err @ LookupError::NotFound { .. }) => {
                debug!(plugin = PLUGIN_NAME, exposure_class = %class_name, %err, "unknown exposure class");
                return Err(AdmissionError::not_found(
                    ResourceKind::ExposureClass.kind(),
                    class_name,
                ));
            }
            Err(err) => return Err(err.into()),
        };
        let scheduling = match exposure_class.scheduling {
            Some(scheduling) => scheduling,
            None => return Ok(()),
        };

        let name = attributes.get_name().to_string();
        let namespace = attributes.get_namespace().to_string();
        let shoot = match attributes.get_object_mut().and_then(Object::as_shoot_mut) {
            Some(shoot) => shoot,
            None => return Ok(()),
        };
        let forbidden = |err| {
            AdmissionError::forbidden(&name, &namespace, ResourceKind::Shoot.resource(), err)
        };

        if let Some(selector) = &scheduling.seed_selector {
            unite_seed_selectors(shoot.spec.seed_selector.get_or_insert_with(Default::default), selector)
                .map_err(forbidden)?;
        }
        unite_tolerations(&mut shoot.spec.tolerations, &scheduling.tolerations).map_err(forbidden)?;

        debug!(
            plugin = PLUGIN_NAME,
            %namespace,
            %name,
            exposure_class = %class_name,
            "united exposure class scheduling settings"
        );
        Ok(())
    }
}
