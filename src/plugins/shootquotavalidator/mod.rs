// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootQuotaValidator admission controller.
//!
//! Shoots consume the quotas bound to their secret binding. A shoot is
//! rejected when its resource footprint together with the footprints of the
//! other shoots sharing a quota exceeds any limit of that quota, or when an
//! update extends its expiration beyond the quota's cluster lifetime.

use crate::admission::errors::{field_invalid, field_required, FieldError};
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, Readiness, ValidationInterface,
};
use crate::api::core::{
    Quota, QuotaScope, SecretBinding, Shoot, ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP,
};
use crate::api::{Object, ResourceKind};
use crate::lookup::{Listers, Lookup, LookupError};
use crate::policy::quota::{
    check_lifetime, check_quota, exceeded_message, footprint, min_cluster_lifetime_days,
    quota_consumers, quota_verification_needed, Footprint, LifetimeError,
};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin name for ShootQuotaValidator admission controller.
pub const PLUGIN_NAME: &str = "ShootQuotaValidator";

/// Register the ShootQuotaValidator plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// ShootQuotaValidator plugin.
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

    fn invalid(shoot: &Shoot, errors: Vec<FieldError>) -> AdmissionError {
        AdmissionError::invalid(ResourceKind::Shoot.kind(), &shoot.metadata.name, errors)
    }

    fn secret_binding(&self, shoot: &Shoot, name: &str) -> AdmissionResult<SecretBinding> {
        match self.lookup.secret_binding(&shoot.metadata.namespace, name) {
            Ok(binding) => Ok(binding),
            Err(LookupError::NotFound { .. }) => Err(Self::invalid(
                shoot,
                vec![field_invalid("spec.secretBindingName", name, "secret binding not found")],
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn quotas(&self, binding: &SecretBinding) -> AdmissionResult<Vec<Quota>> {
        binding
            .quotas
            .iter()
            .map(|reference| {
                self.lookup
                    .quota(&reference.namespace, &reference.name)
                    .map_err(AdmissionError::from)
            })
            .collect()
    }

    /// Footprint of the shoot under review. Its cloud profile and machine
    /// types are references chosen by the user.
    fn target_footprint(&self, shoot: &Shoot) -> AdmissionResult<Footprint> {
        let reference = shoot.cloud_profile_reference().ok_or_else(|| {
            Self::invalid(shoot, vec![field_required("spec.cloudProfile", "must reference a cloud profile")])
        })?;
        let spec = self
            .lookup
            .cloud_profile_spec(&shoot.metadata.namespace, &reference)
            .map_err(|err| match err {
                LookupError::NotFound { .. } => Self::invalid(
                    shoot,
                    vec![field_invalid("spec.cloudProfile.name", &reference.name, "cloud profile not found")],
                ),
                err => err.into(),
            })?;
        footprint(shoot, &spec).map_err(|err| {
            Self::invalid(
                shoot,
                vec![field_invalid("spec.provider.workers", &shoot.metadata.name, &err.to_string())],
            )
        })
    }

    /// Footprint of a shoot already admitted earlier.
    fn consumer_footprint(&self, shoot: &Shoot) -> AdmissionResult<Footprint> {
        let reference = shoot.cloud_profile_reference().ok_or_else(|| {
            AdmissionError::internal_error(format!(
                "shoot {}/{} has no cloud profile reference",
                shoot.metadata.namespace, shoot.metadata.name
            ))
        })?;
        let spec = self
            .lookup
            .cloud_profile_spec(&shoot.metadata.namespace, &reference)?;
        footprint(shoot, &spec).map_err(|err| {
            AdmissionError::internal_error(format!(
                "cannot compute footprint of shoot {}/{}: {}",
                shoot.metadata.namespace, shoot.metadata.name, err
            ))
        })
    }

    /// Footprints of the other shoots consuming `quota`.
    fn consumer_footprints(&self, quota: &Quota, shoot: &Shoot) -> AdmissionResult<Vec<Footprint>> {
        let bindings = match quota.scope() {
            Some(QuotaScope::Project) => self.lookup.secret_bindings(Some(&shoot.metadata.namespace))?,
            Some(QuotaScope::Secret) => self.lookup.secret_bindings(None)?,
            None => return Ok(Vec::new()),
        };
        let shoots = self.lookup.shoots(None)?;
        quota_consumers(quota, &bindings, &shoots, shoot)
            .into_iter()
            .map(|consumer| self.consumer_footprint(consumer))
            .collect()
    }

    fn check_lifetime(&self, shoot: &Shoot, old: &Shoot, quotas: &[Quota]) -> AdmissionResult<()> {
        let days = match min_cluster_lifetime_days(quotas) {
            Some(days) => days,
            None => return Ok(()),
        };
        match check_lifetime(shoot, old, days) {
            Ok(()) => Ok(()),
            Err(err @ LifetimeError::TooLong { .. }) => Err(AdmissionError::forbidden_reason(
                &shoot.metadata.name,
                &shoot.metadata.namespace,
                ResourceKind::Shoot.resource(),
                err.to_string(),
            )),
            Err(LifetimeError::InvalidTimestamp { value, reason }) => Err(Self::invalid(
                shoot,
                vec![field_invalid(
                    &format!("metadata.annotations[{}]", ANNOTATION_SHOOT_EXPIRATION_TIMESTAMP),
                    &value,
                    &reason,
                )],
            )),
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
            Some(shoot) if !shoot.metadata.is_deleting() => shoot,
            _ => return Ok(()),
        };
        let binding_name = match shoot.spec.secret_binding_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let binding = self.secret_binding(shoot, binding_name)?;
        let quotas = self.quotas(&binding)?;
        if quotas.is_empty() {
            return Ok(());
        }

        let old = attributes.get_old_object().and_then(Object::as_shoot);
        if let Some(old) = old {
            self.check_lifetime(shoot, old, &quotas)?;
            if !quota_verification_needed(shoot, old) {
                debug!(
                    plugin = PLUGIN_NAME,
                    namespace = %shoot.metadata.namespace,
                    name = %shoot.metadata.name,
                    "no quota relevant change"
                );
                return Ok(());
            }
        }

        let target = self.target_footprint(shoot)?;
        let mut usage = Vec::with_capacity(quotas.len());
        for quota in quotas {
            let others = self.consumer_footprints(&quota, shoot)?;
            usage.push((quota, others));
        }

        let exceeded = check_quota(&target, &usage);
        if exceeded.is_empty() {
            return Ok(());
        }
        info!(
            plugin = PLUGIN_NAME,
            namespace = %shoot.metadata.namespace,
            name = %shoot.metadata.name,
            binding = binding_name,
            exceeded = exceeded.len(),
            "quota exceeded"
        );
        Err(AdmissionError::forbidden_reason(
            &shoot.metadata.name,
            &shoot.metadata.namespace,
            ResourceKind::Shoot.resource(),
            exceeded_message(&exceeded),
        ))
    }
}
