// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootForceDeletion admission controller.
//!
//! The force-deletion annotation may only be added to shoots that are already
//! being deleted and whose last errors show a problem that blocks a regular
//! deletion. Once set it cannot be removed.

use crate::admission::errors::field_forbidden;
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, ValidationInterface,
};
use crate::api::core::{ErrorCode, Shoot, ANNOTATION_CONFIRMATION_FORCE_DELETION};
use crate::api::meta::ObjectMeta;
use crate::api::{Object, ResourceKind};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ShootForceDeletion admission controller.
pub const PLUGIN_NAME: &str = "ShootForceDeletion";

/// Error codes that allow a shoot to be force-deleted.
pub const FORCE_DELETION_ERROR_CODES: &[ErrorCode] = &[
    ErrorCode::CleanupClusterResources,
    ErrorCode::ConfigurationProblem,
    ErrorCode::InfraDependencies,
    ErrorCode::InfraUnauthenticated,
    ErrorCode::InfraUnauthorized,
];

/// Register the ShootForceDeletion plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, _context: &PluginContext| {
        Ok(Arc::new(Plugin::new()) as Arc<dyn Interface>)
    });
}

/// Returns true if the object carries the force-deletion annotation set to true.
pub fn force_deletion_requested(metadata: &ObjectMeta) -> bool {
    metadata
        .annotation(ANNOTATION_CONFIRMATION_FORCE_DELETION)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn annotation_path() -> String {
    format!("metadata.annotations[{}]", ANNOTATION_CONFIRMATION_FORCE_DELETION)
}

/// ShootForceDeletion plugin.
pub struct Plugin {
    handler: Handler,
}

impl Plugin {
    pub fn new() -> Self {
        Self {
            handler: Handler::new_create_update(&[ResourceKind::Shoot]),
        }
    }

    fn check(&self, shoot: &Shoot, old: Option<&Shoot>) -> Result<(), String> {
        let requested = force_deletion_requested(&shoot.metadata);
        let old = match old {
            Some(old) => old,
            None if requested => {
                return Err("force-deletion annotation cannot be set when creating a shoot".to_string());
            }
            None => return Ok(()),
        };

        let was_requested = force_deletion_requested(&old.metadata);
        if was_requested && !requested {
            return Err("force-deletion annotation cannot be removed once set".to_string());
        }
        if !requested || was_requested {
            return Ok(());
        }

        if !shoot.metadata.is_deleting() {
            return Err("force-deletion annotation can only be set on a shoot that is being deleted".to_string());
        }
        if !shoot.has_error_code(FORCE_DELETION_ERROR_CODES) {
            return Err(
                "force-deletion annotation can only be set if the shoot status has one of the error codes ERR_CLEANUP_CLUSTER_RESOURCES, ERR_CONFIGURATION_PROBLEM, ERR_INFRA_DEPENDENCIES, ERR_INFRA_UNAUTHENTICATED, ERR_INFRA_UNAUTHORIZED"
                    .to_string(),
            );
        }
        Ok(())
    }
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new()
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
        let old = attributes.get_old_object().and_then(Object::as_shoot);

        self.check(shoot, old).map_err(|detail| {
            debug!(
                plugin = PLUGIN_NAME,
                namespace = attributes.get_namespace(),
                name = attributes.get_name(),
                %detail,
                "force deletion rejected"
            );
            AdmissionError::forbidden(
                attributes.get_name(),
                attributes.get_namespace(),
                ResourceKind::Shoot.resource(),
                field_forbidden(&annotation_path(), &detail),
            )
        })
    }
}
