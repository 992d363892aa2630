// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ProjectValidator admission controller.
//!
//! Defaults the creator and the owner of new projects to the requesting user
//! and makes sure the project namespace is a garden namespace.

use crate::admission::errors::field_invalid;
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    PluginContext, Plugins, ValidationInterface,
};
use crate::api::core::{Subject, GARDEN_NAMESPACE, PROJECT_NAMESPACE_PREFIX};
use crate::api::{Object, ResourceKind};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ProjectValidator admission controller.
pub const PLUGIN_NAME: &str = "ProjectValidator";

/// Register the ProjectValidator plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, _context: &PluginContext| {
        Ok(Arc::new(Plugin::new()) as Arc<dyn Interface>)
    });
}

/// ProjectValidator plugin.
pub struct Plugin {
    handler: Handler,
}

impl Plugin {
    pub fn new() -> Self {
        Self {
            handler: Handler::new_create_update(&[ResourceKind::Project]),
        }
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

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        Some(self)
    }

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        Some(self)
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) || attributes.get_operation() != Operation::Create {
            return Ok(());
        }

        let user = attributes.get_user_info().name.clone();
        let project = match attributes.get_object_mut().and_then(Object::as_project_mut) {
            Some(project) => project,
            None => return Ok(()),
        };

        let created_by = project
            .spec
            .created_by
            .get_or_insert_with(|| Subject::user(&user))
            .clone();
        if project.spec.owner.is_none() {
            debug!(
                plugin = PLUGIN_NAME,
                name = %project.metadata.name,
                owner = %created_by.name,
                "defaulting project owner"
            );
            project.spec.owner = Some(created_by);
        }
        Ok(())
    }
}

impl ValidationInterface for Plugin {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        let project = match attributes.get_object().and_then(Object::as_project) {
            Some(project) => project,
            None => return Ok(()),
        };

        match project.spec.namespace.as_deref() {
            Some(namespace)
                if namespace != GARDEN_NAMESPACE
                    && !namespace.starts_with(PROJECT_NAMESPACE_PREFIX) =>
            {
                Err(AdmissionError::invalid(
                    ResourceKind::Project.kind(),
                    attributes.get_name(),
                    vec![field_invalid(
                        "spec.namespace",
                        namespace,
                        &format!(
                            "must be {:?} or start with {:?}",
                            GARDEN_NAMESPACE, PROJECT_NAMESPACE_PREFIX
                        ),
                    )],
                ))
            }
            _ => Ok(()),
        }
    }
}
