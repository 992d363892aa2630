// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! DeletionConfirmation admission controller.
//!
//! Shoots and projects may only be deleted once they carry the
//! `confirmation.gardener.cloud/deletion=true` annotation.

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, Readiness, ValidationInterface,
};
use crate::api::core::ANNOTATION_CONFIRMATION_DELETION;
use crate::api::meta::ObjectMeta;
use crate::api::{Object, ResourceKind};
use crate::lookup::{Lookup, LookupError};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for DeletionConfirmation admission controller.
pub const PLUGIN_NAME: &str = "DeletionConfirmation";

/// Register the DeletionConfirmation plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// Returns true if the object carries a deletion confirmation.
pub fn deletion_confirmed(metadata: &ObjectMeta) -> bool {
    metadata
        .annotation(ANNOTATION_CONFIRMATION_DELETION)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// DeletionConfirmation plugin.
pub struct Plugin {
    handler: Handler,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new(
                &[Operation::Delete],
                &[ResourceKind::Shoot, ResourceKind::Project],
            ),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
        }
    }

    /// The stored object, from the request or else from the cache.
    fn stored_object(&self, attributes: &dyn Attributes) -> Result<Option<Object>, LookupError> {
        if let Some(old) = attributes.get_old_object() {
            return Ok(Some(old.clone()));
        }
        match self.lookup.get(
            attributes.get_kind(),
            attributes.get_namespace(),
            attributes.get_name(),
        ) {
            Ok(object) => Ok(Some(object)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
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
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let object = match self.stored_object(attributes)? {
            Some(object) => object,
            None => {
                debug!(
                    plugin = PLUGIN_NAME,
                    namespace = attributes.get_namespace(),
                    name = attributes.get_name(),
                    "object to delete not found, nothing to confirm"
                );
                return Ok(());
            }
        };

        if deletion_confirmed(object.metadata()) {
            return Ok(());
        }
        Err(AdmissionError::forbidden_reason(
            attributes.get_name(),
            attributes.get_namespace(),
            attributes.get_resource().resource.as_str(),
            format!(
                "must have a {:?} annotation to delete",
                ANNOTATION_CONFIRMATION_DELETION
            ),
        ))
    }
}
