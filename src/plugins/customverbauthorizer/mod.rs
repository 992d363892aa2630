// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! CustomVerbAuthorizer admission controller.
//!
//! Changes to protected fields of projects (tolerations whitelist, members,
//! owner) and namespaced cloud profiles (kubernetes versions, machine images,
//! provider config) additionally require the requesting user to be allowed
//! a custom verb on the resource.

use crate::admission::attributes::GroupVersionResource;
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, PluginContext,
    Plugins, ValidationInterface,
};
use crate::api::{Object, ResourceKind};
use crate::authorizer::{Authorizer, AuthorizerAttributes, AuthorizerDecision};
use crate::policy::verbs::{namespaced_cloud_profile_custom_verbs, project_custom_verbs, CustomVerb};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};

/// Plugin name for CustomVerbAuthorizer admission controller.
pub const PLUGIN_NAME: &str = "CustomVerbAuthorizer";

/// Register the CustomVerbAuthorizer plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// CustomVerbAuthorizer plugin.
pub struct Plugin {
    handler: Handler,
    authorizer: Arc<dyn Authorizer>,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new_create_update(&[
                ResourceKind::Project,
                ResourceKind::NamespacedCloudProfile,
            ]),
            authorizer: context.authorizer.clone(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    fn required_verbs(&self, attributes: &dyn Attributes) -> Vec<CustomVerb> {
        let user = attributes.get_user_info().get_name();
        let object = attributes.get_object();
        let old = attributes.get_old_object();
        match attributes.get_kind() {
            ResourceKind::Project => match object.and_then(Object::as_project) {
                Some(project) => {
                    project_custom_verbs(old.and_then(Object::as_project), project, user)
                }
                None => Vec::new(),
            },
            ResourceKind::NamespacedCloudProfile => {
                match object.and_then(Object::as_namespaced_cloud_profile) {
                    Some(profile) => namespaced_cloud_profile_custom_verbs(
                        old.and_then(Object::as_namespaced_cloud_profile),
                        profile,
                    ),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Ask the authorizer for the verb. Only an explicit Allow passes.
    fn authorize(&self, attributes: &dyn Attributes, verb: CustomVerb) -> AdmissionResult<()> {
        let user = attributes.get_user_info();
        let attrs = AuthorizerAttributes::verb_check(
            user,
            verb.as_str(),
            &GroupVersionResource::for_kind(attributes.get_kind()),
            attributes.get_namespace(),
            attributes.get_name(),
        );

        let (decision, reason, err) = self.authorizer.authorize(&attrs);
        if decision == AuthorizerDecision::Allow && err.is_none() {
            debug!(plugin = PLUGIN_NAME, user = %user.name, %verb, "custom verb allowed");
            return Ok(());
        }

        let mut message = format!(
            "user {:?} is not allowed to {} for {} of {} {:?}",
            user.name,
            verb,
            attributes.get_operation(),
            attributes.get_kind(),
            attributes.get_name()
        );
        let mut details = Vec::new();
        if !reason.is_empty() {
            details.push(reason);
        }
        if let Some(err) = err {
            warn!(plugin = PLUGIN_NAME, %verb, error = %err, "authorizer failed");
            details.push(err);
        }
        if !details.is_empty() {
            message = format!("{}: {}", message, details.join(", "));
        }
        Err(AdmissionError::forbidden_reason(
            attributes.get_name(),
            attributes.get_namespace(),
            attributes.get_resource().resource.as_str(),
            message,
        ))
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
        for verb in self.required_verbs(attributes) {
            self.authorize(attributes, verb)?;
        }
        Ok(())
    }
}
