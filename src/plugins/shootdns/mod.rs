// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootDNS admission controller.
//!
//! New shoots without a DNS domain get `<shoot>.<project>.<default-domain>`
//! when the garden offers a default domain. Any shoot domain below a default
//! domain must follow that scheme.

use crate::admission::errors::field_invalid;
use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    PluginContext, Plugins, Readiness, ValidationInterface,
};
use crate::api::core::{
    Shoot, ShootDns, ANNOTATION_DNS_DOMAIN, ANNOTATION_DNS_PROVIDER, DNS_UNMANAGED,
    GARDEN_NAMESPACE, LABEL_ROLE, ROLE_DEFAULT_DOMAIN,
};
use crate::api::meta::LabelSelector;
use crate::api::{Object, ResourceKind};
use crate::lookup::{Listers, Lookup};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin name for ShootDNS admission controller.
pub const PLUGIN_NAME: &str = "ShootDNS";

const DOMAIN_PATH: &str = "spec.dns.domain";

/// Register the ShootDNS plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |_config: Option<&mut dyn Read>, context: &PluginContext| {
        Ok(Arc::new(Plugin::new(context)) as Arc<dyn Interface>)
    });
}

/// A default domain offered by the garden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultDomain {
    pub domain: String,
    pub provider: Option<String>,
}

/// The domain a shoot gets below the given default domain.
pub fn generated_domain(shoot: &str, project: &str, default_domain: &str) -> String {
    format!("{}.{}.{}", shoot, project, default_domain)
}

/// The default domain `domain` lies below, if any.
fn enclosing_default_domain<'a>(domain: &str, defaults: &'a [DefaultDomain]) -> Option<&'a DefaultDomain> {
    defaults.iter().find(|d| {
        domain == d.domain
            || domain
                .strip_suffix(d.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn primary_provider_type(shoot: &Shoot) -> Option<&str> {
    shoot
        .primary_dns_provider()
        .and_then(|p| p.type_.as_deref())
}

fn is_unmanaged(shoot: &Shoot) -> bool {
    primary_provider_type(shoot) == Some(DNS_UNMANAGED)
}

/// ShootDNS plugin.
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

    /// Default domains from the labelled secrets in the garden namespace,
    /// ordered by secret name.
    fn default_domains(&self) -> AdmissionResult<Vec<DefaultDomain>> {
        let selector = LabelSelector::from_labels([(LABEL_ROLE, ROLE_DEFAULT_DOMAIN)]);
        let mut secrets = self.lookup.secrets(GARDEN_NAMESPACE, &selector)?;
        secrets.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(secrets
            .iter()
            .filter_map(|secret| {
                let domain = secret.metadata.annotation(ANNOTATION_DNS_DOMAIN)?;
                Some(DefaultDomain {
                    domain: domain.to_string(),
                    provider: secret
                        .metadata
                        .annotation(ANNOTATION_DNS_PROVIDER)
                        .map(str::to_string),
                })
            })
            .collect())
    }

    fn project_name(&self, namespace: &str) -> AdmissionResult<String> {
        Ok(self.lookup.project_for_namespace(namespace)?.metadata.name)
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

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        Some(self)
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) || attributes.get_operation() != Operation::Create {
            return Ok(());
        }
        let provider_type = match attributes.get_object().and_then(Object::as_shoot) {
            Some(shoot) if shoot.dns_domain().is_none() && !is_unmanaged(shoot) => {
                primary_provider_type(shoot).map(str::to_string)
            }
            _ => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let project = self.project_name(attributes.get_namespace())?;
        let defaults = self.default_domains()?;
        let default = match defaults.iter().find(|d| match (&provider_type, &d.provider) {
            (Some(wanted), Some(offered)) => wanted == offered,
            _ => true,
        }) {
            Some(default) => default,
            None => {
                debug!(plugin = PLUGIN_NAME, "no default domain available, skipping");
                return Ok(());
            }
        };

        let shoot = match attributes.get_object_mut().and_then(Object::as_shoot_mut) {
            Some(shoot) => shoot,
            None => return Ok(()),
        };
        let domain = generated_domain(&shoot.metadata.name, &project, &default.domain);
        info!(
            plugin = PLUGIN_NAME,
            namespace = %shoot.metadata.namespace,
            name = %shoot.metadata.name,
            %domain,
            "defaulting shoot domain"
        );
        shoot.spec.dns.get_or_insert_with(ShootDns::default).domain = Some(domain);
        Ok(())
    }
}

impl ValidationInterface for Plugin {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        let shoot = match attributes.get_object().and_then(Object::as_shoot) {
            Some(shoot) if !is_unmanaged(shoot) && !shoot.metadata.is_deleting() => shoot,
            _ => return Ok(()),
        };
        let domain = match shoot.dns_domain() {
            Some(domain) => domain,
            None => return Ok(()),
        };
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let defaults = self.default_domains()?;
        let default = match enclosing_default_domain(domain, &defaults) {
            Some(default) => default,
            None => return Ok(()),
        };

        let project = self.project_name(attributes.get_namespace())?;
        let expected = generated_domain(&shoot.metadata.name, &project, &default.domain);
        if domain == expected {
            return Ok(());
        }
        Err(AdmissionError::forbidden(
            attributes.get_name(),
            attributes.get_namespace(),
            ResourceKind::Shoot.resource(),
            field_invalid(
                DOMAIN_PATH,
                domain,
                &format!(
                    "shoot uses a default domain but does not match expected scheme: <shoot-name>.<project-name>.<default-domain> (expected {:?})",
                    expected
                ),
            ),
        ))
    }
}
