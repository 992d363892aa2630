// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ShootTolerationRestriction admission controller.
//!
//! On creation the default tolerations of the global configuration and of the
//! shoot's project are merged into the shoot; keys already present are kept.
//! On creation and update every new or changed toleration must be permitted by
//! the global or the project allowlist.

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    PluginContext, Plugins, Readiness, ValidationInterface,
};
use crate::api::core::Toleration;
use crate::api::{Object, ResourceKind};
use crate::config::load_plugin_config;
use crate::lookup::{Listers, Lookup};
use crate::policy::tolerations::{changed_tolerations, merge_defaults, validate_against_allowlist};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for ShootTolerationRestriction admission controller.
pub const PLUGIN_NAME: &str = "ShootTolerationRestriction";

const TOLERATIONS_PATH: &str = "spec.tolerations";

/// Register the ShootTolerationRestriction plugin.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |config: Option<&mut dyn Read>, context: &PluginContext| {
        let configuration: Configuration = load_plugin_config(PLUGIN_NAME, config)?;
        Ok(Arc::new(Plugin::new(context).with_config(configuration)) as Arc<dyn Interface>)
    });
}

/// Global toleration policy. Project policies are appended to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Default tolerations added to every new shoot.
    pub defaults: Vec<Toleration>,
    /// Tolerations shoots are allowed to carry.
    pub whitelist: Vec<Toleration>,
}

/// ShootTolerationRestriction plugin.
pub struct Plugin {
    handler: Handler,
    config: Configuration,
    lookup: Arc<dyn Lookup>,
    readiness: Readiness,
}

impl Plugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            handler: Handler::new_create_update(&[ResourceKind::Shoot]),
            config: Configuration::default(),
            lookup: context.lookup.clone(),
            readiness: context.readiness.clone(),
        }
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Global then project allowlist.
    fn allowlist(&self, namespace: &str) -> AdmissionResult<Vec<Toleration>> {
        let project = self.lookup.project_for_namespace(namespace)?;
        Ok(self
            .config
            .whitelist
            .iter()
            .chain(project.toleration_whitelist())
            .cloned()
            .collect())
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
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let project = self.lookup.project_for_namespace(attributes.get_namespace())?;

        let shoot = match attributes.get_object_mut().and_then(Object::as_shoot_mut) {
            Some(shoot) => shoot,
            None => return Ok(()),
        };

        let merged = merge_defaults(
            &shoot.spec.tolerations,
            &[&self.config.defaults, project.default_tolerations()],
        );
        if merged.len() != shoot.spec.tolerations.len() {
            debug!(
                plugin = PLUGIN_NAME,
                namespace = %shoot.metadata.namespace,
                name = %shoot.metadata.name,
                added = merged.len() - shoot.spec.tolerations.len(),
                "added default tolerations"
            );
        }
        shoot.spec.tolerations = merged;
        Ok(())
    }
}

impl ValidationInterface for Plugin {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        if !self.handler.applies_to(attributes) {
            return Ok(());
        }
        self.readiness.ensure_ready(PLUGIN_NAME)?;

        let shoot = match attributes.get_object().and_then(Object::as_shoot) {
            Some(shoot) => shoot,
            None => return Ok(()),
        };

        let old = attributes.get_old_object().and_then(Object::as_shoot);
        let candidates = match (attributes.get_operation(), old) {
            (Operation::Update, Some(old)) => {
                changed_tolerations(&shoot.spec.tolerations, &old.spec.tolerations)
            }
            _ => shoot.spec.tolerations.iter().enumerate().collect(),
        };
        if candidates.is_empty() {
            return Ok(());
        }

        let allowlist = self.allowlist(attributes.get_namespace())?;
        let errors = validate_against_allowlist(candidates, &allowlist, TOLERATIONS_PATH);
        if errors.is_empty() {
            return Ok(());
        }

        debug!(
            plugin = PLUGIN_NAME,
            namespace = attributes.get_namespace(),
            name = attributes.get_name(),
            rejected = errors.len(),
            "tolerations not allowed"
        );
        Err(AdmissionError::forbidden_fields(
            attributes.get_name(),
            attributes.get_namespace(),
            ResourceKind::Shoot.resource(),
            errors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{AttributesRecord, UserInfo};
    use crate::api::core::{Project, ProjectTolerations, Shoot};
    use crate::lookup::InMemoryStore;

    fn t(key: &str) -> Toleration {
        Toleration::new(key)
    }

    fn tv(key: &str, value: &str) -> Toleration {
        Toleration::with_value(key, value)
    }

    fn store_with_project(tolerations: Option<ProjectTolerations>) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let mut project = Project::new("dev", "garden-dev");
        project.spec.tolerations = tolerations;
        store.add(project);
        store
    }

    fn shoot(tolerations: Vec<Toleration>) -> Shoot {
        let mut shoot = Shoot::new("garden-dev", "sh");
        shoot.spec.tolerations = tolerations;
        shoot
    }

    fn create(shoot: Shoot) -> AttributesRecord {
        AttributesRecord::for_object(Operation::Create, shoot, None, UserInfo::new("alice"))
    }

    fn update(shoot: Shoot, old: Shoot) -> AttributesRecord {
        AttributesRecord::for_object(Operation::Update, shoot, Some(old.into()), UserInfo::new("alice"))
    }

    #[test]
    fn test_handles() {
        let plugin = Plugin::default();
        assert!(plugin.handles(Operation::Create));
        assert!(plugin.handles(Operation::Update));
        assert!(!plugin.handles(Operation::Delete));
    }

    #[test]
    fn test_plugin_registration() {
        let plugins = Plugins::new();
        register(&plugins);
        assert!(plugins.is_registered(PLUGIN_NAME));
    }

    #[test]
    fn test_registration_decodes_configuration() {
        let plugins = Plugins::new();
        register(&plugins);
        let mut reader = "defaults:\n- key: foo\nwhitelist:\n- key: foo\n".as_bytes();
        let plugin = plugins
            .new_from_plugins(PLUGIN_NAME, Some(&mut reader), &PluginContext::default())
            .unwrap();
        assert!(plugin.as_mutation().is_some());

        let mut broken = "defaults: {".as_bytes();
        let result = plugins.new_from_plugins(PLUGIN_NAME, Some(&mut broken), &PluginContext::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_admit_merges_global_then_project_defaults() {
        let store = store_with_project(Some(ProjectTolerations {
            defaults: vec![t("bar"), tv("baz", "foo")],
            whitelist: Vec::new(),
        }));
        let plugin = Plugin::new(&PluginContext::for_store(store)).with_config(Configuration {
            defaults: vec![t("foo")],
            whitelist: Vec::new(),
        });

        let mut attrs = create(shoot(vec![t("baz")]));
        plugin.admit(&mut attrs).unwrap();
        assert_eq!(
            attrs.shoot().unwrap().spec.tolerations,
            vec![t("baz"), t("foo"), t("bar")]
        );
    }

    #[test]
    fn test_admit_ignores_update() {
        let store = store_with_project(None);
        let plugin = Plugin::new(&PluginContext::for_store(store)).with_config(Configuration {
            defaults: vec![t("foo")],
            whitelist: Vec::new(),
        });
        let mut attrs = update(shoot(Vec::new()), shoot(Vec::new()));
        plugin.admit(&mut attrs).unwrap();
        assert!(attrs.shoot().unwrap().spec.tolerations.is_empty());
    }

    #[test]
    fn test_admit_missing_project_is_internal() {
        let store = Arc::new(InMemoryStore::new());
        let plugin = Plugin::new(&PluginContext::for_store(store));
        let err = plugin.admit(&mut create(shoot(Vec::new()))).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_validate_create_against_combined_allowlist() {
        let store = store_with_project(Some(ProjectTolerations {
            defaults: Vec::new(),
            whitelist: vec![tv("bar", "1")],
        }));
        let plugin = Plugin::new(&PluginContext::for_store(store)).with_config(Configuration {
            defaults: Vec::new(),
            whitelist: vec![t("foo")],
        });

        plugin
            .validate(&create(shoot(vec![tv("foo", "any"), tv("bar", "1")])))
            .unwrap();

        let err = plugin
            .validate(&create(shoot(vec![t("foo"), tv("bar", "2"), t("baz")])))
            .unwrap_err();
        assert!(err.is_forbidden());
        let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["spec.tolerations[1]", "spec.tolerations[2]"]);
    }

    #[test]
    fn test_validate_update_only_checks_changed() {
        let store = store_with_project(None);
        let plugin = Plugin::new(&PluginContext::for_store(store)).with_config(Configuration {
            defaults: Vec::new(),
            whitelist: vec![t("a")],
        });

        let old = shoot(vec![t("a")]);
        let err = plugin
            .validate(&update(shoot(vec![t("a"), t("b")]), old.clone()))
            .unwrap_err();
        assert!(err.to_string().contains("spec.tolerations[1]"));

        plugin.validate(&update(old.clone(), old)).unwrap();
    }

    #[test]
    fn test_validate_keeps_legacy_tolerations_on_update() {
        let store = store_with_project(None);
        let plugin = Plugin::new(&PluginContext::for_store(store));
        let old = shoot(vec![t("legacy")]);
        plugin.validate(&update(old.clone(), old)).unwrap();
    }

    #[test]
    fn test_not_ready() {
        let store = Arc::new(InMemoryStore::unsynced());
        let plugin = Plugin::new(&PluginContext::for_store(store));
        let err = plugin.validate(&create(shoot(vec![t("a")]))).unwrap_err();
        assert!(err.is_not_ready());
        assert!(err.to_string().contains("not yet ready"));
    }

    #[test]
    fn test_ignores_other_kinds() {
        let plugin = Plugin::default();
        let attrs = AttributesRecord::for_object(
            Operation::Create,
            Project::new("dev", "garden-dev"),
            None,
            UserInfo::new("alice"),
        );
        plugin.validate(&attrs).unwrap();
    }
}
