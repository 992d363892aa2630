// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Ordered dispatch over a list of plugins.

use super::attributes::Attributes;
use super::errors::AdmissionResult;
use super::interfaces::Interface;
use std::sync::Arc;
use tracing::debug;

/// Chain runs every mutating phase in order, then every validating phase in
/// order. The first error stops the request.
#[derive(Default, Clone)]
pub struct Chain {
    plugins: Vec<(String, Arc<dyn Interface>)>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, plugin: Arc<dyn Interface>) {
        self.plugins.push((name.to_string(), plugin));
    }

    pub fn with(mut self, name: &str, plugin: Arc<dyn Interface>) -> Self {
        self.push(name, plugin);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run the mutating phase of every plugin that handles the operation.
    pub fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        let operation = attributes.get_operation();
        for (name, plugin) in &self.plugins {
            if !plugin.handles(operation) {
                continue;
            }
            if let Some(mutator) = plugin.as_mutation() {
                debug!(plugin = %name, %operation, "admit");
                mutator.admit(attributes)?;
            }
        }
        Ok(())
    }

    /// Run the validating phase of every plugin that handles the operation.
    pub fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        let operation = attributes.get_operation();
        for (name, plugin) in &self.plugins {
            if !plugin.handles(operation) {
                continue;
            }
            if let Some(validator) = plugin.as_validation() {
                debug!(plugin = %name, %operation, "validate");
                validator.validate(attributes)?;
            }
        }
        Ok(())
    }

    /// Run both phases.
    pub fn run(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        self.admit(attributes)?;
        self.validate(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::attributes::{AttributesRecord, UserInfo};
    use crate::admission::{
        AdmissionError, Handler, MutationInterface, Operation, ValidationInterface,
    };
    use crate::api::core::Shoot;
    use crate::api::{Object, ResourceKind};

    /// Appends its name to the shoot purpose on admit and requires a
    /// purpose on validate.
    struct Tagger {
        handler: Handler,
        tag: &'static str,
    }

    impl Interface for Tagger {
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

    impl MutationInterface for Tagger {
        fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
            if let Some(shoot) = attributes.get_object_mut().and_then(Object::as_shoot_mut) {
                let purpose = shoot.spec.purpose.get_or_insert_with(String::new);
                purpose.push_str(self.tag);
            }
            Ok(())
        }
    }

    impl ValidationInterface for Tagger {
        fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
            match attributes.get_object().and_then(Object::as_shoot) {
                Some(shoot) if shoot.spec.purpose.as_deref() == Some("ab") => Ok(()),
                _ => Err(AdmissionError::bad_request(format!("{} saw wrong purpose", self.tag))),
            }
        }
    }

    fn tagger(tag: &'static str) -> Arc<dyn Interface> {
        Arc::new(Tagger {
            handler: Handler::new_create_update(&[ResourceKind::Shoot]),
            tag,
        })
    }

    #[test]
    fn test_chain_runs_mutations_before_validations() {
        let chain = Chain::new().with("a", tagger("a")).with("b", tagger("b"));
        assert_eq!(chain.names(), vec!["a", "b"]);

        let mut attrs = AttributesRecord::for_object(
            Operation::Create,
            Shoot::new("garden-dev", "sh"),
            None,
            UserInfo::new("alice"),
        );
        chain.run(&mut attrs).unwrap();
        assert_eq!(attrs.shoot().unwrap().spec.purpose.as_deref(), Some("ab"));
    }

    #[test]
    fn test_chain_skips_unhandled_operations() {
        let chain = Chain::new().with("a", tagger("a"));
        let mut attrs = AttributesRecord::for_delete(
            ResourceKind::Shoot,
            "garden-dev",
            "sh",
            None,
            UserInfo::default(),
        );
        assert!(chain.run(&mut attrs).is_ok());
    }
}
