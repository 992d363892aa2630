// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Typed accessors on top of [`Lookup`].

use super::{Lookup, LookupError};
use crate::api::core::{
    CloudProfile, CloudProfileReference, CloudProfileSpec, ExposureClass,
    NamespacedCloudProfile, Project, Quota, Seed, SecretBinding, Shoot,
};
use crate::api::meta::LabelSelector;
use crate::api::secret::Secret;
use crate::api::seedmanagement::ManagedSeed;
use crate::api::{Object, ResourceKind};

/// Listers adds typed getters to every [`Lookup`].
pub trait Listers: Lookup {
    /// Fetch one object and convert it to its concrete type.
    fn get_typed<T>(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<T, LookupError>
    where
        T: TryFrom<Object, Error = ResourceKind>,
    {
        let object = self.get(kind, namespace, name)?;
        T::try_from(object).map_err(|actual| LookupError::UnexpectedKind {
            expected: kind,
            actual,
        })
    }

    /// List objects and convert them to their concrete type.
    fn list_typed<T>(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> Result<Vec<T>, LookupError>
    where
        T: TryFrom<Object, Error = ResourceKind>,
    {
        self.list(kind, namespace, selector)?
            .into_iter()
            .map(|object| {
                T::try_from(object).map_err(|actual| LookupError::UnexpectedKind {
                    expected: kind,
                    actual,
                })
            })
            .collect()
    }

    fn shoot(&self, namespace: &str, name: &str) -> Result<Shoot, LookupError> {
        self.get_typed(ResourceKind::Shoot, namespace, name)
    }

    /// All shoots, or the shoots of one namespace.
    fn shoots(&self, namespace: Option<&str>) -> Result<Vec<Shoot>, LookupError> {
        self.list_typed(ResourceKind::Shoot, namespace, &LabelSelector::everything())
    }

    fn project(&self, name: &str) -> Result<Project, LookupError> {
        self.get_typed(ResourceKind::Project, "", name)
    }

    /// The project owning the given namespace.
    fn project_for_namespace(&self, namespace: &str) -> Result<Project, LookupError> {
        let projects: Vec<Project> =
            self.list_typed(ResourceKind::Project, None, &LabelSelector::everything())?;
        projects
            .into_iter()
            .find(|p| p.spec.namespace.as_deref() == Some(namespace))
            .ok_or_else(|| LookupError::not_found(ResourceKind::Project, "", namespace))
    }

    fn seed(&self, name: &str) -> Result<Seed, LookupError> {
        self.get_typed(ResourceKind::Seed, "", name)
    }

    fn seeds(&self) -> Result<Vec<Seed>, LookupError> {
        self.list_typed(ResourceKind::Seed, None, &LabelSelector::everything())
    }

    fn quota(&self, namespace: &str, name: &str) -> Result<Quota, LookupError> {
        self.get_typed(ResourceKind::Quota, namespace, name)
    }

    fn secret_binding(&self, namespace: &str, name: &str) -> Result<SecretBinding, LookupError> {
        self.get_typed(ResourceKind::SecretBinding, namespace, name)
    }

    fn secret_bindings(&self, namespace: Option<&str>) -> Result<Vec<SecretBinding>, LookupError> {
        self.list_typed(ResourceKind::SecretBinding, namespace, &LabelSelector::everything())
    }

    fn cloud_profile(&self, name: &str) -> Result<CloudProfile, LookupError> {
        self.get_typed(ResourceKind::CloudProfile, "", name)
    }

    fn namespaced_cloud_profile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<NamespacedCloudProfile, LookupError> {
        self.get_typed(ResourceKind::NamespacedCloudProfile, namespace, name)
    }

    /// Resolve a cloud profile reference to the effective catalog. A
    /// namespaced profile is resolved in the given namespace and merged with
    /// its parent.
    fn cloud_profile_spec(
        &self,
        namespace: &str,
        reference: &CloudProfileReference,
    ) -> Result<CloudProfileSpec, LookupError> {
        if !reference.is_namespaced() {
            return Ok(self.cloud_profile(&reference.name)?.spec);
        }
        let namespaced = self.namespaced_cloud_profile(namespace, &reference.name)?;
        let parent = self.cloud_profile(&namespaced.spec.parent.name)?;
        Ok(namespaced.effective_spec(&parent.spec))
    }

    fn exposure_class(&self, name: &str) -> Result<ExposureClass, LookupError> {
        self.get_typed(ResourceKind::ExposureClass, "", name)
    }

    fn managed_seeds(&self, namespace: &str) -> Result<Vec<ManagedSeed>, LookupError> {
        self.list_typed(
            ResourceKind::ManagedSeed,
            Some(namespace),
            &LabelSelector::everything(),
        )
    }

    fn secrets(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Secret>, LookupError> {
        self.list_typed(ResourceKind::Secret, Some(namespace), selector)
    }
}

impl<L: Lookup + ?Sized> Listers for L {}
