// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Detection of changes to protected fields that need a custom verb.

use crate::api::core::{NamespacedCloudProfile, Project, ProjectMember, Subject, SUBJECT_KIND_USER};
use std::fmt;

/// Custom verbs checked against the authorizer in addition to the
/// regular create/update permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomVerb {
    ModifySpecTolerationsWhitelist,
    ManageMembers,
    ModifySpecKubernetes,
    ModifySpecMachineImages,
    ModifySpecProviderConfig,
}

impl CustomVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomVerb::ModifySpecTolerationsWhitelist => "modify-spec-tolerations-whitelist",
            CustomVerb::ManageMembers => "manage-members",
            CustomVerb::ModifySpecKubernetes => "modify-spec-kubernetes",
            CustomVerb::ModifySpecMachineImages => "modify-spec-machineimages",
            CustomVerb::ModifySpecProviderConfig => "modify-spec-providerconfig",
        }
    }
}

impl fmt::Display for CustomVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field whose modification is guarded by a custom verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedField {
    TolerationsWhitelist,
    Members,
    Owner,
    Kubernetes,
    MachineImages,
    ProviderConfig,
}

impl ProtectedField {
    pub fn verb(&self) -> CustomVerb {
        match self {
            ProtectedField::TolerationsWhitelist => CustomVerb::ModifySpecTolerationsWhitelist,
            ProtectedField::Members | ProtectedField::Owner => CustomVerb::ManageMembers,
            ProtectedField::Kubernetes => CustomVerb::ModifySpecKubernetes,
            ProtectedField::MachineImages => CustomVerb::ModifySpecMachineImages,
            ProtectedField::ProviderConfig => CustomVerb::ModifySpecProviderConfig,
        }
    }
}

/// Resources with protected fields.
///
/// `old` is `None` on create; `acting_user` is the name of the requesting user.
pub trait ProtectedResource {
    /// Fields checked for this resource, in evaluation order.
    const PROTECTED_FIELDS: &'static [ProtectedField];

    fn field_changed(field: ProtectedField, old: Option<&Self>, new: &Self, acting_user: &str) -> bool;
}

/// The verb needed to apply the change of a single field, if any.
pub fn requires_elevated_auth<R: ProtectedResource>(
    field: ProtectedField,
    old: Option<&R>,
    new: &R,
    acting_user: &str,
) -> Option<CustomVerb> {
    R::field_changed(field, old, new, acting_user).then(|| field.verb())
}

/// All verbs needed to apply the change, deduplicated, in field order.
pub fn custom_verbs<R: ProtectedResource>(old: Option<&R>, new: &R, acting_user: &str) -> Vec<CustomVerb> {
    let mut verbs = Vec::new();
    for field in R::PROTECTED_FIELDS {
        if let Some(verb) = requires_elevated_auth(*field, old, new, acting_user) {
            if !verbs.contains(&verb) {
                verbs.push(verb);
            }
        }
    }
    verbs
}

pub fn project_custom_verbs(old: Option<&Project>, new: &Project, acting_user: &str) -> Vec<CustomVerb> {
    custom_verbs(old, new, acting_user)
}

pub fn namespaced_cloud_profile_custom_verbs(
    old: Option<&NamespacedCloudProfile>,
    new: &NamespacedCloudProfile,
) -> Vec<CustomVerb> {
    custom_verbs(old, new, "")
}

fn is_user(subject: &Subject, name: &str) -> bool {
    subject.kind == SUBJECT_KIND_USER && subject.name == name
}

/// Human members other than the owner.
fn human_members<'a>(members: &'a [ProjectMember], owner: &Subject) -> Vec<&'a ProjectMember> {
    members
        .iter()
        .filter(|m| m.subject.is_human() && !same_subject(&m.subject, owner))
        .collect()
}

fn same_subject(a: &Subject, b: &Subject) -> bool {
    a.kind == b.kind && a.name == b.name && a.namespace == b.namespace
}

fn members_changed(old: &[&ProjectMember], new: &[&ProjectMember]) -> bool {
    old.len() != new.len() || new.iter().any(|m| !old.contains(m))
}

impl ProtectedResource for Project {
    const PROTECTED_FIELDS: &'static [ProtectedField] = &[
        ProtectedField::TolerationsWhitelist,
        ProtectedField::Members,
        ProtectedField::Owner,
    ];

    fn field_changed(field: ProtectedField, old: Option<&Self>, new: &Self, acting_user: &str) -> bool {
        match field {
            ProtectedField::TolerationsWhitelist => {
                let previous = old.map(|p| p.toleration_whitelist()).unwrap_or(&[]);
                previous != new.toleration_whitelist()
            }
            ProtectedField::Members => {
                let owner = match &new.spec.owner {
                    Some(owner) => owner,
                    None => return false,
                };
                if is_user(owner, acting_user) {
                    return false;
                }
                let previous = old.map(|p| p.spec.members.as_slice()).unwrap_or(&[]);
                members_changed(
                    &human_members(previous, owner),
                    &human_members(&new.spec.members, owner),
                )
            }
            ProtectedField::Owner => match old {
                Some(old) => old.spec.owner != new.spec.owner,
                None => new
                    .spec
                    .owner
                    .as_ref()
                    .is_some_and(|owner| !is_user(owner, acting_user)),
            },
            _ => false,
        }
    }
}

impl ProtectedResource for NamespacedCloudProfile {
    const PROTECTED_FIELDS: &'static [ProtectedField] = &[
        ProtectedField::Kubernetes,
        ProtectedField::MachineImages,
        ProtectedField::ProviderConfig,
    ];

    fn field_changed(field: ProtectedField, old: Option<&Self>, new: &Self, _acting_user: &str) -> bool {
        let old_spec = old.map(|p| &p.spec);
        match field {
            ProtectedField::Kubernetes => {
                old_spec.and_then(|s| s.kubernetes.as_ref()) != new.spec.kubernetes.as_ref()
            }
            ProtectedField::MachineImages => {
                old_spec.map(|s| s.machine_images.as_slice()).unwrap_or(&[])
                    != new.spec.machine_images.as_slice()
            }
            ProtectedField::ProviderConfig => {
                old_spec.and_then(|s| s.provider_config.as_ref()) != new.spec.provider_config.as_ref()
            }
            _ => false,
        }
    }
}
