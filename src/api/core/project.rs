// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Project: a tenant with members, an owner and a namespace.

use super::Toleration;
use crate::api::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Subject kind of a single user.
pub const SUBJECT_KIND_USER: &str = "User";
/// Subject kind of a group.
pub const SUBJECT_KIND_GROUP: &str = "Group";
/// Subject kind of a service account.
pub const SUBJECT_KIND_SERVICE_ACCOUNT: &str = "ServiceAccount";
/// API group of user and group subjects.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
/// User names of service accounts start with this prefix.
pub const SERVICE_ACCOUNT_USERNAME_PREFIX: &str = "system:serviceaccount:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub metadata: ObjectMeta,
    pub spec: ProjectSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ProjectMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<ProjectTolerations>,
}

/// Subject identifies a user, group or service account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subject {
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_group: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl Subject {
    pub fn user(name: &str) -> Self {
        Self {
            kind: SUBJECT_KIND_USER.to_string(),
            api_group: RBAC_API_GROUP.to_string(),
            name: name.to_string(),
            namespace: String::new(),
        }
    }

    pub fn service_account(namespace: &str, name: &str) -> Self {
        Self {
            kind: SUBJECT_KIND_SERVICE_ACCOUNT.to_string(),
            api_group: String::new(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Service accounts, either as subjects of their own kind or as users
    /// carrying the service account name prefix, are never human.
    pub fn is_human(&self) -> bool {
        match self.kind.as_str() {
            SUBJECT_KIND_SERVICE_ACCOUNT => false,
            SUBJECT_KIND_USER => !self.name.starts_with(SERVICE_ACCOUNT_USERNAME_PREFIX),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectMember {
    #[serde(flatten)]
    pub subject: Subject,
    pub role: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl ProjectMember {
    pub fn new(subject: Subject, role: &str) -> Self {
        Self {
            subject,
            role: role.to_string(),
            roles: Vec::new(),
        }
    }
}

/// ProjectTolerations are the project-scoped toleration defaults and allowlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectTolerations {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<Toleration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<Toleration>,
}

impl Project {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            metadata: ObjectMeta::cluster(name),
            spec: ProjectSpec {
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn default_tolerations(&self) -> &[Toleration] {
        self.spec
            .tolerations
            .as_ref()
            .map(|t| t.defaults.as_slice())
            .unwrap_or(&[])
    }

    pub fn toleration_whitelist(&self) -> &[Toleration] {
        self.spec
            .tolerations
            .as_ref()
            .map(|t| t.whitelist.as_slice())
            .unwrap_or(&[])
    }
}
