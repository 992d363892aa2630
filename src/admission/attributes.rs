// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Admission attributes that describe an admission request.

use super::interfaces::Operation;
use crate::api::core::{NamespacedCloudProfile, Project, Shoot};
use crate::api::seedmanagement::ManagedSeed;
use crate::api::{Object, ResourceKind};

/// GroupVersionResource identifies a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// The resource serving objects of the given kind.
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self::new(kind.group(), kind.version(), kind.resource())
    }

    /// Returns just the group and resource portion.
    pub fn group_resource(&self) -> GroupResource {
        GroupResource {
            group: self.group.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// GroupResource identifies a resource without version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            resource: resource.to_string(),
        }
    }
}

/// UserInfo describes the authenticated user issuing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            groups: Vec::new(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
}

/// Attributes is an interface used by AdmissionController to get information about a request
/// that is used to make an admission decision.
pub trait Attributes {
    /// Returns the name of the object as presented in the request.
    fn get_name(&self) -> &str;

    /// Returns the namespace associated with the request (if any).
    fn get_namespace(&self) -> &str;

    /// Returns the resource being requested.
    fn get_resource(&self) -> &GroupVersionResource;

    /// Returns the name of the subresource being requested.
    fn get_subresource(&self) -> &str;

    /// Returns the operation being performed.
    fn get_operation(&self) -> Operation;

    /// Returns the kind of object being manipulated.
    fn get_kind(&self) -> ResourceKind;

    /// Returns the object from the incoming request.
    fn get_object(&self) -> Option<&Object>;

    /// Returns the object as a mutable reference.
    fn get_object_mut(&mut self) -> Option<&mut Object>;

    /// Returns the existing object (only populated for UPDATE and DELETE requests).
    fn get_old_object(&self) -> Option<&Object>;

    /// Returns the user issuing the request.
    fn get_user_info(&self) -> &UserInfo;

    /// Check if this request is a dry run.
    fn is_dry_run(&self) -> bool;
}

/// AttributesRecord is a concrete implementation of Attributes.
#[derive(Debug, Clone)]
pub struct AttributesRecord {
    pub name: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub resource: GroupVersionResource,
    pub subresource: String,
    pub operation: Operation,
    pub object: Option<Object>,
    pub old_object: Option<Object>,
    pub user_info: UserInfo,
    pub dry_run: bool,
}

impl AttributesRecord {
    pub fn new(
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        operation: Operation,
        object: Option<Object>,
        old_object: Option<Object>,
        user_info: UserInfo,
    ) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            resource: GroupVersionResource::for_kind(kind),
            subresource: String::new(),
            operation,
            object,
            old_object,
            user_info,
            dry_run: false,
        }
    }

    /// Attributes for a request carrying an object; kind, namespace and name
    /// are taken from the object.
    pub fn for_object(
        operation: Operation,
        object: impl Into<Object>,
        old_object: Option<Object>,
        user_info: UserInfo,
    ) -> Self {
        let object = object.into();
        let (kind, namespace, name) = (
            object.kind(),
            object.namespace().to_string(),
            object.name().to_string(),
        );
        Self::new(kind, &namespace, &name, operation, Some(object), old_object, user_info)
    }

    /// Attributes for a DELETE request; the apiserver passes the stored
    /// object as the old object.
    pub fn for_delete(
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        stored: Option<Object>,
        user_info: UserInfo,
    ) -> Self {
        Self::new(kind, namespace, name, Operation::Delete, None, stored, user_info)
    }

    pub fn with_subresource(mut self, subresource: &str) -> Self {
        self.subresource = subresource.to_string();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn shoot(&self) -> Option<&Shoot> {
        self.object.as_ref().and_then(Object::as_shoot)
    }

    pub fn project(&self) -> Option<&Project> {
        self.object.as_ref().and_then(Object::as_project)
    }

    pub fn managed_seed(&self) -> Option<&ManagedSeed> {
        self.object.as_ref().and_then(Object::as_managed_seed)
    }

    pub fn namespaced_cloud_profile(&self) -> Option<&NamespacedCloudProfile> {
        self.object
            .as_ref()
            .and_then(Object::as_namespaced_cloud_profile)
    }
}

impl Attributes for AttributesRecord {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_namespace(&self) -> &str {
        &self.namespace
    }

    fn get_resource(&self) -> &GroupVersionResource {
        &self.resource
    }

    fn get_subresource(&self) -> &str {
        &self.subresource
    }

    fn get_operation(&self) -> Operation {
        self.operation
    }

    fn get_kind(&self) -> ResourceKind {
        self.kind
    }

    fn get_object(&self) -> Option<&Object> {
        self.object.as_ref()
    }

    fn get_object_mut(&mut self) -> Option<&mut Object> {
        self.object.as_mut()
    }

    fn get_old_object(&self) -> Option<&Object> {
        self.old_object.as_ref()
    }

    fn get_user_info(&self) -> &UserInfo {
        &self.user_info
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
