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

//! Delegation of authorization decisions to an external authorizer.

use crate::admission::attributes::{GroupVersionResource, UserInfo};
use parking_lot::Mutex;

/// AuthorizerDecision is the result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizerDecision {
    /// Allow means the request is authorized.
    Allow,
    /// Deny means the request is denied.
    Deny,
    /// NoOpinion means the authorizer has no opinion.
    NoOpinion,
}

/// AuthorizerAttributes contains the attributes needed to make an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerAttributes {
    pub user: UserInfo,
    pub verb: String,
    pub namespace: String,
    pub api_group: String,
    pub api_version: String,
    pub resource: String,
    pub subresource: String,
    pub name: String,
    pub resource_request: bool,
}

impl AuthorizerAttributes {
    /// Attributes for checking a custom verb on a named resource.
    pub fn verb_check(
        user: &UserInfo,
        verb: &str,
        resource: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> Self {
        Self {
            user: user.clone(),
            verb: verb.to_string(),
            namespace: namespace.to_string(),
            api_group: resource.group.clone(),
            api_version: resource.version.clone(),
            resource: resource.resource.clone(),
            subresource: String::new(),
            name: name.to_string(),
            resource_request: true,
        }
    }
}

/// Authorizer makes authorization decisions.
///
/// Returns the decision, a human readable reason and an optional error. An
/// error means the decision could not be evaluated.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, attrs: &AuthorizerAttributes)
        -> (AuthorizerDecision, String, Option<String>);
}

/// AlwaysAllowAuthorizer always allows requests.
#[derive(Debug, Default)]
pub struct AlwaysAllowAuthorizer;

impl Authorizer for AlwaysAllowAuthorizer {
    fn authorize(
        &self,
        _attrs: &AuthorizerAttributes,
    ) -> (AuthorizerDecision, String, Option<String>) {
        (AuthorizerDecision::Allow, String::new(), None)
    }
}

/// AlwaysDenyAuthorizer always denies requests.
#[derive(Debug, Default)]
pub struct AlwaysDenyAuthorizer;

impl Authorizer for AlwaysDenyAuthorizer {
    fn authorize(
        &self,
        _attrs: &AuthorizerAttributes,
    ) -> (AuthorizerDecision, String, Option<String>) {
        (AuthorizerDecision::Deny, "always deny".to_string(), None)
    }
}

/// RecordingAuthorizer answers every request with a fixed decision and keeps
/// the attributes it was asked about.
#[derive(Debug)]
pub struct RecordingAuthorizer {
    decision: AuthorizerDecision,
    error: Option<String>,
    requests: Mutex<Vec<AuthorizerAttributes>>,
}

impl RecordingAuthorizer {
    pub fn new(decision: AuthorizerDecision) -> Self {
        Self {
            decision,
            error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An authorizer whose evaluation always fails.
    pub fn failing(error: &str) -> Self {
        Self {
            decision: AuthorizerDecision::NoOpinion,
            error: Some(error.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AuthorizerAttributes> {
        self.requests.lock().clone()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.verb.clone()).collect()
    }
}

impl Authorizer for RecordingAuthorizer {
    fn authorize(
        &self,
        attrs: &AuthorizerAttributes,
    ) -> (AuthorizerDecision, String, Option<String>) {
        self.requests.lock().push(attrs.clone());
        (self.decision, String::new(), self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceKind;

    fn projects() -> GroupVersionResource {
        GroupVersionResource::for_kind(ResourceKind::Project)
    }

    #[test]
    fn test_verb_check_attributes() {
        let attrs = AuthorizerAttributes::verb_check(
            &UserInfo::new("alice"),
            "manage-members",
            &projects(),
            "",
            "dev",
        );
        assert_eq!(attrs.user.name, "alice");
        assert_eq!(attrs.verb, "manage-members");
        assert_eq!(attrs.api_group, "core.gardener.cloud");
        assert_eq!(attrs.resource, "projects");
        assert_eq!(attrs.name, "dev");
        assert!(attrs.resource_request);
    }

    #[test]
    fn test_recording_authorizer() {
        let authorizer = RecordingAuthorizer::new(AuthorizerDecision::Deny);
        let attrs =
            AuthorizerAttributes::verb_check(&UserInfo::new("bob"), "x", &projects(), "", "dev");
        let (decision, _, err) = authorizer.authorize(&attrs);
        assert_eq!(decision, AuthorizerDecision::Deny);
        assert!(err.is_none());
        assert_eq!(authorizer.verbs(), vec!["x".to_string()]);
        assert_eq!(authorizer.requests()[0], attrs);
    }

    #[test]
    fn test_static_authorizers() {
        let attrs =
            AuthorizerAttributes::verb_check(&UserInfo::new("bob"), "x", &projects(), "", "dev");
        assert_eq!(AlwaysAllowAuthorizer.authorize(&attrs).0, AuthorizerDecision::Allow);
        assert_eq!(AlwaysDenyAuthorizer.authorize(&attrs).0, AuthorizerDecision::Deny);
        let (decision, _, err) = RecordingAuthorizer::failing("boom").authorize(&attrs);
        assert_eq!(decision, AuthorizerDecision::NoOpinion);
        assert_eq!(err.as_deref(), Some("boom"));
    }
}
