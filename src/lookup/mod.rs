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

//! Read-only object lookup used by the plugins.
//!
//! Plugins never talk to the API server directly. They read reference objects
//! (projects, seeds, quotas, cloud profiles, ...) through [`Lookup`], which is
//! backed by an informer-fed cache in production and by [`InMemoryStore`] in
//! tests. The cache may lag behind the API server.

mod listers;
mod store;

pub use listers::Listers;
pub use store::InMemoryStore;

use crate::admission::AdmissionError;
use crate::api::meta::LabelSelector;
use crate::api::{Object, ResourceKind};
use thiserror::Error;

/// LookupError is returned by [`Lookup`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} \"{name}\" not found")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    /// The backing cache cannot answer yet.
    #[error("lookup unavailable: {0}")]
    Unavailable(String),

    #[error("expected object of kind {expected}, got {actual}")]
    UnexpectedKind {
        expected: ResourceKind,
        actual: ResourceKind,
    },
}

impl LookupError {
    pub fn not_found(kind: ResourceKind, namespace: &str, name: &str) -> Self {
        LookupError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// Lookup failures default to the system-reference mapping: a missing
/// object is internal, an unavailable cache fails closed as not ready.
/// Plugins resolving user-supplied references map `NotFound` themselves.
impl From<LookupError> for AdmissionError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Unavailable(reason) => {
                tracing::debug!(%reason, "object lookup unavailable");
                AdmissionError::not_ready("object cache")
            }
            other => AdmissionError::internal_error(other.to_string()),
        }
    }
}

/// Lookup is the indexed object store the plugins read from.
pub trait Lookup: Send + Sync {
    /// Fetch one object. Cluster-scoped kinds ignore the namespace.
    fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Object, LookupError>;

    /// List objects of a kind, optionally restricted to one namespace,
    /// whose labels match the selector.
    fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> Result<Vec<Object>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_into_admission_error() {
        let err: AdmissionError = LookupError::Unavailable("cache not synced".into()).into();
        assert!(err.is_not_ready());

        let err: AdmissionError =
            LookupError::not_found(ResourceKind::Seed, "", "aws-eu1").into();
        assert!(err.is_internal());
        assert!(err.to_string().contains("Seed \"aws-eu1\" not found"));
    }
}
