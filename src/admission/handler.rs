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

//! Base admission handler implementation.

use super::attributes::Attributes;
use super::interfaces::{Interface, Operation};
use crate::api::ResourceKind;
use std::collections::HashSet;

/// Handler is a base struct for admission plugins.
///
/// It answers `handles` for a fixed set of operations and, through
/// [`Handler::applies_to`], filters requests down to the resource kinds a
/// plugin is interested in. Subresource requests never apply.
#[derive(Debug, Clone)]
pub struct Handler {
    operations: HashSet<Operation>,
    kinds: HashSet<ResourceKind>,
}

impl Handler {
    /// Create a new Handler for the given operations on the given kinds.
    pub fn new(operations: &[Operation], kinds: &[ResourceKind]) -> Self {
        Self {
            operations: operations.iter().copied().collect(),
            kinds: kinds.iter().copied().collect(),
        }
    }

    /// Create a new Handler for Create and Update on the given kinds.
    pub fn new_create_update(kinds: &[ResourceKind]) -> Self {
        Self::new(&[Operation::Create, Operation::Update], kinds)
    }

    /// Returns true if the request targets one of the handled kinds (not a
    /// subresource) with a handled operation.
    pub fn applies_to(&self, attributes: &dyn Attributes) -> bool {
        self.operations.contains(&attributes.get_operation())
            && self.kinds.contains(&attributes.get_kind())
            && attributes.get_subresource().is_empty()
    }
}

impl Interface for Handler {
    fn handles(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}
