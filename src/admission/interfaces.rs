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

//! Admission phases and the operations they are dispatched for.

use super::attributes::Attributes;
use super::errors::AdmissionResult;
use std::fmt;

/// Write operation of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        })
    }
}

/// A plugin held by the chain.
///
/// `handles` gates both phases. A plugin overrides `as_mutation` or
/// `as_validation` for each phase it takes part in; the chain calls nothing
/// else.
pub trait Interface: Send + Sync {
    fn handles(&self, operation: Operation) -> bool;

    fn as_mutation(&self) -> Option<&dyn MutationInterface> {
        None
    }

    fn as_validation(&self) -> Option<&dyn ValidationInterface> {
        None
    }
}

/// Defaulting phase. Runs before any validation and may rewrite the object.
pub trait MutationInterface: Interface {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()>;
}

/// Validation phase. Sees the object after every mutation has run.
pub trait ValidationInterface: Interface {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()>;
}
