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

//! Admission controller interfaces and types.
//!
//! Operations, request attributes, the mutating and validating plugin traits,
//! the plugin registry and the ordered chain that dispatches to plugins.

pub mod attributes;
mod chain;
pub mod errors;
mod handler;
mod interfaces;
mod plugins;
mod readiness;

pub use attributes::{Attributes, AttributesRecord, UserInfo};
pub use chain::Chain;
pub use errors::{AdmissionError, AdmissionResult, FieldError, FieldErrorType};
pub use handler::Handler;
pub use interfaces::{Interface, MutationInterface, Operation, ValidationInterface};
pub use plugins::{Factory, PluginContext, Plugins};
pub use readiness::Readiness;
