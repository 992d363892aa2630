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

//! Gardener admission plugins
//!
//! Admission control for the Gardener API: toleration defaults and
//! allowlists, quota accounting, seed scheduling with network disjointness,
//! DNS domain defaulting and custom-verb authorization of protected fields.
//! Plugins read cluster state through [`lookup::Lookup`] and ask an
//! [`authorizer::Authorizer`] for custom verbs; both are injected through
//! [`admission::PluginContext`].

pub mod admission;
pub mod api;
pub mod authorizer;
pub mod config;
pub mod lookup;
pub mod plugins;
pub mod policy;

// Re-export commonly used types
pub use admission::{
    AdmissionError, AdmissionResult, Attributes, AttributesRecord, Chain, Handler, Interface,
    MutationInterface, Operation, PluginContext, Plugins, ValidationInterface,
};
pub use api::{Object, ResourceKind};
pub use lookup::{InMemoryStore, Lookup};
