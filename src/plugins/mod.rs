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

//! Admission plugins module.

pub mod customverbauthorizer;
pub mod deletionconfirmation;
pub mod managedseed;
pub mod managedseedshoot;
pub mod projectvalidator;
pub mod shootdns;
pub mod shootexposureclass;
pub mod shootforcedeletion;
pub mod shootquotavalidator;
pub mod shootseedscheduling;
pub mod shoottolerationrestriction;
pub mod shootvalidator;

use crate::admission::{Chain, PluginContext, Plugins};
use crate::config::{AdmissionConfiguration, ConfigError};

/// All ordered plugins in execution order.
///
/// Exposure classes are united into shoots before toleration defaults and
/// before scheduling, so that the scheduler sees the complete seed selector
/// and tolerations.
pub const ALL_ORDERED_PLUGINS: &[&str] = &[
    projectvalidator::PLUGIN_NAME,
    deletionconfirmation::PLUGIN_NAME,
    customverbauthorizer::PLUGIN_NAME,
    shootexposureclass::PLUGIN_NAME,
    shoottolerationrestriction::PLUGIN_NAME,
    shootdns::PLUGIN_NAME,
    shootseedscheduling::PLUGIN_NAME,
    shootvalidator::PLUGIN_NAME,
    shootforcedeletion::PLUGIN_NAME,
    managedseed::PLUGIN_NAME,
    managedseedshoot::PLUGIN_NAME,
    shootquotavalidator::PLUGIN_NAME,
];

/// Register all admission plugins.
pub fn register_all_admission_plugins(plugins: &Plugins) {
    customverbauthorizer::register(plugins);
    deletionconfirmation::register(plugins);
    managedseed::register(plugins);
    managedseedshoot::register(plugins);
    projectvalidator::register(plugins);
    shootdns::register(plugins);
    shootexposureclass::register(plugins);
    shootforcedeletion::register(plugins);
    shootquotavalidator::register(plugins);
    shootseedscheduling::register(plugins);
    shoottolerationrestriction::register(plugins);
    shootvalidator::register(plugins);
}

/// Build the chain of all plugins in their execution order, configured from
/// `configuration`.
pub fn new_admission_chain(
    configuration: &AdmissionConfiguration,
    context: &PluginContext,
) -> Result<Chain, ConfigError> {
    let plugins = Plugins::new();
    register_all_admission_plugins(&plugins);
    configuration.build_chain(&plugins, ALL_ORDERED_PLUGINS, context)
}
