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

//! Plugin configuration loading.
//!
//! Every plugin factory receives an optional reader with its configuration.
//! The content is YAML (JSON is accepted as well) and is decoded once, at
//! construction; plugins never re-read it.

use crate::admission::{AdmissionError, Chain, PluginContext, Plugins};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

/// Kind of the file listing plugin configurations.
pub const ADMISSION_CONFIGURATION_KIND: &str = "AdmissionConfiguration";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration of {plugin}: {source}")]
    Read {
        plugin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode configuration of {plugin}: {source}")]
    Decode {
        plugin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unexpected kind {0:?}, expected {ADMISSION_CONFIGURATION_KIND}")]
    UnexpectedKind(String),

    #[error("unknown admission plugin {0:?}")]
    UnknownPlugin(String),

    #[error("failed to initialize admission plugin {plugin}: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: AdmissionError,
    },
}

impl From<ConfigError> for AdmissionError {
    fn from(err: ConfigError) -> Self {
        AdmissionError::bad_request(err.to_string())
    }
}

/// Decode the configuration of `plugin` from `reader`. A missing reader or
/// blank content yields the default configuration.
pub fn load_plugin_config<T>(plugin: &str, reader: Option<&mut dyn Read>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let reader = match reader {
        Some(reader) => reader,
        None => return Ok(T::default()),
    };
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|source| ConfigError::Read {
            plugin: plugin.to_string(),
            source,
        })?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Decode {
        plugin: plugin.to_string(),
        source,
    })
}

/// AdmissionConfiguration lists the configuration of individual plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionConfiguration {
    pub api_version: String,
    pub kind: String,
    pub plugins: Vec<AdmissionPluginConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionPluginConfiguration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_yaml::Value>,
}

impl AdmissionConfiguration {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Decode {
                plugin: ADMISSION_CONFIGURATION_KIND.to_string(),
                source,
            })?;
        if !config.kind.is_empty() && config.kind != ADMISSION_CONFIGURATION_KIND {
            return Err(ConfigError::UnexpectedKind(config.kind));
        }
        Ok(config)
    }

    pub fn plugin_configuration(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.configuration.as_ref())
    }

    /// Instantiate the `enabled` plugins, in the given order, with their
    /// configuration from this file.
    pub fn build_chain(
        &self,
        plugins: &Plugins,
        enabled: &[&str],
        context: &PluginContext,
    ) -> Result<Chain, ConfigError> {
        let mut chain = Chain::new();
        for name in enabled {
            if !plugins.is_registered(name) {
                return Err(ConfigError::UnknownPlugin(name.to_string()));
            }
            let content = match self.plugin_configuration(name) {
                Some(value) => serde_yaml::to_string(value).map_err(|source| ConfigError::Decode {
                    plugin: name.to_string(),
                    source,
                })?,
                None => String::new(),
            };
            let mut reader = content.as_bytes();
            let plugin = plugins
                .new_from_plugins(name, Some(&mut reader), context)
                .map_err(|source| ConfigError::Plugin {
                    plugin: name.to_string(),
                    source,
                })?;
            chain.push(name, plugin);
        }
        tracing::info!(plugins = ?chain.names(), "admission chain built");
        Ok(chain)
    }
}
