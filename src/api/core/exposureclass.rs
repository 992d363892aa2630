// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! ExposureClass: a reusable bundle of scheduling constraints.

use super::shoot::SeedSelector;
use super::Toleration;
use crate::api::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExposureClass {
    pub metadata: ObjectMeta,
    pub handler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<ExposureClassScheduling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExposureClassScheduling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_selector: Option<SeedSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}
