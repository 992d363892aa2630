// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Secret metadata. Only labels and annotations of secrets matter to the
//! admission plugins, so the data is never carried.

use crate::api::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Secret {
    pub metadata: ObjectMeta,
}

impl Secret {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
        }
    }
}
