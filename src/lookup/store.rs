// Copyright 2024 The Kubernetes Authors.
// Licensed under the Apache License, Version 2.0

//! Map-backed object store.

use super::{Lookup, LookupError};
use crate::admission::Readiness;
use crate::api::meta::LabelSelector;
use crate::api::{Object, ResourceKind};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Key = (ResourceKind, String, String);

/// InMemoryStore keeps objects keyed by kind, namespace and name.
///
/// It plays the role of an informer cache: the feeding side calls `add` and
/// `delete`, and `set_synced` once the initial listing is complete. Until
/// then every read fails with [`LookupError::Unavailable`].
#[derive(Debug)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<Key, Object>>,
    synced: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store that is already synced.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            synced: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create an empty store that has not completed its initial sync.
    pub fn unsynced() -> Self {
        let store = Self::new();
        store.set_synced(false);
        store
    }

    /// Create a synced store holding the given objects.
    pub fn with_objects(objects: impl IntoIterator<Item = Object>) -> Self {
        let store = Self::new();
        for object in objects {
            store.add(object);
        }
        store
    }

    fn key(kind: ResourceKind, namespace: &str, name: &str) -> Key {
        let namespace = if kind.is_namespaced() { namespace } else { "" };
        (kind, namespace.to_string(), name.to_string())
    }

    /// Insert or replace an object.
    pub fn add(&self, object: impl Into<Object>) {
        let object = object.into();
        let key = Self::key(object.kind(), object.namespace(), object.name());
        self.objects.write().insert(key, object);
    }

    pub fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<Object> {
        self.objects
            .write()
            .remove(&Self::key(kind, namespace, name))
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    /// A readiness capability that follows the sync state of this store.
    pub fn readiness(&self) -> Readiness {
        let synced = self.synced.clone();
        Readiness::from_fn(move || synced.load(Ordering::SeqCst))
    }

    fn check_synced(&self) -> Result<(), LookupError> {
        if self.is_synced() {
            Ok(())
        } else {
            Err(LookupError::Unavailable("cache not synced".to_string()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookup for InMemoryStore {
    fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Object, LookupError> {
        self.check_synced()?;
        self.objects
            .read()
            .get(&Self::key(kind, namespace, name))
            .cloned()
            .ok_or_else(|| LookupError::not_found(kind, namespace, name))
    }

    fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> Result<Vec<Object>, LookupError> {
        self.check_synced()?;
        let objects = self.objects.read();
        Ok(objects
            .iter()
            .filter(|((k, ns, _), _)| {
                *k == kind && namespace.map_or(true, |wanted| !kind.is_namespaced() || ns == wanted)
            })
            .map(|(_, object)| object)
            .filter(|object| selector.matches(&object.metadata().labels))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::core::{Project, Seed, Shoot};

    #[test]
    fn test_add_get_delete() {
        let store = InMemoryStore::new();
        store.add(Shoot::new("garden-dev", "sh"));

        let obj = store.get(ResourceKind::Shoot, "garden-dev", "sh").unwrap();
        assert_eq!(obj.name(), "sh");
        assert!(store
            .get(ResourceKind::Shoot, "garden-other", "sh")
            .unwrap_err()
            .is_not_found());

        assert!(store.delete(ResourceKind::Shoot, "garden-dev", "sh").is_some());
        assert!(store.get(ResourceKind::Shoot, "garden-dev", "sh").is_err());
    }

    #[test]
    fn test_cluster_scoped_ignores_namespace() {
        let store = InMemoryStore::with_objects([Seed::new("s1", "eu-west-1", "aws").into()]);
        assert!(store.get(ResourceKind::Seed, "garden-dev", "s1").is_ok());
        assert_eq!(
            store
                .list(ResourceKind::Seed, Some("garden-dev"), &LabelSelector::everything())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_list_filters_namespace_and_labels() {
        let store = InMemoryStore::new();
        let mut labelled = Shoot::new("garden-dev", "a");
        labelled
            .metadata
            .labels
            .insert("env".to_string(), "prod".to_string());
        store.add(labelled);
        store.add(Shoot::new("garden-dev", "b"));
        store.add(Shoot::new("garden-qa", "c"));
        store.add(Project::new("dev", "garden-dev"));

        let all = store
            .list(ResourceKind::Shoot, None, &LabelSelector::everything())
            .unwrap();
        assert_eq!(all.len(), 3);

        let dev = store
            .list(ResourceKind::Shoot, Some("garden-dev"), &LabelSelector::everything())
            .unwrap();
        assert_eq!(dev.len(), 2);

        let prod = store
            .list(ResourceKind::Shoot, None, &LabelSelector::from_labels([("env", "prod")]))
            .unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].name(), "a");
    }

    #[test]
    fn test_unsynced_store_is_unavailable() {
        let store = InMemoryStore::unsynced();
        let readiness = store.readiness();
        assert!(!readiness.is_ready());
        assert!(matches!(
            store.get(ResourceKind::Seed, "", "s1"),
            Err(LookupError::Unavailable(_))
        ));

        store.set_synced(true);
        assert!(readiness.is_ready());
        assert!(store.get(ResourceKind::Seed, "", "s1").unwrap_err().is_not_found());
    }
}
