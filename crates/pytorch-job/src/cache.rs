//! Shared read cache with publish-by-replace writes.
//!
//! Entries are immutable once published. Readers either borrow a snapshot
//! (`Arc<K>`) or check out their own deep copy to change; a writer makes its
//! change visible by publishing a whole new value under the key.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use kube::{Resource, ResourceExt};

use crate::isolation::DeepCopy;

pub struct JobCache<K> {
    entries: RwLock<BTreeMap<String, Arc<K>>>,
}

impl<K> Default for JobCache<K> {
    fn default() -> Self {
        JobCache {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K: Resource + DeepCopy> JobCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `namespace/name`, or just `name` for objects without a namespace.
    pub fn key_for(obj: &K) -> String {
        match obj.namespace() {
            Some(namespace) => format!("{namespace}/{}", obj.name_any()),
            None => obj.name_any(),
        }
    }

    pub fn snapshot(&self, key: &str) -> Option<Arc<K>> {
        self.read().get(key).cloned()
    }

    /// An owned copy the caller may change freely.
    pub fn checkout(&self, key: &str) -> Option<K> {
        self.snapshot(key).map(|obj| K::deep_copy(&obj))
    }

    /// Replaces the entry for `obj` in one step and returns what it replaced.
    pub fn publish(&self, obj: K) -> Option<Arc<K>> {
        let key = Self::key_for(&obj);
        self.write().insert(key, Arc::new(obj))
    }

    pub fn evict(&self, key: &str) -> Option<Arc<K>> {
        self.write().remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Entries are only ever swapped whole, so a poisoned lock still guards
    // a consistent map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<K>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<K>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
