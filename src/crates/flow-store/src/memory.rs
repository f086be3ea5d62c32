//! In-memory value store — no persistence across process restarts.
//!
//! Useful for tests and for single-process runs where the caller doesn't
//! need the cache to survive a crash. Thread-safe (an `Arc<RwLock<...>>`
//! underneath, mirroring the teacher's `InMemoryStore`) though Flow itself
//! never calls it from more than one thread at a time.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::value_store::{Location, Lookup, NodeId, StoredEntry, ValueStore};

#[derive(Default)]
struct Inner {
    current: Option<Location>,
    data: HashMap<Location, HashMap<NodeId, StoredEntry>>,
}

/// Per-location in-memory cache of node outputs.
pub struct InMemoryValueStore {
    inner: RwLock<Inner>,
}

impl InMemoryValueStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of locations that have ever been written to.
    pub fn location_count(&self) -> usize {
        self.inner.read().unwrap().data.len()
    }
}

impl Default for InMemoryValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStore for InMemoryValueStore {
    fn bind(&self, location: Location) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.data.entry(location.clone()).or_default();
        inner.current = Some(location);
        Ok(())
    }

    fn lookup(&self, node_id: NodeId, fingerprint: &crate::value_store::Fingerprint) -> Result<Lookup> {
        let inner = self.inner.read().unwrap();
        let location = inner.current.as_ref().ok_or(StoreError::Unbound)?;
        let Some(entries) = inner.data.get(location) else {
            return Ok(Lookup::Miss);
        };
        match entries.get(&node_id) {
            Some(entry) if &entry.fingerprint == fingerprint => Ok(Lookup::Hit(entry.value.clone())),
            _ => Ok(Lookup::Miss),
        }
    }

    fn store(
        &self,
        node_id: NodeId,
        fingerprint: crate::value_store::Fingerprint,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let location = inner.current.clone().ok_or(StoreError::Unbound)?;
        inner
            .data
            .entry(location)
            .or_default()
            .insert(node_id, StoredEntry { fingerprint, value });
        Ok(())
    }

    fn forget(&self, node_id: NodeId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let location = inner.current.clone().ok_or(StoreError::Unbound)?;
        if let Some(entries) = inner.data.get_mut(&location) {
            entries.remove(&node_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_store::Fingerprint;
    use serde_json::json;

    #[test]
    fn miss_before_bind_is_unbound_error() {
        let store = InMemoryValueStore::new();
        let err = store.lookup(1, &Fingerprint::new("fp")).unwrap_err();
        assert!(matches!(err, StoreError::Unbound));
    }

    #[test]
    fn store_then_lookup_hits_on_matching_fingerprint() {
        let store = InMemoryValueStore::new();
        store.bind(Location::new("item-0")).unwrap();
        store.store(1, Fingerprint::new("fp-a"), json!(42)).unwrap();

        assert_eq!(
            store.lookup(1, &Fingerprint::new("fp-a")).unwrap(),
            Lookup::Hit(json!(42))
        );
        assert_eq!(store.lookup(1, &Fingerprint::new("fp-b")).unwrap(), Lookup::Miss);
    }

    #[test]
    fn locations_are_isolated() {
        let store = InMemoryValueStore::new();
        store.bind(Location::new("item-0")).unwrap();
        store.store(1, Fingerprint::new("fp"), json!("a")).unwrap();

        store.bind(Location::new("item-1")).unwrap();
        assert_eq!(store.lookup(1, &Fingerprint::new("fp")).unwrap(), Lookup::Miss);

        store.bind(Location::new("item-0")).unwrap();
        assert_eq!(
            store.lookup(1, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!("a"))
        );
    }

    #[test]
    fn forget_removes_only_the_named_entry() {
        let store = InMemoryValueStore::new();
        store.bind(Location::new("item-0")).unwrap();
        store.store(1, Fingerprint::new("fp"), json!(1)).unwrap();
        store.store(2, Fingerprint::new("fp"), json!(2)).unwrap();

        store.forget(1).unwrap();

        assert_eq!(store.lookup(1, &Fingerprint::new("fp")).unwrap(), Lookup::Miss);
        assert_eq!(
            store.lookup(2, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!(2))
        );
    }

    #[test]
    fn switching_locations_does_not_flush_prior_writes() {
        let store = InMemoryValueStore::new();
        store.bind(Location::new("a")).unwrap();
        store.store(1, Fingerprint::new("fp"), json!("a-value")).unwrap();
        store.bind(Location::new("b")).unwrap();
        store.bind(Location::new("a")).unwrap();
        assert_eq!(
            store.lookup(1, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!("a-value"))
        );
    }
}
