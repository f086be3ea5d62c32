//! JSON-file-backed value store.
//!
//! Each location is a single file path. The file's top-level shape is the
//! `node_id -> { fingerprint, value }` mapping required by spec §6, so any
//! JSON-aware tool can open it without Flow. Writes go through a
//! write-to-temp-then-rename sequence in the same directory as the target,
//! so a crash mid-write leaves either the old document or the new one, never
//! a half-written file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::value_store::{Fingerprint, Location, Lookup, NodeId, StoredEntry, ValueStore};

/// The on-disk document for one location: `node_id` (as a string, since JSON
/// object keys must be strings) to its stored entry.
type Document = HashMap<String, StoredEntry>;

/// Persists node outputs as one self-describing JSON document per location.
pub struct JsonValueStore {
    current: RwLock<Option<PathBuf>>,
}

impl JsonValueStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    fn current_path(&self) -> Result<PathBuf> {
        self.current
            .read()
            .unwrap()
            .clone()
            .ok_or(StoreError::Unbound)
    }

    fn read_document(path: &Path) -> Result<Document> {
        match fs::read(path) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(Document::new());
                }
                serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(path.display().to_string(), e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write `document` atomically: serialize to a temp file in the same
    /// directory as `path`, then rename over it. The rename is the commit
    /// point — crashing before it leaves the previous document intact.
    fn write_document(path: &Path, document: &Document) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = parent.unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, document)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl Default for JsonValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStore for JsonValueStore {
    fn bind(&self, location: Location) -> Result<()> {
        *self.current.write().unwrap() = Some(PathBuf::from(location.as_str()));
        Ok(())
    }

    fn lookup(&self, node_id: NodeId, fingerprint: &Fingerprint) -> Result<Lookup> {
        let path = self.current_path()?;
        let document = Self::read_document(&path)?;
        match document.get(&node_id.to_string()) {
            Some(entry) if &entry.fingerprint == fingerprint => Ok(Lookup::Hit(entry.value.clone())),
            _ => Ok(Lookup::Miss),
        }
    }

    fn store(&self, node_id: NodeId, fingerprint: Fingerprint, value: serde_json::Value) -> Result<()> {
        let path = self.current_path()?;
        let mut document = Self::read_document(&path)?;
        document.insert(node_id.to_string(), StoredEntry { fingerprint, value });
        Self::write_document(&path, &document)?;
        tracing::debug!(node_id, path = %path.display(), "stored node output");
        Ok(())
    }

    fn forget(&self, node_id: NodeId) -> Result<()> {
        let path = self.current_path()?;
        let mut document = Self::read_document(&path)?;
        if document.remove(&node_id.to_string()).is_some() {
            Self::write_document(&path, &document)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_a_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("item-0.flow.json");
        let store = JsonValueStore::new();
        store.bind(Location::new(path.to_str().unwrap())).unwrap();

        assert_eq!(store.lookup(1, &Fingerprint::new("fp")).unwrap(), Lookup::Miss);

        store.store(1, Fingerprint::new("fp"), json!({"a": 1})).unwrap();
        assert_eq!(
            store.lookup(1, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!({"a": 1}))
        );

        // A second store, pointed at the same path, observes the write —
        // this is what makes a prior run's output loadable (spec §4.1).
        let reloaded = JsonValueStore::new();
        reloaded.bind(Location::new(path.to_str().unwrap())).unwrap();
        assert_eq!(
            reloaded.lookup(1, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!({"a": 1}))
        );
    }

    #[test]
    fn document_is_plain_inspectable_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("item.flow.json");
        let store = JsonValueStore::new();
        store.bind(Location::new(path.to_str().unwrap())).unwrap();
        store.store(7, Fingerprint::new("fp-7"), json!("hello")).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["7"]["fingerprint"], json!("fp-7"));
        assert_eq!(raw["7"]["value"], json!("hello"));
    }

    #[test]
    fn forget_rewrites_the_document_without_the_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("item.flow.json");
        let store = JsonValueStore::new();
        store.bind(Location::new(path.to_str().unwrap())).unwrap();
        store.store(1, Fingerprint::new("fp"), json!(1)).unwrap();
        store.store(2, Fingerprint::new("fp"), json!(2)).unwrap();

        store.forget(1).unwrap();

        assert_eq!(store.lookup(1, &Fingerprint::new("fp")).unwrap(), Lookup::Miss);
        assert_eq!(
            store.lookup(2, &Fingerprint::new("fp")).unwrap(),
            Lookup::Hit(json!(2))
        );
    }
}
