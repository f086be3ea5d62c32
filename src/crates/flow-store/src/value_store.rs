//! The `ValueStore` trait: a content-keyed, per-location cache of node outputs.
//!
//! A value store holds at most one *current output* per node id per location
//! (spec §3). Locations are switched with [`ValueStore::bind`] and the store
//! then reads and writes against whichever location is currently bound —
//! this is the "active persistence location" of spec §4.1, threaded through
//! as an explicit call rather than process-global state (spec §9: "scoped
//! context", never a process-global).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Node identifier, unique within a single graph.
pub type NodeId = u64;

/// Deterministic fingerprint of `(name, version, resolved-inputs)`.
///
/// Two nodes (or two runs of the same node) with equal fingerprints are
/// considered to have produced equivalent output; the store never compares
/// values, only fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persistence location: one file or directory path per batch item
/// (spec §4.1). Opaque outside this crate beyond construction from a path
/// or name, so in-memory and file-backed stores can each interpret it their
/// own way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Outcome of a [`ValueStore::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The stored fingerprint matched exactly; here is the value.
    Hit(serde_json::Value),
    /// Either nothing is stored for this node id, or the stored fingerprint
    /// doesn't match what was asked for.
    Miss,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Lookup::Hit(v) => Some(v),
            Lookup::Miss => None,
        }
    }
}

/// A single entry as it is persisted: the fingerprint it was produced under,
/// plus the value itself. This is the unit the executor writes on a
/// successful `process` and the unit a lookup either matches in full or
/// misses on entirely — spec §4.1 is explicit that a stale fingerprint is a
/// miss, never a partial or stale hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub fingerprint: Fingerprint,
    pub value: serde_json::Value,
}

/// Durable, per-location cache mapping node id to its last successful output.
///
/// Implementations must make `store` durable before returning — the executor
/// treats a successful `store` call as a commit point (spec §4.1: "Stores
/// must be durable before the executor marks the node complete").
pub trait ValueStore: Send + Sync {
    /// Designate the active persistence location. Switching locations is
    /// `O(1)` and must not flush or drop entries already written under a
    /// previously bound location.
    fn bind(&self, location: Location) -> Result<()>;

    /// Look up `node_id`'s output at the currently bound location. Returns
    /// `Lookup::Hit` only when the stored fingerprint equals `fingerprint`
    /// exactly.
    fn lookup(&self, node_id: NodeId, fingerprint: &Fingerprint) -> Result<Lookup>;

    /// Persist `value` for `node_id` under `fingerprint` at the currently
    /// bound location, overwriting any previous entry for that node id.
    fn store(&self, node_id: NodeId, fingerprint: Fingerprint, value: serde_json::Value) -> Result<()>;

    /// Remove the entry for `node_id` at the currently bound location, if
    /// any. Absent entries are not an error.
    fn forget(&self, node_id: NodeId) -> Result<()>;
}
