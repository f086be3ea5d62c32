//! # flow-store — the Value Store
//!
//! The substrate for incremental and batch runs (spec §2): a content-keyed,
//! per-location mapping from node id to its last successful output plus the
//! fingerprint under which it was produced.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryValueStore`] — ephemeral, for tests and single-process runs.
//! - [`JsonValueStore`] — one human-inspectable JSON document per location,
//!   written atomically.
//!
//! Both implement the [`ValueStore`] trait, which is all [`flow_core`] (the
//! executor and batch runner) depends on.

pub mod error;
pub mod json_file;
pub mod memory;
pub mod value_store;

pub use error::{Result, StoreError};
pub use json_file::JsonValueStore;
pub use memory::InMemoryValueStore;
pub use value_store::{Fingerprint, Location, Lookup, NodeId, StoredEntry, ValueStore};
