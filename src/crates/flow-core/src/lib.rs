//! # flow-core — the Flow workflow engine
//!
//! Flow runs a directed acyclic graph of processing nodes correctly,
//! resumably, and cheaply in the presence of expensive nodes (a local LLM
//! server, a GPU model, a large media decoder) whose initialization cost
//! dwarfs per-item processing.
//!
//! ## Core concepts
//!
//! ### 1. Node — [`node::Node`]
//!
//! A node kind declares a name, a version, a typed `process` signature
//! ([`schema::Signature`]), and optional `init`/`release` hooks for the
//! resource it lazily acquires. [`node::ConstantNode`] is the one kind Flow
//! builds for callers directly: a fixed value with no inputs.
//!
//! ### 2. Graph — [`graph::Graph`]
//!
//! The DAG: node ids to node kinds, plus each node's [`binding::Binding`]s
//! (literal values or references to another node's output). Bindings and
//! init kwargs are validated against the kind's signature once, at
//! `add_node` time, never at run time.
//!
//! ### 3. Fingerprint — [`fingerprint`]
//!
//! The cache key: a deterministic rendering of `(name, version,
//! resolved-inputs)`, with node references folded in by the referent's
//! fingerprint rather than its value. Equal fingerprints mean "would produce
//! the same output" without re-reading what a parent node actually produced.
//!
//! ### 4. Executor — [`executor::run_upto`]
//!
//! Walks a target's ancestors in topological order. Each node either adopts
//! a cached output from the value store (`flow_store`) on a fingerprint hit,
//! or is lazily initialized and run on a miss. A node's failure aborts the
//! whole call with a [`error::NodeError`] naming the node; everything
//! already persisted upstream stays intact.
//!
//! ### 5. Batch runner — [`batch::BatchRunner`]
//!
//! Amortizes init cost across many items by sweeping one node across the
//! whole item sequence before advancing to the next, so at most one
//! expensive node's resources are resident at a time. A
//! [`batch::ReleasePolicy`] decides when to evict between sweeps; a single
//! item's failure is recorded in the returned [`batch::BatchReport`] without
//! aborting the rest of the batch.
//!
//! ## Quick start
//!
//! ```
//! use std::collections::BTreeMap;
//! use flow_core::{Binding, FlowValue, Graph, ValueType};
//! use flow_core::node::Node;
//! use flow_core::schema::{ParamSpec, Signature};
//! use flow_core::error::{NodeError, ResourceError};
//! use flow_store::InMemoryValueStore;
//!
//! struct SumInt;
//! impl Node for SumInt {
//!     fn name(&self) -> &str { "sum_int" }
//!     fn version(&self) -> &str { "1" }
//!     fn signature(&self) -> Signature {
//!         Signature::stateless(
//!             vec![ParamSpec::new("a", ValueType::Int), ParamSpec::new("b", ValueType::Int)],
//!             ValueType::Int,
//!         )
//!     }
//!     fn process(&mut self, inputs: &BTreeMap<String, FlowValue>) -> Result<FlowValue, NodeError> {
//!         Ok(FlowValue::Int(inputs["a"].as_int().unwrap() + inputs["b"].as_int().unwrap()))
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = Graph::new(InMemoryValueStore::new());
//! graph.persist(flow_store::Location::new("demo"))?;
//! graph.add_constant_node(0, "c0", FlowValue::Int(100))?;
//!
//! let mut bindings = BTreeMap::new();
//! bindings.insert("a".to_string(), Binding::node(0));
//! bindings.insert("b".to_string(), Binding::literal(200i64));
//! graph.add_node(1, Box::new(SumInt), bindings, BTreeMap::new())?;
//!
//! let output = flow_core::run_upto(&mut graph, 1)?;
//! assert_eq!(output, FlowValue::Int(300));
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod binding;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod graph;
pub mod node;
pub mod schema;
pub mod value;

pub use batch::{BatchReport, BatchRunner, ItemOutcome, NeverRelease, ReleaseAfterEveryLevel, ReleasePolicy};
pub use binding::Binding;
pub use error::{ConstructionError, FlowError, NodeError, ResourceError, Result};
pub use executor::run_upto;
pub use fingerprint::ResolvedInput;
pub use graph::Graph;
pub use node::{ConstantNode, Lifecycle, Node, NodeEntry};
pub use schema::{ParamSpec, Signature};
pub use value::{FlowValue, ValueType};
