//! Error types for graph construction and execution
//!
//! Three error kinds, distinguished at the boundary (spec §7):
//!
//! - [`ConstructionError`] — graph wiring is malformed. Raised during
//!   `add_node`/`add_constant_node`; not recoverable by retry.
//! - [`NodeError`] — a node's `process` failed. Aborts the current
//!   `run_upto`; recorded per-item in batch mode.
//! - [`ResourceError`] — `init` or `release` failed.
//!
//! [`FlowError`] is the umbrella type returned by the public API, matching
//! the teacher's pattern of a top-level error enum with `#[from]` variants
//! for each subsystem.

use thiserror::Error;

use crate::value::ValueType;
use flow_store::NodeId;

/// Result alias used throughout `flow-core`.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Graph wiring is malformed: duplicate id, cycle, binding mismatch, unknown
/// parameter, or a type mismatch between a bound value and the parameter it
/// is bound to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("node id {0} is already in use")]
    DuplicateId(NodeId),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("adding node {new} would introduce a cycle through node {via}")]
    Cycle { new: NodeId, via: NodeId },

    #[error("node {node}: unknown parameter '{param}'")]
    UnknownParameter { node: NodeId, param: String },

    #[error("node {node}: missing binding for parameter '{param}'")]
    MissingParameter { node: NodeId, param: String },

    #[error("node {node}: parameter '{param}' expects {expected:?}, got {actual:?}")]
    TypeMismatch {
        node: NodeId,
        param: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("node {node}: unknown init kwarg '{kwarg}'")]
    UnknownInitKwarg { node: NodeId, kwarg: String },

    #[error("node {node}: missing init kwarg '{kwarg}'")]
    MissingInitKwarg { node: NodeId, kwarg: String },
}

/// A node's `process` step failed.
#[derive(Error, Debug)]
#[error("node {node_id} failed: {cause}")]
pub struct NodeError {
    pub node_id: NodeId,
    pub fingerprint: Option<String>,
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl NodeError {
    pub fn new(
        node_id: NodeId,
        fingerprint: Option<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            node_id,
            fingerprint,
            cause: Box::new(cause),
        }
    }
}

/// A node's `init` or `release` step failed.
#[derive(Error, Debug)]
#[error("node {node_id} {phase}: {cause}")]
pub struct ResourceError {
    pub node_id: NodeId,
    /// `"init"` or `"release"`, for display only.
    pub phase: &'static str,
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl ResourceError {
    pub fn init(node_id: NodeId, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            node_id,
            phase: "init",
            cause: Box::new(cause),
        }
    }

    pub fn release(node_id: NodeId, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            node_id,
            phase: "release",
            cause: Box::new(cause),
        }
    }
}

/// Top-level error returned by graph construction and execution.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("value store error: {0}")]
    Store(#[from] flow_store::StoreError),
}
