//! The node abstraction.
//!
//! A node kind is any type implementing [`Node`]: a name, a version, an
//! optional lazily-acquired resource, and a pure-ish processing step (spec
//! §3). The executor drives the [`Lifecycle`] explicitly — `init` before the
//! first `process` after construction or after a `release`, never implicitly
//! — so a node holding a GPU handle or a loaded model can be evicted between
//! batch sweeps and brought back only when the next item needs it (spec
//! §4.5).
//!
//! `encode`/`decode` let a node kind whose natural output isn't JSON (a
//! tensor, an image) still participate in the value store: `process` can
//! return any [`FlowValue`], including [`FlowValue::Bytes`], and a node kind
//! is free to pack richer structure into bytes on `encode` and unpack it on
//! `decode`. The default implementations are the identity — most node kinds
//! never need to override them.

use std::collections::BTreeMap;

use flow_store::NodeId;

use crate::error::{NodeError, ResourceError};
use crate::schema::{ParamSpec, Signature};
use crate::value::FlowValue;

/// Where a node sits in its resource lifecycle. The executor transitions a
/// node from `Uninitialized` to `Initialized` on the first `process` call it
/// drives, and to `Released` whenever `Graph::release_resources` (or the
/// batch runner's `should_release_between` policy) asks it to let go of
/// whatever `init` acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Released,
}

/// A unit of work in a Flow graph.
///
/// Implementors are the node *kinds* — e.g. a single `LoadModel` type backs
/// every node in a graph that loads a model, each with its own init kwargs
/// and parameter bindings. The trait object stored per graph node is
/// `Box<dyn Node>`; `process` takes `&mut self` so a kind can cache whatever
/// `init` acquired for reuse across repeated calls.
///
/// No `Send`/`Sync` bound: a graph runs single-threaded per spec §5, and a
/// node kind wrapping a non-thread-safe resource (a raw FFI model handle, a
/// `!Send` client) is exactly the kind of heavy node Flow exists to serve.
pub trait Node {
    /// Stable identity for this node kind, folded into the fingerprint.
    fn name(&self) -> &str;

    /// Bump this whenever the kind's behavior changes in a way that should
    /// invalidate previously cached outputs (spec §4.1).
    fn version(&self) -> &str;

    /// The parameters `process` expects and the init kwargs this kind reads,
    /// each with their [`ValueType`](crate::value::ValueType). `Graph` checks
    /// bindings against this once, at `add_node` time.
    fn signature(&self) -> Signature;

    /// Acquire whatever resource this node needs before its first `process`
    /// call, or after a `release`. The default implementation does nothing,
    /// for node kinds with no resource to acquire.
    fn init(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Run this node's logic against its resolved, type-checked inputs.
    fn process(&mut self, inputs: &BTreeMap<String, FlowValue>) -> Result<FlowValue, NodeError>;

    /// Release whatever `init` acquired. Called between batch sweeps under
    /// the `should_release_between` policy, or explicitly via
    /// `Graph::release_resources`. The default implementation does nothing.
    fn release(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Pack a freshly produced value for the store. The identity by default;
    /// override alongside `decode` for outputs that need non-JSON framing.
    fn encode(&self, value: FlowValue) -> FlowValue {
        value
    }

    /// Unpack a value loaded back from the store. The identity by default.
    fn decode(&self, value: FlowValue) -> FlowValue {
        value
    }
}

/// A constant node: a fixed [`FlowValue`] bound at graph-construction time,
/// with no processing step of its own (spec §3's "leaf inputs").
/// `Graph::add_constant_node` builds this directly rather than asking
/// callers to implement [`Node`] for every literal.
///
/// Internally the node declares a single parameter, [`ConstantNode::VALUE_PARAM`],
/// bound by `Graph` to a literal holding the current value. This is what
/// lets a constant's own fingerprint — computed the same generic way as any
/// other node's, from its resolved bindings — change when `Graph::set_constant`
/// replaces the value, which is what transitively invalidates every
/// descendant's cache (spec §4.3). A constant with literally no bindings
/// would fingerprint identically regardless of its value.
pub struct ConstantNode {
    value: FlowValue,
}

impl ConstantNode {
    /// Name of the synthetic parameter `Graph` binds to the node's value.
    pub const VALUE_PARAM: &'static str = "value";

    pub fn new(value: FlowValue) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &FlowValue {
        &self.value
    }
}

impl Node for ConstantNode {
    fn name(&self) -> &str {
        "__constant__"
    }

    fn version(&self) -> &str {
        "1"
    }

    fn signature(&self) -> Signature {
        Signature::stateless(
            vec![ParamSpec::new(Self::VALUE_PARAM, self.value.value_type())],
            self.value.value_type(),
        )
    }

    fn process(&mut self, inputs: &BTreeMap<String, FlowValue>) -> Result<FlowValue, NodeError> {
        Ok(inputs[Self::VALUE_PARAM].clone())
    }
}

/// Tracks the id a node belongs to, its lifecycle state, and the boxed kind
/// implementation — the unit `Graph` actually stores per node.
pub struct NodeEntry {
    pub id: NodeId,
    pub kind: Box<dyn Node>,
    pub lifecycle: Lifecycle,
}

impl NodeEntry {
    pub fn new(id: NodeId, kind: Box<dyn Node>) -> Self {
        Self { id, kind, lifecycle: Lifecycle::Uninitialized }
    }

    /// Run `init` if this node hasn't been initialized yet (or was released
    /// since), per the lazy-initialization discipline of spec §4.2.
    pub fn ensure_initialized(&mut self) -> Result<(), ResourceError> {
        if self.lifecycle == Lifecycle::Initialized {
            return Ok(());
        }
        self.kind.init().map_err(|e| ResourceError::init(self.id, e))?;
        self.lifecycle = Lifecycle::Initialized;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), ResourceError> {
        if self.lifecycle != Lifecycle::Initialized {
            return Ok(());
        }
        self.kind.release().map_err(|e| ResourceError::release(self.id, e))?;
        self.lifecycle = Lifecycle::Released;
        Ok(())
    }
}
