//! Parameter bindings: where a node's input comes from.
//!
//! Per spec §3, a node's parameter is bound either to a literal constant
//! value or to another node's output, by id. `Graph::add_node` resolves
//! [`Binding::NodeRef`] against the graph's existing nodes at construction
//! time — an unresolvable reference is a [`ConstructionError`], never a
//! deferred failure at run time.
//!
//! [`ConstructionError`]: crate::error::ConstructionError

use flow_store::NodeId;

use crate::value::FlowValue;

/// The source of a node parameter's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A fixed value, supplied at graph-construction time.
    Literal(FlowValue),
    /// The output of another node in the same graph.
    NodeRef(NodeId),
}

impl Binding {
    pub fn literal(value: impl Into<FlowValue>) -> Self {
        Binding::Literal(value.into())
    }

    pub fn node(id: NodeId) -> Self {
        Binding::NodeRef(id)
    }

    pub fn as_node_ref(&self) -> Option<NodeId> {
        match self {
            Binding::NodeRef(id) => Some(*id),
            Binding::Literal(_) => None,
        }
    }
}
