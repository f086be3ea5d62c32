//! Static node-kind schemas.
//!
//! The teacher's nodes describe their shape through Rust's own type system
//! (typed state structs, trait bounds resolved at compile time). Flow's
//! nodes are type-erased at the graph boundary — a node kind's parameters
//! and init kwargs are only known by name and [`ValueType`] — so each kind
//! publishes a [`Signature`] describing them. `Graph::add_node` checks every
//! binding and init kwarg against this signature once, at construction time
//! (spec §3), instead of relying on runtime reflection the way the system
//! this was distilled from did.

use crate::value::ValueType;

/// One named, typed parameter or init kwarg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ValueType,
}

impl ParamSpec {
    pub const fn new(name: &'static str, ty: ValueType) -> Self {
        Self { name, ty }
    }
}

/// A node kind's full static shape: its processing parameters, its init
/// kwargs, and the type of value it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub init_kwargs: Vec<ParamSpec>,
    pub output: ValueType,
}

impl Signature {
    pub fn new(params: Vec<ParamSpec>, init_kwargs: Vec<ParamSpec>, output: ValueType) -> Self {
        Self { params, init_kwargs, output }
    }

    /// A signature with no init kwargs — the common case for stateless nodes.
    pub fn stateless(params: Vec<ParamSpec>, output: ValueType) -> Self {
        Self::new(params, Vec::new(), output)
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn init_kwarg(&self, name: &str) -> Option<&ParamSpec> {
        self.init_kwargs.iter().find(|p| p.name == name)
    }
}
