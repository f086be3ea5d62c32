//! The DAG: a mapping from node id to node, plus each node's input
//! bindings.
//!
//! `Graph` owns the wiring (spec §4.3) and the value store the executor
//! persists into; it does not itself drive execution — that is
//! [`crate::executor::run_upto`] and [`crate::batch`], both of which take a
//! `&mut Graph` rather than duplicating its bookkeeping.
//!
//! Node ids are caller-supplied (not allocated by the graph), matching
//! spec §3's "each node has an integer id unique within its graph" — the
//! graph only ever rejects a reused id, it never mints one.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use flow_store::{Location, NodeId, ValueStore};

use crate::binding::Binding;
use crate::error::{ConstructionError, ResourceError};
use crate::node::{ConstantNode, Node, NodeEntry};
use crate::value::{FlowValue, ValueType};

/// The DAG plus the value store its nodes persist into.
///
/// Generic over the store implementation so callers choose
/// [`flow_store::InMemoryValueStore`] for tests and transient runs or
/// [`flow_store::JsonValueStore`] for durable, resumable ones, without
/// `flow-core` depending on either concretely.
pub struct Graph<S: ValueStore> {
    nodes: BTreeMap<NodeId, NodeEntry>,
    bindings: BTreeMap<NodeId, BTreeMap<String, Binding>>,
    names: BTreeMap<NodeId, String>,
    store: S,
}

impl<S: ValueStore> Graph<S> {
    pub fn new(store: S) -> Self {
        Self {
            nodes: BTreeMap::new(),
            bindings: BTreeMap::new(),
            names: BTreeMap::new(),
            store,
        }
    }

    /// Adds a constant node: a fixed value exposed to the rest of the graph
    /// as a node with no processing step (spec §3). The name is
    /// caller-supplied since a constant has no processor kind to derive one
    /// from. Internally the value is bound to the node's own synthetic
    /// [`ConstantNode::VALUE_PARAM`] input, so the value flows into the
    /// node's fingerprint the same way any other node's bound inputs do.
    pub fn add_constant_node(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: FlowValue,
    ) -> Result<(), ConstructionError> {
        if self.nodes.contains_key(&id) {
            return Err(ConstructionError::DuplicateId(id));
        }
        let mut bindings = BTreeMap::new();
        bindings.insert(ConstantNode::VALUE_PARAM.to_string(), Binding::literal(value.clone()));
        self.nodes.insert(id, NodeEntry::new(id, Box::new(ConstantNode::new(value))));
        self.bindings.insert(id, bindings);
        self.names.insert(id, name.into());
        Ok(())
    }

    /// Adds a processor node. `bindings` and `init_kwargs` are validated
    /// immediately against `kind.signature()` (spec §4.3): every declared
    /// parameter must be bound exactly once, to a value of the declared
    /// type, and node references must resolve to an existing node whose
    /// output type matches.
    pub fn add_node(
        &mut self,
        id: NodeId,
        kind: Box<dyn Node>,
        bindings: BTreeMap<String, Binding>,
        init_kwargs: BTreeMap<String, FlowValue>,
    ) -> Result<(), ConstructionError> {
        if self.nodes.contains_key(&id) {
            return Err(ConstructionError::DuplicateId(id));
        }

        let signature = kind.signature();

        for param_name in bindings.keys() {
            if signature.param(param_name).is_none() {
                return Err(ConstructionError::UnknownParameter { node: id, param: param_name.clone() });
            }
        }
        for param in &signature.params {
            let binding = bindings.get(param.name).ok_or_else(|| ConstructionError::MissingParameter {
                node: id,
                param: param.name.to_string(),
            })?;
            let actual = self.binding_output_type(binding)?;
            if actual != param.ty {
                return Err(ConstructionError::TypeMismatch {
                    node: id,
                    param: param.name.to_string(),
                    expected: param.ty,
                    actual,
                });
            }
        }

        for kwarg_name in init_kwargs.keys() {
            if signature.init_kwarg(kwarg_name).is_none() {
                return Err(ConstructionError::UnknownInitKwarg { node: id, kwarg: kwarg_name.clone() });
            }
        }
        for kwarg in &signature.init_kwargs {
            let value = init_kwargs.get(kwarg.name).ok_or_else(|| ConstructionError::MissingInitKwarg {
                node: id,
                kwarg: kwarg.name.to_string(),
            })?;
            if value.value_type() != kwarg.ty {
                return Err(ConstructionError::TypeMismatch {
                    node: id,
                    param: kwarg.name.to_string(),
                    expected: kwarg.ty,
                    actual: value.value_type(),
                });
            }
        }

        if let Some(via) = self.would_introduce_cycle(id, &bindings) {
            return Err(ConstructionError::Cycle { new: id, via });
        }

        let name = kind.name().to_string();
        self.nodes.insert(id, NodeEntry::new(id, kind));
        self.bindings.insert(id, bindings);
        self.names.insert(id, name);
        Ok(())
    }

    fn binding_output_type(&self, binding: &Binding) -> Result<ValueType, ConstructionError> {
        match binding {
            Binding::Literal(value) => Ok(value.value_type()),
            Binding::NodeRef(ref_id) => self
                .nodes
                .get(ref_id)
                .map(|entry| entry.kind.signature().output)
                .ok_or(ConstructionError::UnknownNode(*ref_id)),
        }
    }

    /// DFS guard against introducing a cycle (spec §3, §8 scenario 3). Under
    /// this graph's insert-only API a new node can only reference nodes that
    /// already exist, so a cycle can never actually form through `add_node`
    /// alone — but the check is cheap, matches the spec's stated invariant
    /// literally, and guards against any future mutation API that rewires
    /// existing bindings.
    fn would_introduce_cycle(&self, new_id: NodeId, new_bindings: &BTreeMap<String, Binding>) -> Option<NodeId> {
        let mut edges = self
            .bindings
            .iter()
            .map(|(id, b)| (*id, b.values().filter_map(Binding::as_node_ref).collect::<Vec<_>>()))
            .collect::<BTreeMap<_, _>>();
        edges.insert(new_id, new_bindings.values().filter_map(Binding::as_node_ref).collect());

        Self::find_cycle_through(&edges, new_id)
    }

    fn find_cycle_through(edges: &BTreeMap<NodeId, Vec<NodeId>>, start: NodeId) -> Option<NodeId> {
        fn visit(
            edges: &BTreeMap<NodeId, Vec<NodeId>>,
            node: NodeId,
            start: NodeId,
            stack: &mut Vec<NodeId>,
        ) -> Option<NodeId> {
            for &dep in edges.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                if dep == start {
                    return Some(node);
                }
                if stack.contains(&dep) {
                    continue;
                }
                stack.push(dep);
                if let Some(via) = visit(edges, dep, start, stack) {
                    return Some(via);
                }
                stack.pop();
            }
            None
        }
        let mut stack = vec![start];
        visit(edges, start, start, &mut stack)
    }

    /// Returns `target` and all of its ancestors in dependency order, target
    /// last, deterministically tie-broken by ascending node id (spec §4.3,
    /// §8). Implemented as Kahn's algorithm over the induced subgraph, with
    /// a min-heap standing in for FIFO so ties resolve by id rather than
    /// insertion order.
    pub fn topological_sort(&self, target: NodeId) -> Result<Vec<NodeId>, ConstructionError> {
        if !self.nodes.contains_key(&target) {
            return Err(ConstructionError::UnknownNode(target));
        }

        let ancestors = self.collect_ancestors(target);

        let mut dependents: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for &id in &ancestors {
            in_degree.entry(id).or_insert(0);
            for dep in self.bindings[&id].values().filter_map(Binding::as_node_ref) {
                dependents.entry(dep).or_default().push(id);
                *in_degree.entry(id).or_insert(0) += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> =
            in_degree.iter().filter(|(_, &deg)| deg == 0).map(|(&id, _)| Reverse(id)).collect();
        let mut order = Vec::with_capacity(ancestors.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            if let Some(deps) = dependents.get(&id) {
                for &dependent in deps {
                    let degree = in_degree.get_mut(&dependent).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        Ok(order)
    }

    fn collect_ancestors(&self, target: NodeId) -> Vec<NodeId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut queue = VecDeque::from([target]);
        seen.insert(target);
        while let Some(id) = queue.pop_front() {
            for dep in self.bindings[&id].values().filter_map(Binding::as_node_ref) {
                if seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Calls `release` on every node currently holding initialized state.
    /// The graph remains usable afterward: nodes are re-initialized lazily
    /// on their next `process` call.
    pub fn release_resources(&mut self) -> Result<(), ResourceError> {
        for entry in self.nodes.values_mut() {
            entry.release()?;
        }
        Ok(())
    }

    /// Forwards to the value store's `bind` (spec §4.3).
    pub fn persist(&self, location: impl Into<Location>) -> Result<(), flow_store::StoreError> {
        self.store.bind(location.into())
    }

    /// Overwrites a constant node's value. The primary mechanism for driving
    /// different items through the same graph (spec §4.3): changing a
    /// constant changes its fingerprint, which transitively invalidates
    /// every descendant's cache without any explicit bookkeeping.
    pub fn set_constant(&mut self, id: NodeId, value: FlowValue) -> Result<(), ConstructionError> {
        {
            let entry = self.nodes.get_mut(&id).ok_or(ConstructionError::UnknownNode(id))?;
            let constant = (entry.kind.as_mut() as &mut dyn Any)
                .downcast_mut::<ConstantNode>()
                .ok_or(ConstructionError::UnknownNode(id))?;
            *constant = ConstantNode::new(value.clone());
            entry.lifecycle = crate::node::Lifecycle::Uninitialized;
        }
        let bindings = self.bindings.get_mut(&id).expect("bindings map populated alongside nodes map");
        bindings.insert(ConstantNode::VALUE_PARAM.to_string(), Binding::literal(value));
        Ok(())
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn bindings_of(&self, id: NodeId) -> Option<&BTreeMap<String, Binding>> {
        self.bindings.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn node_entry_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }
}
