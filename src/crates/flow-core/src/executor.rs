//! Single-target execution (spec §4.4).
//!
//! `run_upto` walks a target's ancestors in topological order, resolving
//! each node's inputs, consulting the value store, and calling `process`
//! only on a cache miss. The executor is single-threaded with respect to a
//! given graph: no two `process` calls overlap within one `run_upto`.

use std::collections::BTreeMap;

use flow_store::{Lookup, NodeId, ValueStore};

use crate::binding::Binding;
use crate::error::{FlowError, NodeError};
use crate::fingerprint::{self, ResolvedInput};
use crate::graph::Graph;
use crate::value::FlowValue;

/// Runs every ancestor of `target` that needs to run, then `target` itself,
/// returning its adopted output.
///
/// For each node in topological order: bindings are resolved to concrete
/// values (a `NodeRef` reads the referent's just-computed or cache-hit
/// output, which is guaranteed available by the ordering); the fingerprint
/// of `(name, version, resolved-inputs)` is computed; a cache hit adopts the
/// stored value without touching the node's lifecycle at all; a miss
/// initializes the node if needed, calls `process`, and persists the result
/// before adopting it.
pub fn run_upto<S: ValueStore>(graph: &mut Graph<S>, target: NodeId) -> Result<FlowValue, FlowError> {
    let _span = tracing::debug_span!("run_upto", target).entered();
    let order = graph.topological_sort(target)?;
    let mut outputs: BTreeMap<NodeId, FlowValue> = BTreeMap::new();
    let mut fingerprints: BTreeMap<NodeId, flow_store::Fingerprint> = BTreeMap::new();

    for node_id in order {
        let bindings = graph.bindings_of(node_id).cloned().unwrap_or_default();

        let mut resolved = BTreeMap::new();
        let mut fingerprint_inputs = BTreeMap::new();
        for (param, binding) in &bindings {
            let value = match binding {
                Binding::Literal(v) => v.clone(),
                Binding::NodeRef(ref_id) => outputs
                    .get(ref_id)
                    .cloned()
                    .expect("topological order guarantees ancestor outputs are already computed"),
            };
            let fingerprint_input = match binding {
                Binding::Literal(v) => ResolvedInput::Value(v.clone()),
                Binding::NodeRef(ref_id) => ResolvedInput::Ref(
                    fingerprints.get(ref_id).cloned().expect("ancestor fingerprint must be known"),
                ),
            };
            resolved.insert(param.clone(), value);
            fingerprint_inputs.insert(param.clone(), fingerprint_input);
        }

        let entry = graph.node_entry_mut(node_id).expect("node exists: came from topological_sort");
        let name = entry.kind.name().to_string();
        let version = entry.kind.version().to_string();
        let fp = fingerprint::compute(&name, &version, &fingerprint_inputs);

        let output = match graph.store().lookup(node_id, &fp).map_err(FlowError::Store)? {
            Lookup::Hit(json) => {
                tracing::debug!(node_id, fingerprint = %fp, "cache hit");
                let entry = graph.node_entry_mut(node_id).unwrap();
                entry.kind.decode(FlowValue::from_json(&json))
            }
            Lookup::Miss => {
                tracing::debug!(node_id, fingerprint = %fp, "cache miss, running node");
                let entry = graph.node_entry_mut(node_id).unwrap();
                entry.ensure_initialized()?;
                let raw = entry
                    .kind
                    .process(&resolved)
                    .map_err(|e| NodeError::new(node_id, Some(fp.as_str().to_string()), e))?;
                let encoded = entry.kind.encode(raw.clone());
                graph
                    .store()
                    .store(node_id, fp.clone(), encoded.to_json())
                    .map_err(FlowError::Store)?;
                tracing::trace!(node_id, fingerprint = %fp, "stored fresh output");
                raw
            }
        };

        outputs.insert(node_id, output);
        fingerprints.insert(node_id, fp);
    }

    Ok(outputs.remove(&target).expect("target is always last in its own topological order"))
}
