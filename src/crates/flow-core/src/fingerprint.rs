//! Cache fingerprinting.
//!
//! Per spec §4.1, a node's fingerprint is a deterministic function of its
//! kind name, its version, and the canonical rendering of its resolved
//! inputs — with any input that is itself another node's output represented
//! by *that node's fingerprint*, not its value. This lets the executor
//! decide whether a node needs to run again without reading the blob a
//! parent produced, and it means a fingerprint changes transitively when any
//! upstream node's version or inputs change.
//!
//! There is no cryptographic hashing here: the canonical JSON string *is*
//! the fingerprint. It is longer than a digest, but it is inspectable in the
//! store documents written by `flow-store`, and nothing in this crate's
//! dependency stack carries a hashing crate — pulling one in for this alone
//! would be a needless addition (see `DESIGN.md`).

use std::collections::BTreeMap;

use serde_json::{json, Value as Json};

use crate::value::FlowValue;
use flow_store::Fingerprint;

/// One resolved node parameter, ready to be folded into a fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInput {
    /// A literal value, or the as-yet-unexecuted value of a constant node.
    Value(FlowValue),
    /// Another node's output, represented by its fingerprint.
    Ref(Fingerprint),
}

impl ResolvedInput {
    fn to_json(&self) -> Json {
        match self {
            ResolvedInput::Value(v) => json!({ "value": v.to_json() }),
            ResolvedInput::Ref(fp) => json!({ "ref": fp.as_str() }),
        }
    }
}

/// Computes the fingerprint for a node with the given kind name, version,
/// and resolved parameter bindings. `inputs` keys are parameter names;
/// `BTreeMap` guarantees they are folded in sorted order regardless of the
/// order bindings were declared, satisfying the "order-independent maps"
/// requirement (spec §4.1).
pub fn compute(name: &str, version: &str, inputs: &BTreeMap<String, ResolvedInput>) -> Fingerprint {
    let rendered: BTreeMap<&str, Json> = inputs.iter().map(|(k, v)| (k.as_str(), v.to_json())).collect();
    let canonical = json!({
        "name": name,
        "version": version,
        "inputs": rendered,
    });
    Fingerprint::new(canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: Vec<(&str, ResolvedInput)>) -> BTreeMap<String, ResolvedInput> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn identical_inputs_produce_identical_fingerprints() {
        let a = compute("sum", "1", &inputs(vec![("x", ResolvedInput::Value(FlowValue::Int(2)))]));
        let b = compute("sum", "1", &inputs(vec![("x", ResolvedInput::Value(FlowValue::Int(2)))]));
        assert_eq!(a, b);
    }

    #[test]
    fn version_bump_changes_the_fingerprint() {
        let a = compute("sum", "1", &inputs(vec![("x", ResolvedInput::Value(FlowValue::Int(2)))]));
        let b = compute("sum", "2", &inputs(vec![("x", ResolvedInput::Value(FlowValue::Int(2)))]));
        assert_ne!(a, b);
    }

    #[test]
    fn input_insertion_order_does_not_matter() {
        let a = compute(
            "join",
            "1",
            &inputs(vec![
                ("a", ResolvedInput::Value(FlowValue::Int(1))),
                ("b", ResolvedInput::Value(FlowValue::Int(2))),
            ]),
        );
        let b = compute(
            "join",
            "1",
            &inputs(vec![
                ("b", ResolvedInput::Value(FlowValue::Int(2))),
                ("a", ResolvedInput::Value(FlowValue::Int(1))),
            ]),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn a_node_ref_is_keyed_by_the_referents_fingerprint_not_its_value() {
        let upstream_v1 = Fingerprint::new("upstream-v1");
        let upstream_v2 = Fingerprint::new("upstream-v2");
        let a = compute("child", "1", &inputs(vec![("x", ResolvedInput::Ref(upstream_v1))]));
        let b = compute("child", "1", &inputs(vec![("x", ResolvedInput::Ref(upstream_v2))]));
        assert_ne!(a, b, "fingerprint must change when the referenced node's fingerprint changes");
    }
}
