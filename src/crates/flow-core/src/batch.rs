//! Breadth-first batch execution (spec §4.5).
//!
//! The motivation is amortizing resource-acquisition cost: a graph whose
//! nodes own resources too large to coexist (a local LLM, a diarization
//! model, a GPU-resident decoder) can't afford to pay `init`/`release` for
//! every node on every item. `BatchRunner` sweeps one node across the whole
//! item sequence before moving to the next node in topological order, so
//! each node pays its init cost once per sweep rather than once per item.

use std::marker::PhantomData;

use flow_store::{NodeId, ValueStore};

use crate::error::FlowError;
use crate::executor::run_upto;
use crate::graph::Graph;

/// One item's outcome in a completed batch.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Success,
    Failure { node_id: Option<NodeId>, error: String },
}

/// The result of [`BatchRunner::run`]: which items completed their targets
/// and which failed, with enough detail to locate the failure (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, ItemOutcome::Success)).count()
    }

    pub fn failures(&self) -> Vec<(usize, &ItemOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, ItemOutcome::Failure { .. }))
            .collect()
    }
}

/// Policy deciding whether resources must be released between two
/// consecutive levels of the sweep. The default releases between every pair
/// of levels, which is always correct (if conservative) — a node holding no
/// resource pays nothing extra for a no-op `release`.
pub trait ReleasePolicy {
    fn should_release_between(&self, finished: NodeId, next: Option<NodeId>) -> bool;
}

/// Releases after every level. Safe default satisfying the "at most one
/// `init` per node between `release_resources` calls" invariant (spec §8)
/// trivially, at the cost of always paying the release/reinit round trip.
pub struct ReleaseAfterEveryLevel;

impl ReleasePolicy for ReleaseAfterEveryLevel {
    fn should_release_between(&self, _finished: NodeId, _next: Option<NodeId>) -> bool {
        true
    }
}

/// Never releases until the caller does so explicitly. Appropriate when
/// every node in the graph can coexist in memory, e.g. a sweep over nodes
/// with no heavy resources at all.
pub struct NeverRelease;

impl ReleasePolicy for NeverRelease {
    fn should_release_between(&self, _finished: NodeId, _next: Option<NodeId>) -> bool {
        false
    }
}

/// Drives `prepare` then `run_upto` for every item at each level of the
/// topological order, in input order within the level, before advancing.
///
/// `prepare` is responsible for pointing the value store at the item's
/// persistence location and setting whatever constant nodes represent the
/// item's input (spec §4.5); it receives the graph directly so it can do
/// both through the normal `Graph` API, rather than the runner needing to
/// know anything about constants or locations itself.
pub struct BatchRunner<S, I, P, R, C>
where
    S: ValueStore,
    P: FnMut(&mut Graph<S>, usize, &I) -> Result<(), FlowError>,
    R: ReleasePolicy,
    C: Fn() -> bool,
{
    items: Vec<I>,
    targets: Vec<NodeId>,
    prepare: P,
    policy: R,
    cancelled: C,
    _store: PhantomData<S>,
}

impl<S, I, P, R, C> BatchRunner<S, I, P, R, C>
where
    S: ValueStore,
    P: FnMut(&mut Graph<S>, usize, &I) -> Result<(), FlowError>,
    R: ReleasePolicy,
    C: Fn() -> bool,
{
    pub fn new(items: Vec<I>, targets: Vec<NodeId>, prepare: P, policy: R, cancelled: C) -> Self {
        Self { items, targets, prepare, policy, cancelled, _store: PhantomData }
    }

    /// Runs the batch to completion or until cancellation is observed.
    ///
    /// `S = topological_sort(union-of-targets)` is computed once; for each
    /// level in `S`, every item is prepared and run up to that level's node
    /// in input order, then the release policy decides whether to evict
    /// before the next level. The invariant this preserves: when a node is
    /// running for any item, every strict ancestor has already been computed
    /// and cached for every item in the batch, so the node is the only one
    /// that needs resident resources during its own sweep.
    pub fn run(&mut self, graph: &mut Graph<S>) -> BatchReport {
        let mut report = BatchReport { outcomes: vec![ItemOutcome::Success; self.items.len()], cancelled: false };

        let order = match Self::union_topological_order(graph, &self.targets) {
            Ok(order) => order,
            Err(e) => {
                report.outcomes = self
                    .items
                    .iter()
                    .map(|_| ItemOutcome::Failure { node_id: None, error: e.to_string() })
                    .collect();
                return report;
            }
        };

        tracing::info!(levels = order.len(), items = self.items.len(), "batch starting");

        for (level_index, &node_id) in order.iter().enumerate() {
            if (self.cancelled)() {
                report.cancelled = true;
                tracing::info!(level_index, node_id, "batch cancelled before level");
                Self::release_quietly(graph);
                return report;
            }
            tracing::info!(level_index, node_id, "sweeping level across batch");

            for (index, outcome) in report.outcomes.iter_mut().enumerate() {
                if matches!(outcome, ItemOutcome::Failure { .. }) {
                    continue;
                }
                if (self.cancelled)() {
                    report.cancelled = true;
                    break;
                }

                let item = &self.items[index];
                if let Err(e) = (self.prepare)(graph, index, item) {
                    *outcome = ItemOutcome::Failure { node_id: None, error: e.to_string() };
                    continue;
                }

                if let Err(e) = run_upto(graph, node_id) {
                    *outcome = ItemOutcome::Failure { node_id: Some(node_id), error: e.to_string() };
                }
            }

            if report.cancelled {
                Self::release_quietly(graph);
                return report;
            }

            let next = order.get(level_index + 1).copied();
            if self.policy.should_release_between(node_id, next) {
                tracing::info!(node_id, next = ?next, "releasing resources before next level");
                if let Err(e) = graph.release_resources() {
                    for outcome in report.outcomes.iter_mut() {
                        if matches!(outcome, ItemOutcome::Success) {
                            *outcome = ItemOutcome::Failure { node_id: Some(node_id), error: e.to_string() };
                        }
                    }
                    return report;
                }
            }
        }

        report
    }

    fn release_quietly(graph: &mut Graph<S>) {
        if let Err(e) = graph.release_resources() {
            tracing::warn!(error = %e, "release_resources failed during cancellation");
        }
    }

    fn union_topological_order(graph: &Graph<S>, targets: &[NodeId]) -> Result<Vec<NodeId>, FlowError> {
        let mut seen = std::collections::BTreeSet::new();
        let mut order = Vec::new();
        for &target in targets {
            for node_id in graph.topological_sort(target)? {
                if seen.insert(node_id) {
                    order.push(node_id);
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;
    use crate::error::NodeError;
    use crate::node::Node;
    use crate::schema::{ParamSpec, Signature};
    use crate::value::{FlowValue, ValueType};
    use flow_store::{InMemoryValueStore, Location};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    struct CountingNode {
        inits: Rc<RefCell<Vec<&'static str>>>,
        label: &'static str,
        fail_on: Option<usize>,
    }

    impl Node for CountingNode {
        fn name(&self) -> &str {
            self.label
        }
        fn version(&self) -> &str {
            "1"
        }
        fn signature(&self) -> Signature {
            Signature::stateless(vec![ParamSpec::new("x", ValueType::Int)], ValueType::Int)
        }
        fn init(&mut self) -> Result<(), crate::error::ResourceError> {
            self.inits.borrow_mut().push(self.label);
            Ok(())
        }
        fn process(&mut self, inputs: &BTreeMap<String, FlowValue>) -> Result<FlowValue, NodeError> {
            let x = inputs["x"].as_int().unwrap();
            if self.fail_on == Some(x as usize) {
                return Err(NodeError::new(0, None, std::io::Error::other("injected failure")));
            }
            Ok(FlowValue::Int(x + 1))
        }
    }

    fn build_chain(fail_on: Option<usize>) -> (Graph<InMemoryValueStore>, Rc<RefCell<Vec<&'static str>>>) {
        let mut g = Graph::new(InMemoryValueStore::new());
        let inits = Rc::new(RefCell::new(Vec::new()));
        g.add_constant_node(0, "item", FlowValue::Int(0)).unwrap();

        let mut b1 = BTreeMap::new();
        b1.insert("x".to_string(), Binding::node(0));
        g.add_node(1, Box::new(CountingNode { inits: inits.clone(), label: "n1", fail_on }), b1, BTreeMap::new())
            .unwrap();

        let mut b2 = BTreeMap::new();
        b2.insert("x".to_string(), Binding::node(1));
        g.add_node(2, Box::new(CountingNode { inits: inits.clone(), label: "n2", fail_on }), b2, BTreeMap::new())
            .unwrap();

        (g, inits)
    }

    fn prepare_item(graph: &mut Graph<InMemoryValueStore>, index: usize, item: &usize) -> Result<(), FlowError> {
        graph.persist(Location::new(format!("item-{index}"))).map_err(FlowError::Store)?;
        graph.set_constant(0, FlowValue::Int(*item as i64)).map_err(FlowError::Construction)
    }

    #[test]
    fn sweeps_breadth_first_one_node_across_all_items_before_the_next() {
        let (mut g, inits) = build_chain(None);
        let items = vec![0usize, 1, 2];

        let mut runner = BatchRunner::new(items, vec![2], prepare_item, NeverRelease, || false);
        let report = runner.run(&mut g);

        assert_eq!(report.successes(), 3);
        assert!(report.failures().is_empty());

        let trace = inits.borrow();
        assert_eq!(trace.as_slice(), &["n1", "n1", "n1", "n2", "n2", "n2"]);
    }

    #[test]
    fn a_single_item_failure_does_not_abort_the_rest_of_the_batch() {
        let (mut g, _inits) = build_chain(Some(1));
        let items = vec![0usize, 1, 2];

        let mut runner = BatchRunner::new(items, vec![2], prepare_item, NeverRelease, || false);
        let report = runner.run(&mut g);

        assert_eq!(report.successes(), 2);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1, "item index 1 is the one that was set to fail");
    }

    #[test]
    fn release_after_every_level_still_initializes_each_node_once_per_item() {
        let (mut g, inits) = build_chain(None);
        let items = vec![0usize, 1];

        let mut runner = BatchRunner::new(items, vec![2], prepare_item, ReleaseAfterEveryLevel, || false);
        runner.run(&mut g);

        // n1 initializes once per item at its level, likewise n2 — release between
        // levels resets lifecycle but does not cause re-init *within* a level.
        assert_eq!(inits.borrow().iter().filter(|&&l| l == "n1").count(), 2);
        assert_eq!(inits.borrow().iter().filter(|&&l| l == "n2").count(), 2);
    }
}
