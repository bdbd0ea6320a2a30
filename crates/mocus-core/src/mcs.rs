//! Minimal-cut-set generation
//!
//! A MOCUS-style top-down expansion over the preprocessed graph. Each
//! module expands independently into an OR-of-ANDs collection over its
//! basic events and inner module atoms; module results are memoized by
//! signed index, and the final pass multiplies module atoms back out to
//! leaf-only cut sets. The order limit prunes at every combination step,
//! which is the only thing standing between realistic trees and an
//! exponential candidate explosion.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::graph::{FaultTreeGraph, GateState, GateType};

/// Enumerates every minimal cut set of the preprocessed graph whose
/// basic-event count does not exceed `limit_order`.
///
/// Each returned set holds signed basic-event indices: a negative index
/// means the complement of that event is part of the implicant. A top
/// event that collapsed to constant false yields no cut sets; constant
/// true yields a single empty set.
pub fn find_minimal_cut_sets(graph: &FaultTreeGraph, limit_order: usize) -> Vec<BTreeSet<i32>> {
    debug!("finding minimal cut sets up to order {limit_order}");
    let top = graph.gate(graph.top_index());
    match top.state() {
        GateState::Null => return Vec::new(),
        GateState::Unity => return vec![BTreeSet::new()],
        GateState::Normal => {}
    }

    let mut engine = McsEngine::new(graph, limit_order);
    let with_modules = engine.expand_module(graph.top_index());
    let mut resolved = BTreeSet::new();
    for cut_set in with_modules {
        engine.substitute(cut_set, &mut resolved);
    }
    debug!("{} minimal cut sets found", resolved.len());
    resolved.into_iter().collect()
}

/// A candidate cut set during expansion: signed basic events plus signed
/// module atoms still awaiting substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
struct CutSet {
    basic_events: BTreeSet<i32>,
    modules: BTreeSet<i32>,
}

impl CutSet {
    /// The cardinality the order limit applies to.
    fn order(&self) -> usize {
        self.basic_events.len()
    }

    fn size(&self) -> usize {
        self.basic_events.len() + self.modules.len()
    }

    /// Adds a literal; false means the set now contains `x` and `¬x`
    /// and is contradictory.
    fn insert_basic(&mut self, event: i32) -> bool {
        if self.basic_events.contains(&-event) {
            return false;
        }
        self.basic_events.insert(event);
        true
    }

    fn insert_module(&mut self, module: i32) -> bool {
        if self.modules.contains(&-module) {
            return false;
        }
        self.modules.insert(module);
        true
    }

    fn is_subset(&self, other: &CutSet) -> bool {
        self.basic_events.is_subset(&other.basic_events) && self.modules.is_subset(&other.modules)
    }
}

/// The reduced gate form used only by this engine: AND/OR over three
/// disjoint child kinds.
#[derive(Debug)]
struct SimpleGate {
    gate_type: GateType,
    basic_events: Vec<i32>,
    modules: Vec<i32>,
    gates: Vec<Rc<SimpleGate>>,
}

struct McsEngine<'a> {
    graph: &'a FaultTreeGraph,
    limit_order: usize,
    /// Per-module results keyed by signed module index; the negation of
    /// an expanded module derives from it by De Morgan instead of a
    /// fresh traversal.
    module_cache: HashMap<i32, Vec<CutSet>>,
}

impl<'a> McsEngine<'a> {
    fn new(graph: &'a FaultTreeGraph, limit_order: usize) -> Self {
        Self {
            graph,
            limit_order,
            module_cache: HashMap::new(),
        }
    }

    /// Minimal cut sets of one module, memoized by signed index.
    fn expand_module(&mut self, signed_index: i32) -> Vec<CutSet> {
        if let Some(cached) = self.module_cache.get(&signed_index) {
            return cached.clone();
        }
        let sets = if signed_index < 0 {
            let positive = self.expand_module(-signed_index);
            self.complement_collection(&positive)
        } else {
            trace!("expanding module {signed_index}");
            let root = self.build_simple(signed_index, &mut HashMap::new());
            let mut candidates = Vec::new();
            self.expand_gate(&root, &mut candidates);
            minimize(candidates)
        };
        self.module_cache.insert(signed_index, sets.clone());
        sets
    }

    /// Clones a module's subtree into the simple-gate form, stopping at
    /// inner module boundaries.
    fn build_simple(
        &self,
        index: i32,
        processed: &mut HashMap<i32, Rc<SimpleGate>>,
    ) -> Rc<SimpleGate> {
        if let Some(existing) = processed.get(&index) {
            return Rc::clone(existing);
        }
        let gate = self.graph.gate(index);
        debug_assert!(matches!(gate.gate_type(), GateType::And | GateType::Or));
        let mut simple = SimpleGate {
            gate_type: gate.gate_type(),
            basic_events: Vec::new(),
            modules: Vec::new(),
            gates: Vec::new(),
        };
        for &child in gate.children() {
            if !self.graph.is_gate_index(child) {
                simple.basic_events.push(child);
            } else {
                debug_assert!(child > 0); // No negative gate edges survive preprocessing.
                if self.graph.gate(child).is_module() {
                    simple.modules.push(child);
                } else {
                    simple.gates.push(self.build_simple(child, processed));
                }
            }
        }
        let simple = Rc::new(simple);
        processed.insert(index, Rc::clone(&simple));
        simple
    }

    /// Emits the raw (unminimized) cut-set candidates of one simple gate.
    fn expand_gate(&self, gate: &SimpleGate, out: &mut Vec<CutSet>) {
        match gate.gate_type {
            GateType::Or => {
                for &event in &gate.basic_events {
                    let mut set = CutSet::default();
                    set.insert_basic(event);
                    out.push(set);
                }
                for &module in &gate.modules {
                    let mut set = CutSet::default();
                    set.insert_module(module);
                    out.push(set);
                }
                for sub in &gate.gates {
                    debug_assert_eq!(sub.gate_type, GateType::And);
                    self.expand_and(sub, CutSet::default(), out);
                }
            }
            GateType::And => self.expand_and(gate, CutSet::default(), out),
            other => debug_assert!(false, "simple gate typed {other}"),
        }
    }

    /// Distributes an AND gate over its OR children: every combination
    /// of the gate's own atoms with one pick from each OR child becomes
    /// a candidate. Contradictory and over-limit combinations are pruned
    /// the moment they arise.
    fn expand_and(&self, gate: &SimpleGate, base: CutSet, out: &mut Vec<CutSet>) {
        let mut acc = base;
        for &event in &gate.basic_events {
            if !acc.insert_basic(event) {
                return;
            }
        }
        if acc.order() > self.limit_order {
            return;
        }
        for &module in &gate.modules {
            if !acc.insert_module(module) {
                return;
            }
        }
        let pending: Vec<Rc<SimpleGate>> = gate.gates.to_vec();
        self.combine(&pending, acc, out);
    }

    /// Picks one alternative from the first pending OR child and recurses
    /// over the rest. An AND alternative contributes its atoms and queues
    /// its own OR children.
    fn combine(&self, pending: &[Rc<SimpleGate>], acc: CutSet, out: &mut Vec<CutSet>) {
        let Some((first, rest)) = pending.split_first() else {
            out.push(acc);
            return;
        };
        debug_assert_eq!(first.gate_type, GateType::Or);
        for &event in &first.basic_events {
            let mut set = acc.clone();
            if set.insert_basic(event) && set.order() <= self.limit_order {
                self.combine(rest, set, out);
            }
        }
        for &module in &first.modules {
            let mut set = acc.clone();
            if set.insert_module(module) {
                self.combine(rest, set, out);
            }
        }
        for sub in &first.gates {
            debug_assert_eq!(sub.gate_type, GateType::And);
            let mut set = acc.clone();
            if !sub.basic_events.iter().all(|&event| set.insert_basic(event)) {
                continue;
            }
            if set.order() > self.limit_order {
                continue;
            }
            if !sub.modules.iter().all(|&module| set.insert_module(module)) {
                continue;
            }
            let mut deeper = rest.to_vec();
            deeper.extend(sub.gates.iter().cloned());
            self.combine(&deeper, set, out);
        }
    }

    /// De Morgan complement of an OR-of-ANDs collection: the product of
    /// the negated clauses, expanded back into OR-of-ANDs form under the
    /// same order limit.
    fn complement_collection(&self, sets: &[CutSet]) -> Vec<CutSet> {
        let mut acc = vec![CutSet::default()];
        for set in sets {
            let mut next = Vec::new();
            for base in &acc {
                for &event in &set.basic_events {
                    let mut candidate = base.clone();
                    if candidate.insert_basic(-event) && candidate.order() <= self.limit_order {
                        next.push(candidate);
                    }
                }
                for &module in &set.modules {
                    let mut candidate = base.clone();
                    if candidate.insert_module(-module) {
                        next.push(candidate);
                    }
                }
            }
            next.sort();
            next.dedup();
            acc = next;
            if acc.is_empty() {
                break;
            }
        }
        minimize(acc)
    }

    /// Multiplies the module atoms of a cut set back out into leaf-only
    /// sets, reusing the memoized per-module results.
    fn substitute(&mut self, cut_set: CutSet, out: &mut BTreeSet<BTreeSet<i32>>) {
        let Some(&module) = cut_set.modules.iter().next() else {
            if cut_set.order() <= self.limit_order {
                out.insert(cut_set.basic_events);
            }
            return;
        };
        let mut rest = cut_set;
        rest.modules.remove(&module);
        for module_set in self.expand_module(module) {
            let mut combined = rest.clone();
            if !module_set
                .basic_events
                .iter()
                .all(|&event| combined.insert_basic(event))
            {
                continue;
            }
            if combined.order() > self.limit_order {
                continue;
            }
            if !module_set
                .modules
                .iter()
                .all(|&inner| combined.insert_module(inner))
            {
                continue;
            }
            self.substitute(combined, out);
        }
    }
}

/// Coherent view of a non-coherent result by the delete-term rule:
/// complemented literals drop out of every cut set and the collection is
/// re-minimized. The view is conservative; callers that track success
/// states keep working with the signed sets instead.
pub fn delete_term_approximation(cut_sets: &[BTreeSet<i32>]) -> Vec<BTreeSet<i32>> {
    let positive: Vec<CutSet> = cut_sets
        .iter()
        .map(|set| CutSet {
            basic_events: set.iter().copied().filter(|&event| event > 0).collect(),
            modules: BTreeSet::new(),
        })
        .collect();
    minimize(positive)
        .into_iter()
        .map(|set| set.basic_events)
        .collect()
}

/// Deduplicates candidates and keeps only the minimal ones: in ascending
/// cardinality order, a candidate survives iff no already-accepted set
/// is a subset of it.
fn minimize(mut candidates: Vec<CutSet>) -> Vec<CutSet> {
    candidates.sort();
    candidates.dedup();
    candidates.sort_by_key(CutSet::size);
    let mut minimal: Vec<CutSet> = Vec::new();
    'next_candidate: for candidate in candidates {
        for accepted in &minimal {
            if accepted.is_subset(&candidate) {
                continue 'next_candidate;
            }
        }
        minimal.push(candidate);
    }
    minimal
}
