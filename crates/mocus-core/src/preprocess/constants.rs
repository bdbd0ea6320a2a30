//! House-event constant propagation
//!
//! Folds the known truth values of house events into their parent gates
//! in one depth-first sweep. Runs on the raw built graph, before any
//! type normalization, so the full gate-type table applies. Constant
//! *gates* produced here are absorbed later by the simplification loop.

use std::collections::BTreeSet;
use tracing::debug;

use super::{is_normal, process_constant_child, remove_children};
use crate::graph::{FaultTreeGraph, GateState};

/// Propagates house-event constants through the graph.
///
/// `true_house` and `false_house` are disjoint sets of basic-event
/// indices. The operation is idempotent and a no-op on empty inputs.
pub fn propagate_constants(
    graph: &mut FaultTreeGraph,
    true_house: &BTreeSet<i32>,
    false_house: &BTreeSet<i32>,
) {
    if true_house.is_empty() && false_house.is_empty() {
        return;
    }
    debug_assert!(true_house.is_disjoint(false_house));
    debug!("propagating constants in the fault tree");
    graph.clear_visits();
    propagate(graph, graph.top_index(), true_house, false_house);
    debug!("constant propagation done");
}

fn propagate(
    graph: &mut FaultTreeGraph,
    index: i32,
    true_house: &BTreeSet<i32>,
    false_house: &BTreeSet<i32>,
) {
    if graph.gate(index).visited() {
        return;
    }
    graph.gate_mut(index).visit(1);

    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    let mut to_erase = Vec::new();
    for child in children {
        // The built graph has no negative edges yet.
        debug_assert!(child > 0);
        let state = if graph.is_gate_index(child) {
            propagate(graph, child, true_house, false_house);
            match graph.gate(child).state() {
                GateState::Normal => continue,
                GateState::Null => false,
                GateState::Unity => true,
            }
        } else if false_house.contains(&child) {
            false
        } else if true_house.contains(&child) {
            true
        } else {
            continue; // An ordinary basic event stays a variable.
        };
        if process_constant_child(graph, index, child, state, &mut to_erase) {
            return; // The gate itself collapsed to a constant.
        }
    }
    remove_children(graph, index, &to_erase);
    debug_assert!(is_normal(graph, index) || graph.gate(index).children().is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FaultTreeGraph, Gate, GateType};

    fn graph_with_top(gate_type: GateType, children: &[i32]) -> FaultTreeGraph {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, gate_type);
        for &child in children {
            top.init_child(child);
        }
        graph.add_gate(top);
        graph.seed_gate_index(10);
        graph
    }

    fn set(items: &[i32]) -> BTreeSet<i32> {
        items.iter().copied().collect()
    }

    #[test]
    fn false_child_nullifies_and_gate() {
        let mut graph = graph_with_top(GateType::And, &[1, 2]);
        propagate_constants(&mut graph, &set(&[]), &set(&[1]));
        assert_eq!(graph.gate(10).state(), GateState::Null);
    }

    #[test]
    fn true_child_drops_out_of_and_gate() {
        let mut graph = graph_with_top(GateType::And, &[1, 2, 3]);
        propagate_constants(&mut graph, &set(&[1]), &set(&[]));
        let top = graph.gate(10);
        assert_eq!(top.state(), GateState::Normal);
        assert_eq!(top.children().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn true_child_makes_or_gate_unity() {
        let mut graph = graph_with_top(GateType::Or, &[1, 2]);
        propagate_constants(&mut graph, &set(&[2]), &set(&[]));
        assert_eq!(graph.gate(10).state(), GateState::Unity);
    }

    #[test]
    fn false_child_reduces_or_gate_to_pass_through() {
        let mut graph = graph_with_top(GateType::Or, &[1, 2]);
        propagate_constants(&mut graph, &set(&[]), &set(&[2]));
        let top = graph.gate(10);
        assert_eq!(top.gate_type(), GateType::Null);
        assert_eq!(top.sole_child(), 1);
    }

    #[test]
    fn xor_with_true_child_becomes_not_of_the_other() {
        let mut graph = graph_with_top(GateType::Xor, &[1, 2]);
        propagate_constants(&mut graph, &set(&[1]), &set(&[]));
        let top = graph.gate(10);
        assert_eq!(top.gate_type(), GateType::Not);
        assert_eq!(top.sole_child(), 2);
    }

    #[test]
    fn xor_with_false_and_true_children_is_unity() {
        let mut graph = graph_with_top(GateType::Xor, &[1, 2]);
        propagate_constants(&mut graph, &set(&[2]), &set(&[1]));
        assert_eq!(graph.gate(10).state(), GateState::Unity);
    }

    #[test]
    fn atleast_with_true_child_lowers_the_vote() {
        let mut graph = graph_with_top(GateType::Atleast, &[1, 2, 3]);
        graph.gate_mut(10).set_vote_number(2);
        propagate_constants(&mut graph, &set(&[1]), &set(&[]));
        let top = graph.gate(10);
        assert_eq!(top.gate_type(), GateType::Or);
        assert_eq!(top.children().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn atleast_with_false_child_tightens_to_and() {
        let mut graph = graph_with_top(GateType::Atleast, &[1, 2, 3]);
        graph.gate_mut(10).set_vote_number(2);
        propagate_constants(&mut graph, &set(&[]), &set(&[3]));
        let top = graph.gate(10);
        assert_eq!(top.gate_type(), GateType::And);
        assert_eq!(top.children().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn constant_gate_state_flows_upward() {
        // top = AND(a, OR(h, b)) with h true: the OR is unity and drops.
        let mut graph = graph_with_top(GateType::And, &[1, 11]);
        let mut inner = Gate::new(11, GateType::Or);
        inner.init_child(2);
        inner.init_child(3);
        graph.add_gate(inner);
        graph.seed_gate_index(11);
        propagate_constants(&mut graph, &set(&[2]), &set(&[]));
        let top = graph.gate(10);
        assert_eq!(top.gate_type(), GateType::Null);
        assert_eq!(top.sole_child(), 1);
    }

    #[test]
    fn empty_inputs_are_a_no_op() {
        let mut graph = graph_with_top(GateType::And, &[1, 2]);
        let before = graph.clone();
        propagate_constants(&mut graph, &set(&[]), &set(&[]));
        assert_eq!(graph, before);
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut graph = graph_with_top(GateType::Or, &[1, 2, 3]);
        propagate_constants(&mut graph, &set(&[]), &set(&[2]));
        let mut again = graph.clone();
        propagate_constants(&mut again, &set(&[]), &set(&[2]));
        again.clear_visits();
        graph.clear_visits();
        assert_eq!(again, graph);
    }
}
