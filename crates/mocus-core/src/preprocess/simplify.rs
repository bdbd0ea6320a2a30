//! Fixed-point simplification
//!
//! Three rewrites run in rotation until a full round changes nothing:
//! constant gates fold into their parents, single-child pass-through
//! gates are bypassed with signs composed, and same-type AND/AND or
//! OR/OR parent-child chains coalesce. Each rewrite strictly shrinks the
//! graph, so the loop terminates.

use tracing::debug;

use super::{process_constant_child, remove_children};
use crate::graph::{FaultTreeGraph, GateState, GateType};

pub(crate) fn simplify(graph: &mut FaultTreeGraph) {
    let top = graph.top_index();
    graph.clear_visits();
    remove_const_gates(graph, top);

    let mut tree_changed = true;
    while tree_changed {
        tree_changed = false;

        graph.clear_visits();
        if remove_null_gates(graph, top) {
            tree_changed = true;
        }
        graph.clear_visits();
        if join_gates(graph, top) {
            tree_changed = true;
        }
        graph.clear_visits();
        if remove_const_gates(graph, top) {
            tree_changed = true;
        }
    }
    debug!("simplification reached a fixed point");
}

/// Folds gates whose state collapsed to Null/Unity into their parents.
/// Returns true if anything changed; a true return with the gate itself
/// constant tells the caller to stop touching it.
fn remove_const_gates(graph: &mut FaultTreeGraph, index: i32) -> bool {
    if graph.gate(index).visited() {
        return false;
    }
    graph.gate_mut(index).visit(1);
    if graph.gate(index).state() != GateState::Normal {
        return false;
    }

    let mut changed = false;
    let mut to_erase = Vec::new();
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        if !graph.is_gate_index(child) {
            continue;
        }
        debug_assert!(child > 0);
        if remove_const_gates(graph, child) {
            changed = true;
        }
        let state = match graph.gate(child).state() {
            GateState::Normal => continue,
            GateState::Null => false,
            GateState::Unity => true,
        };
        if process_constant_child(graph, index, child, state, &mut to_erase) {
            return true; // This gate has itself become constant.
        }
    }
    if !to_erase.is_empty() {
        changed = true;
    }
    remove_children(graph, index, &to_erase);
    changed
}

/// Bypasses single-child pass-through gates, composing the edge signs.
fn remove_null_gates(graph: &mut FaultTreeGraph, index: i32) -> bool {
    if graph.gate(index).visited() {
        return false;
    }
    graph.gate_mut(index).visit(1);

    let mut changed = false;
    let mut null_children = Vec::new();
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        if !graph.is_gate_index(child) {
            continue;
        }
        if remove_null_gates(graph, child.abs()) {
            changed = true;
        }
        if graph.gate(child.abs()).gate_type() == GateType::Null {
            null_children.push(child);
        }
    }
    for child in null_children {
        if graph.gate(child.abs()).state() != GateState::Normal {
            continue; // Constant shells belong to the constant pass.
        }
        let grand = graph.gate(child.abs()).sole_child();
        let mult = child.signum();
        if !graph.gate_mut(index).swap_child(child, grand * mult) {
            return true; // The parent collapsed to a constant.
        }
        changed = true;
    }
    changed
}

/// Coalesces same-type parent/child chains. Module children stay intact:
/// they become opaque atoms for the cut-set engine.
fn join_gates(graph: &mut FaultTreeGraph, index: i32) -> bool {
    if graph.gate(index).visited() {
        return false;
    }
    graph.gate_mut(index).visit(1);

    let parent_type = graph.gate(index).gate_type();
    let mut changed = false;
    let mut to_join = Vec::new();
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        if !graph.is_gate_index(child) {
            continue;
        }
        if join_gates(graph, child.abs()) {
            changed = true;
        }
        if child < 0 {
            continue; // A complemented child gate cannot coalesce.
        }
        let child_gate = graph.gate(child);
        if child_gate.is_module() {
            continue;
        }
        let same_logic = match parent_type {
            GateType::Nand | GateType::And => child_gate.gate_type() == GateType::And,
            GateType::Nor | GateType::Or => child_gate.gate_type() == GateType::Or,
            _ => false,
        };
        if same_logic {
            to_join.push(child);
        }
    }
    if !to_join.is_empty() {
        changed = true;
    }
    for child in to_join {
        let grandchildren = graph.gate(child).children().clone();
        if !graph.gate_mut(index).join_gate(child, &grandchildren) {
            return true; // The parent collapsed to a constant.
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Gate;

    #[test]
    fn null_shell_is_bypassed() {
        // top = OR(a, NULL(-b)) becomes OR(a, -b).
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(11);
        let mut shell = Gate::new(11, GateType::Null);
        shell.init_child(-2);
        graph.add_gate(top);
        graph.add_gate(shell);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(
            graph.gate(10).children().iter().copied().collect::<Vec<_>>(),
            vec![-2, 1]
        );
    }

    #[test]
    fn negated_null_shell_composes_signs() {
        // top = OR(a, -NULL(b)) becomes OR(a, -b).
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(-11);
        let mut shell = Gate::new(11, GateType::Null);
        shell.init_child(2);
        graph.add_gate(top);
        graph.add_gate(shell);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(
            graph.gate(10).children().iter().copied().collect::<Vec<_>>(),
            vec![-2, 1]
        );
    }

    #[test]
    fn same_type_chains_coalesce() {
        // OR(a, OR(b, c)) flattens to OR(a, b, c).
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(11);
        let mut inner = Gate::new(11, GateType::Or);
        inner.init_child(2);
        inner.init_child(3);
        graph.add_gate(top);
        graph.add_gate(inner);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(
            graph.gate(10).children().iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn mixed_type_chains_stay() {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(11);
        let mut inner = Gate::new(11, GateType::And);
        inner.init_child(2);
        inner.init_child(3);
        graph.add_gate(top);
        graph.add_gate(inner);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(
            graph.gate(10).children().iter().copied().collect::<Vec<_>>(),
            vec![1, 11]
        );
    }

    #[test]
    fn unity_child_collapses_or_parent() {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(11);
        let mut inner = Gate::new(11, GateType::And);
        inner.init_child(2);
        inner.init_child(3);
        inner.make_unity();
        graph.add_gate(top);
        graph.add_gate(inner);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(graph.gate(10).state(), GateState::Unity);
    }

    #[test]
    fn null_child_drops_from_or_parent() {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(2);
        top.init_child(11);
        let mut inner = Gate::new(11, GateType::And);
        inner.nullify();
        graph.add_gate(top);
        graph.add_gate(inner);
        graph.seed_gate_index(11);

        simplify(&mut graph);
        assert_eq!(
            graph.gate(10).children().iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn cascaded_rewrites_reach_a_fixed_point() {
        // top = AND(a, OR(b, AND(c, unity-shell))) exercises all three
        // rewrites in one run.
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::And);
        top.init_child(1);
        top.init_child(11);
        let mut middle = Gate::new(11, GateType::Or);
        middle.init_child(2);
        middle.init_child(12);
        let mut inner = Gate::new(12, GateType::And);
        inner.init_child(3);
        inner.init_child(13);
        let mut unity = Gate::new(13, GateType::Or);
        unity.make_unity();
        graph.add_gate(top);
        graph.add_gate(middle);
        graph.add_gate(inner);
        graph.add_gate(unity);
        graph.seed_gate_index(13);

        simplify(&mut graph);
        // AND(c, unity) -> NULL(c) -> bypassed, so OR(b, c) remains.
        let top = graph.gate(10);
        assert_eq!(top.children().iter().copied().collect::<Vec<_>>(), vec![1, 11]);
        assert_eq!(
            graph.gate(11).children().iter().copied().collect::<Vec<_>>(),
            vec![2, 3]
        );
    }
}
