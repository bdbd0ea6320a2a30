//! Complement propagation
//!
//! Eliminates negative edges onto gates by De Morgan: a complemented
//! AND/OR child is replaced with a clone of inverted type and flipped
//! child signs. Clones are memoized by the index they negate so
//! shared complements reuse one clone. NOT and NULL shells encountered
//! on the way are spliced out with their sign composed into the edge.
//! After the pass, negative edges point only at basic events.

use std::collections::HashMap;

use crate::graph::{FaultTreeGraph, Gate, GateType};

pub(crate) fn propagate_complements(
    graph: &mut FaultTreeGraph,
    index: i32,
    gate_complements: &mut HashMap<i32, i32>,
) {
    // Every splice invalidates the child snapshot, so the scan restarts
    // until a full sweep leaves the gate untouched.
    'rescan: loop {
        let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
        for child in children {
            if !graph.is_gate_index(child) {
                continue;
            }
            let child_type = graph.gate(child.abs()).gate_type();
            if child_type == GateType::Not || child_type == GateType::Null {
                let grand = graph.gate(child.abs()).sole_child();
                let mut mult = if child_type == GateType::Not { -1 } else { 1 };
                mult *= child.signum();
                if !graph.gate_mut(index).swap_child(child, grand * mult) {
                    return; // The gate collapsed to a constant.
                }
                continue 'rescan;
            }
            if child < 0 {
                let replacement = match gate_complements.get(&-child) {
                    Some(&clone) => clone,
                    None => {
                        debug_assert!(matches!(child_type, GateType::And | GateType::Or));
                        let clone_type = if child_type == GateType::Or {
                            GateType::And
                        } else {
                            GateType::Or
                        };
                        let clone_index = graph.fresh_gate_index();
                        let mut clone = Gate::new(clone_index, clone_type);
                        clone.set_children(graph.gate(-child).children().clone());
                        clone.invert_children();
                        clone.visit(1);
                        graph.add_gate(clone);
                        gate_complements.insert(-child, clone_index);
                        propagate_complements(graph, clone_index, gate_complements);
                        clone_index
                    }
                };
                if !graph.gate_mut(index).swap_child(child, replacement) {
                    return;
                }
                continue 'rescan;
            }
            if !graph.gate(child).visited() {
                graph.gate_mut(child).visit(1);
                propagate_complements(graph, child, gate_complements);
            }
        }
        return;
    }
}
