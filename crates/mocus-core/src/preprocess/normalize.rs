//! Gate-type normalization
//!
//! Rewrites every gate type into AND/OR form. Top-level NOR/NAND/NOT
//! negations accumulate into the graph's top-event sign; internal
//! NOR/NAND gates push their negation up into the parent's edge sign;
//! XOR and ATLEAST gates decompose into freshly allocated AND/OR
//! structure. NOT and NULL gates below the top are left for complement
//! propagation to absorb.

use crate::graph::{FaultTreeGraph, Gate, GateState, GateType};

pub(crate) fn normalize_gates(graph: &mut FaultTreeGraph) {
    // The top event is special: its negation folds into the top sign
    // instead of an edge, and NOT/NULL tops re-root the graph.
    loop {
        let top_index = graph.top_index();
        match graph.gate(top_index).gate_type() {
            GateType::Nor => {
                graph.set_top_sign(-graph.top_sign());
                graph.gate_mut(top_index).set_type(GateType::Or);
                break;
            }
            GateType::Nand => {
                graph.set_top_sign(-graph.top_sign());
                graph.gate_mut(top_index).set_type(GateType::And);
                break;
            }
            not_or_null @ (GateType::Not | GateType::Null) => {
                if not_or_null == GateType::Not {
                    graph.set_top_sign(-graph.top_sign());
                }
                let child = graph.gate(top_index).sole_child();
                debug_assert!(child > 0);
                if graph.is_gate_index(child) {
                    graph.remove_gate(top_index);
                    graph.set_top_index(child);
                    continue; // Handles NOT->NOT chains.
                }
                // A lone basic event under the top: keep a single-child
                // OR shell so the graph still roots at a gate.
                graph.gate_mut(top_index).set_type(GateType::Or);
                break;
            }
            _ => break,
        }
    }

    graph.clear_visits();
    mark_negative_gate_edges(graph, graph.top_index());

    graph.clear_visits();
    normalize_gate(graph, graph.top_index());
}

/// Moves the negation of NOR/NAND child gates into the parent's edge
/// sign; the type rewrite itself happens in [`normalize_gate`].
fn mark_negative_gate_edges(graph: &mut FaultTreeGraph, index: i32) {
    if graph.gate(index).visited() {
        return;
    }
    graph.gate_mut(index).visit(1);

    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    let mut to_negate = Vec::new();
    for child in children {
        if !graph.is_gate_index(child) {
            continue;
        }
        mark_negative_gate_edges(graph, child.abs());
        let child_type = graph.gate(child.abs()).gate_type();
        if child_type == GateType::Nor || child_type == GateType::Nand {
            to_negate.push(child);
        }
    }
    for child in to_negate {
        let swapped = graph.gate_mut(index).swap_child(child, -child);
        debug_assert!(swapped);
    }
}

fn normalize_gate(graph: &mut FaultTreeGraph, index: i32) {
    if graph.gate(index).visited() {
        return;
    }
    graph.gate_mut(index).visit(1);

    // Depth-first before this gate's children get rewritten.
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        if graph.is_gate_index(child) {
            normalize_gate(graph, child.abs());
        }
    }

    if graph.gate(index).state() != GateState::Normal {
        return; // Constant gates have nothing left to normalize.
    }
    match graph.gate(index).gate_type() {
        // The negation is already on the parent edge.
        GateType::Nor | GateType::Or => graph.gate_mut(index).set_type(GateType::Or),
        GateType::Nand | GateType::And => graph.gate_mut(index).set_type(GateType::And),
        GateType::Xor => normalize_xor(graph, index),
        GateType::Atleast => normalize_atleast(graph, index),
        GateType::Not | GateType::Null => {} // Absorbed by complement propagation.
    }
}

/// `a ⊕ b` becomes `(a·¬b) ∨ (¬a·b)` over two fresh AND gates.
fn normalize_xor(graph: &mut FaultTreeGraph, index: i32) {
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    debug_assert_eq!(children.len(), 2);

    let one_index = graph.fresh_gate_index();
    let two_index = graph.fresh_gate_index();
    let mut gate_one = Gate::new(one_index, GateType::And);
    gate_one.init_child(children[0]);
    gate_one.init_child(-children[1]);
    let mut gate_two = Gate::new(two_index, GateType::And);
    gate_two.init_child(-children[0]);
    gate_two.init_child(children[1]);
    graph.add_gate(gate_one);
    graph.add_gate(gate_two);

    let gate = graph.gate_mut(index);
    gate.set_type(GateType::Or);
    gate.erase_all_children();
    gate.init_child(one_index);
    gate.init_child(two_index);
}

/// Shannon expansion on the first child:
/// `atleast(k, {c} ∪ R) ≡ (c · atleast(k-1, R)) ∨ atleast(k, R)`.
fn normalize_atleast(graph: &mut FaultTreeGraph, index: i32) {
    let vote = graph
        .gate(index)
        .vote_number()
        .expect("atleast gate without vote");
    debug_assert!(vote >= 1);
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    debug_assert!(children.len() > 1);

    if children.len() == vote {
        graph.gate_mut(index).set_type(GateType::And);
        return;
    }
    if vote == 1 {
        graph.gate_mut(index).set_type(GateType::Or);
        return;
    }

    let first = children[0];
    let first_index = graph.fresh_gate_index();
    let grand_index = graph.fresh_gate_index();
    let second_index = graph.fresh_gate_index();

    let mut first_child = Gate::new(first_index, GateType::And);
    first_child.init_child(first);
    first_child.init_child(grand_index);

    let mut grand_child = Gate::new(grand_index, GateType::Atleast);
    grand_child.set_vote_number(vote - 1);
    let mut second_child = Gate::new(second_index, GateType::Atleast);
    second_child.set_vote_number(vote);
    for &rest in &children[1..] {
        grand_child.init_child(rest);
        second_child.init_child(rest);
    }

    graph.add_gate(first_child);
    graph.add_gate(grand_child);
    graph.add_gate(second_child);

    let gate = graph.gate_mut(index);
    gate.set_type(GateType::Or);
    gate.erase_all_children();
    gate.init_child(first_index);
    gate.init_child(second_index);

    normalize_atleast(graph, grand_index);
    normalize_atleast(graph, second_index);
}
