//! Preprocessing passes over the indexed fault tree
//!
//! The pipeline runs in a fixed order: structural validation, gate-type
//! normalization, complement propagation, a fixed-point simplification
//! loop, and module detection. House-event constants are propagated by a
//! separate public operation that the analysis driver runs before this
//! pipeline.
//!
//! # Pass Categories
//!
//! - **Normalization**: `normalize` - NOR/NAND/NOT/NULL sign push-down,
//!   XOR and ATLEAST decomposition
//! - **Constants**: `constants` - house-event truth values folded into
//!   parent gates
//! - **Complements**: `complements` - De Morgan clones for negative gate
//!   edges
//! - **Simplification**: `simplify` - constant/null removal and same-type
//!   coalescing to a fixed point
//! - **Modularity**: `modules` - DFS visit-interval module detection

mod complements;
mod constants;
mod modules;
mod normalize;
mod simplify;

pub use constants::propagate_constants;

use std::collections::HashMap;
use tracing::debug;

use crate::error::{FaultTreeError, Result};
use crate::graph::{FaultTreeGraph, GateState, GateType};

/// Runs the full preprocessing pipeline.
///
/// `num_basic_events` sizes the per-basic-event visit-interval table for
/// module detection; it must be at least the highest basic-event index in
/// the graph. On return every reachable gate is AND/OR with two or more
/// children, except for a top gate that collapsed to a constant or to a
/// single-literal shell.
pub fn preprocess(graph: &mut FaultTreeGraph, num_basic_events: usize) -> Result<()> {
    validate(graph)?;

    debug!("normalizing gates");
    debug_assert_eq!(graph.top_sign(), 1);
    normalize::normalize_gates(graph);
    debug!("finished normalizing gates");

    if graph.top_sign() < 0 {
        let top_index = graph.top_index();
        let top = graph.gate_mut(top_index);
        debug_assert!(matches!(top.gate_type(), GateType::And | GateType::Or));
        let inverted = if top.gate_type() == GateType::Or {
            GateType::And
        } else {
            GateType::Or
        };
        top.set_type(inverted);
        top.invert_children();
        graph.set_top_sign(1);
    }

    graph.clear_visits();
    let mut gate_complements = HashMap::new();
    complements::propagate_complements(graph, graph.top_index(), &mut gate_complements);

    simplify::simplify(graph);

    let top = graph.gate(graph.top_index());
    if top.children().is_empty() {
        return Ok(()); // The top event is constant false or true.
    }
    modules::detect_modules(graph, num_basic_events);
    Ok(())
}

/// Checks the graph for structural defects and rebuilds parent
/// back-references from the top.
///
/// Cycles and dangling gate indices are fatal. Gate records with no
/// parent after the rebuild are unreachable leftovers; they are reported
/// through the debug hook and otherwise ignored.
fn validate(graph: &mut FaultTreeGraph) -> Result<()> {
    graph.clear_parents();
    let mut colors: HashMap<i32, Color> = HashMap::new();
    check_gate(graph, graph.top_index(), &mut colors)?;

    let top_index = graph.top_index();
    let orphans = graph
        .gates()
        .filter(|gate| gate.index() != top_index && gate.parents().is_empty())
        .count();
    if orphans > 0 {
        debug!("{orphans} gate records are unreachable from the top event");
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    OnPath,
    Done,
}

fn check_gate(graph: &mut FaultTreeGraph, index: i32, colors: &mut HashMap<i32, Color>) -> Result<()> {
    colors.insert(index, Color::OnPath);
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        let child_index = child.abs();
        if !graph.is_gate_index(child_index) {
            continue;
        }
        if !graph.has_gate(child_index) {
            return Err(FaultTreeError::DanglingIndex {
                gate: index,
                child: child_index,
            });
        }
        graph.gate_mut(child_index).add_parent(index);
        match colors.get(&child_index) {
            Some(Color::OnPath) => return Err(FaultTreeError::CycleDetected(child_index)),
            Some(Color::Done) => continue,
            None => check_gate(graph, child_index, colors)?,
        }
    }
    colors.insert(index, Color::Done);
    Ok(())
}

/// Folds one constant-valued child into its parent gate.
///
/// `state` is the child's truth value after following the edge sign.
/// Children that merely drop out are queued in `to_erase`; the return
/// value is true when the parent itself collapsed to a constant, in
/// which case its children are already cleared and the caller must stop.
pub(crate) fn process_constant_child(
    graph: &mut FaultTreeGraph,
    parent: i32,
    child: i32,
    state: bool,
    to_erase: &mut Vec<i32>,
) -> bool {
    let gate = graph.gate_mut(parent);
    if !state {
        match gate.gate_type() {
            GateType::Nor | GateType::Xor | GateType::Or => {
                to_erase.push(child);
                return false;
            }
            GateType::Null | GateType::And => gate.nullify(),
            GateType::Nand | GateType::Not => gate.make_unity(),
            GateType::Atleast => {
                // K / (N - 1).
                to_erase.push(child);
                let vote = gate.vote_number().expect("atleast gate without vote");
                let size = gate.children().len() - to_erase.len();
                if vote == size {
                    gate.set_type(GateType::And);
                }
                return false;
            }
        }
    } else {
        match gate.gate_type() {
            GateType::Null | GateType::Or => gate.make_unity(),
            GateType::Nand | GateType::And => {
                to_erase.push(child);
                return false;
            }
            GateType::Nor | GateType::Not => gate.nullify(),
            GateType::Xor => {
                // The internal negation needs special handling.
                debug_assert!(gate.children().len() == 2);
                if to_erase.len() == 1 {
                    // The other child is already known false.
                    gate.make_unity();
                } else {
                    debug_assert!(to_erase.is_empty());
                    gate.set_type(GateType::Not);
                    to_erase.push(child);
                    return false;
                }
            }
            GateType::Atleast => {
                // (K - 1) / (N - 1); only valid for a positive literal.
                debug_assert!(child > 0);
                let vote = gate.vote_number().expect("atleast gate without vote") - 1;
                if vote == 1 {
                    gate.set_type(GateType::Or);
                }
                gate.set_vote_number(vote);
                to_erase.push(child);
                return false;
            }
        }
    }
    true
}

/// Erases the queued children and re-types a gate left with fewer than
/// two children: an empty gate becomes its absorbing constant, a
/// single-child gate becomes a pass-through NULL or a NOT.
pub(crate) fn remove_children(graph: &mut FaultTreeGraph, parent: i32, to_erase: &[i32]) {
    if to_erase.is_empty() {
        return;
    }
    let gate = graph.gate_mut(parent);
    debug_assert!(to_erase.len() <= gate.children().len());
    for &child in to_erase {
        gate.erase_child(child);
    }
    if gate.children().is_empty() {
        match gate.gate_type() {
            GateType::Nand | GateType::Xor | GateType::Or => gate.nullify(),
            GateType::Nor | GateType::And => gate.make_unity(),
            other => debug_assert!(
                !matches!(other, GateType::Not | GateType::Null | GateType::Atleast),
                "gate {parent} emptied while typed {other}"
            ),
        }
    } else if gate.children().len() == 1 {
        match gate.gate_type() {
            GateType::Xor | GateType::Or | GateType::And => gate.set_type(GateType::Null),
            GateType::Nor | GateType::Nand => gate.set_type(GateType::Not),
            GateType::Not | GateType::Null => {}
            GateType::Atleast => debug_assert!(false, "atleast gate {parent} left with one child"),
        }
    }
}

/// True when a gate still carries its defining children.
pub(crate) fn is_normal(graph: &FaultTreeGraph, index: i32) -> bool {
    graph.gate(index).state() == GateState::Normal
}
