//! Module detection
//!
//! A module is a gate whose reachable basic events occur nowhere else in
//! the tree, so the cut-set engine can treat it as an opaque atom. One
//! DFS stamps enter/exit times on gates and first/last visit times on
//! basic events; a gate is a module exactly when every descendant's
//! interval nests strictly inside its own. Groups of non-shared children
//! are additionally lifted into fresh inner module gates.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::graph::{FaultTreeGraph, Gate, GateType};

pub(crate) fn detect_modules(graph: &mut FaultTreeGraph, num_basic_events: usize) {
    // Only AND/OR gates with positive gate edges remain at this stage.
    debug!("detecting modules in the fault tree");
    let mut visit_basics = vec![[0i32; 2]; num_basic_events + 1];
    graph.clear_visits();

    let top = graph.top_index();
    assign_timing(graph, 0, top, &mut visit_basics);
    trace!("visit times assigned");

    let mut visited_gates: HashMap<i32, (i32, i32)> = HashMap::new();
    find_modules(graph, top, &visit_basics, &mut visited_gates);
    debug_assert!(graph.gate(top).is_module());
    debug_assert_eq!(visited_gates[&top].0, 1);
    debug_assert!(!graph.gate(top).revisited());
    debug_assert_eq!(visited_gates[&top].1, graph.gate(top).exit_time());
}

fn assign_timing(
    graph: &mut FaultTreeGraph,
    time: i32,
    index: i32,
    visit_basics: &mut [[i32; 2]],
) -> i32 {
    let mut time = time + 1;
    if graph.gate_mut(index).visit(time) {
        return time; // A revisit through a shared gate.
    }
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        let child_index = child.abs();
        if !graph.is_gate_index(child_index) {
            time += 1;
            let stamps = &mut visit_basics[child_index as usize];
            if stamps[0] == 0 {
                stamps[0] = time;
            }
            stamps[1] = time;
        } else {
            time = assign_timing(graph, time, child_index, visit_basics);
        }
    }
    time += 1;
    let revisited = graph.gate_mut(index).visit(time);
    debug_assert!(!revisited); // A cycle would re-enter before exiting.
    time
}

fn find_modules(
    graph: &mut FaultTreeGraph,
    index: i32,
    visit_basics: &[[i32; 2]],
    visited_gates: &mut HashMap<i32, (i32, i32)>,
) {
    if visited_gates.contains_key(&index) {
        return;
    }
    let enter_time = graph.gate(index).enter_time();
    let exit_time = graph.gate(index).exit_time();
    let mut min_time = enter_time;
    let mut max_time = exit_time;

    let mut non_shared_children = Vec::new();
    let mut modular_children = Vec::new();
    let mut non_modular_children = Vec::new();
    let children: Vec<i32> = graph.gate(index).children().iter().copied().collect();
    for child in children {
        let child_index = child.abs();
        let (min, max);
        if !graph.is_gate_index(child_index) {
            min = visit_basics[child_index as usize][0];
            max = visit_basics[child_index as usize][1];
            if min == max {
                // Seen exactly once: owned by this gate alone.
                debug_assert!(min > enter_time && max < exit_time);
                non_shared_children.push(child);
                continue;
            }
        } else {
            debug_assert!(child > 0);
            find_modules(graph, child_index, visit_basics, visited_gates);
            let interval = visited_gates[&child_index];
            min = interval.0;
            max = interval.1;
            let child_gate = graph.gate(child_index);
            if child_gate.is_module() && !child_gate.revisited() {
                non_shared_children.push(child);
                continue;
            }
        }
        debug_assert!(min != 0 && max != 0);
        if min > enter_time && max < exit_time {
            modular_children.push(child);
        } else {
            non_modular_children.push(child);
        }
        min_time = min_time.min(min);
        max_time = max_time.max(max);
    }

    if min_time == enter_time && max_time == exit_time {
        trace!("found module {index}");
        debug_assert_eq!(
            modular_children.len() + non_shared_children.len(),
            graph.gate(index).children().len()
        );
        graph.gate_mut(index).mark_module();
    }
    if non_shared_children.len() > 1 {
        let module = create_module(graph, index, &non_shared_children);
        trace!("gate {index}: lifted {} non-shared children into {module:?}", non_shared_children.len());
    }
    // Modular children may share events among themselves through a
    // non-modular sibling; demote any whose interval overlaps one.
    filter_modular_children(
        graph,
        visit_basics,
        visited_gates,
        &mut modular_children,
        &mut non_modular_children,
    );
    if !modular_children.is_empty() {
        debug_assert!(modular_children.len() != 1); // One alone would be non-shared.
        let module = create_module(graph, index, &modular_children);
        trace!("gate {index}: grouped {} modular children into {module:?}", modular_children.len());
    }

    max_time = max_time.max(graph.gate(index).last_visit());
    visited_gates.insert(index, (min_time, max_time));
}

/// Moves a group of children under a fresh module gate of the parent's
/// type. A group covering every child just marks the parent itself.
fn create_module(graph: &mut FaultTreeGraph, parent: i32, children: &[i32]) -> Option<i32> {
    debug_assert!(children.len() > 1);
    debug_assert!(children.len() <= graph.gate(parent).children().len());
    if children.len() == graph.gate(parent).children().len() {
        graph.gate_mut(parent).mark_module();
        return None;
    }
    let parent_type = graph.gate(parent).gate_type();
    debug_assert!(matches!(parent_type, GateType::And | GateType::Or));
    let module_index = graph.fresh_gate_index();
    let mut module = Gate::new(module_index, parent_type);
    module.mark_module();
    graph.add_gate(module);
    for &child in children {
        graph.gate_mut(parent).erase_child(child);
        graph.gate_mut(module_index).init_child(child);
    }
    debug_assert!(!graph.gate(parent).children().is_empty());
    graph.gate_mut(parent).init_child(module_index);
    Some(module_index)
}

/// Demotes modular children whose visit interval overlaps a non-modular
/// sibling's, iterating until the partition is stable.
fn filter_modular_children(
    graph: &FaultTreeGraph,
    visit_basics: &[[i32; 2]],
    visited_gates: &HashMap<i32, (i32, i32)>,
    modular_children: &mut Vec<i32>,
    non_modular_children: &mut Vec<i32>,
) {
    if modular_children.is_empty() || non_modular_children.is_empty() {
        return;
    }
    let interval = |child: i32| -> (i32, i32) {
        let index = child.abs();
        if graph.is_gate_index(index) {
            debug_assert!(child > 0);
            visited_gates[&index]
        } else {
            let stamps = visit_basics[index as usize];
            (stamps[0], stamps[1])
        }
    };

    let mut still_modular = Vec::new();
    let mut new_non_modular = Vec::new();
    for &child in modular_children.iter() {
        let (min, max) = interval(child);
        let overlaps = non_modular_children.iter().any(|&sibling| {
            let (lower, upper) = interval(sibling);
            min.max(lower) <= max.min(upper)
        });
        if overlaps {
            new_non_modular.push(child);
        } else {
            still_modular.push(child);
        }
    }
    filter_modular_children(
        graph,
        visit_basics,
        visited_gates,
        &mut still_modular,
        &mut new_non_modular,
    );
    *modular_children = still_modular;
    non_modular_children.extend(new_non_modular);
}
