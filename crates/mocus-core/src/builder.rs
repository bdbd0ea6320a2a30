//! Tree builder
//!
//! Converts an externally supplied symbolic formula DAG into the indexed
//! graph. Event references resolve through a name-to-index map, with an
//! optional substitution map that redirects common-cause basic events to
//! pre-built sub-gate indices. Each nested formula becomes a freshly
//! indexed gate.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::error::{FaultTreeError, Result};
use crate::graph::{FaultTreeGraph, Gate, GateType};

/// A symbolic Boolean formula as delivered by the model layer.
///
/// The type is carried as a string so that the builder, not the caller,
/// owns the set of supported connectives.
#[derive(Debug, Clone, Default)]
pub struct Formula {
    pub formula_type: String,
    pub vote_number: Option<usize>,
    pub event_args: Vec<String>,
    pub formula_args: Vec<Formula>,
}

impl Formula {
    pub fn new(formula_type: &str) -> Self {
        Self {
            formula_type: formula_type.to_string(),
            ..Default::default()
        }
    }

    /// Sets the vote number for an `atleast` formula.
    pub fn vote(mut self, vote_number: usize) -> Self {
        self.vote_number = Some(vote_number);
        self
    }

    /// Appends a named event argument.
    pub fn event(mut self, name: &str) -> Self {
        self.event_args.push(name.to_string());
        self
    }

    /// Appends a nested sub-formula.
    pub fn formula(mut self, sub: Formula) -> Self {
        self.formula_args.push(sub);
        self
    }
}

/// Builds the indexed graph for a set of named gate formulas.
///
/// `formulas` maps each named gate's pre-assigned index to its formula;
/// `top_index` selects the top event among them and doubles as the gate
/// index threshold, so every event index must lie below it. `event_index`
/// resolves event-argument names (basic events, house events, and named
/// gates alike); `substitutions` redirects basic-event names to synthetic
/// sub-gate indices prepared for common-cause groups.
pub fn build(
    top_index: i32,
    formulas: &IndexMap<i32, Formula>,
    event_index: &HashMap<String, i32>,
    substitutions: &HashMap<String, i32>,
) -> Result<FaultTreeGraph> {
    let mut graph = FaultTreeGraph::new(top_index);
    let highest = event_index
        .values()
        .chain(substitutions.values())
        .copied()
        .fold(top_index, i32::max);
    graph.seed_gate_index(highest.max((event_index.len() + substitutions.len()) as i32));

    for (&index, formula) in formulas {
        process_formula(&mut graph, index, formula, event_index, substitutions)?;
    }
    Ok(graph)
}

fn process_formula(
    graph: &mut FaultTreeGraph,
    index: i32,
    formula: &Formula,
    event_index: &HashMap<String, i32>,
    substitutions: &HashMap<String, i32>,
) -> Result<()> {
    debug_assert!(!graph.has_gate(index));
    let gate_type: GateType = formula.formula_type.parse()?;
    let mut gate = Gate::new(index, gate_type);
    if gate_type == GateType::Atleast {
        let vote = formula
            .vote_number
            .ok_or(FaultTreeError::MissingVoteNumber(index))?;
        gate.set_vote_number(vote);
    }

    for name in &formula.event_args {
        // Common-cause basic events point at their substitute gates.
        let child = match substitutions.get(name) {
            Some(&substitute) => substitute,
            None => *event_index
                .get(name)
                .ok_or_else(|| FaultTreeError::UnknownEvent(name.clone()))?,
        };
        if gate.children().contains(&child) || gate.children().contains(&-child) {
            return Err(FaultTreeError::DuplicateChild {
                gate: index,
                child,
            });
        }
        gate.init_child(child);
    }
    for sub in &formula.formula_args {
        let child = graph.fresh_gate_index();
        process_formula(graph, child, sub, event_index, substitutions)?;
        gate.init_child(child);
    }

    check_arity(&gate)?;
    graph.add_gate(gate);
    Ok(())
}

/// Rejects gates whose child count cannot be analyzed, before any
/// rewriting gets a chance to mask the problem.
fn check_arity(gate: &Gate) -> Result<()> {
    let size = gate.children().len();
    let wrong = |expected: &'static str| FaultTreeError::WrongChildCount {
        gate: gate.index(),
        gate_type: gate.gate_type(),
        expected,
        actual: size,
    };
    match gate.gate_type() {
        GateType::And | GateType::Or | GateType::Nand | GateType::Nor => {
            if size < 2 {
                return Err(wrong("2 or more"));
            }
        }
        GateType::Xor => {
            if size != 2 {
                return Err(wrong("exactly 2"));
            }
        }
        GateType::Not | GateType::Null => {
            if size != 1 {
                return Err(wrong("exactly 1"));
            }
        }
        GateType::Atleast => {
            let vote = gate.vote_number().unwrap_or(0);
            if vote < 1 || size <= vote {
                return Err(FaultTreeError::InvalidVoteNumber {
                    gate: gate.index(),
                    vote,
                    children: size,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(names: &[&str]) -> HashMap<String, i32> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as i32 + 1))
            .collect()
    }

    #[test]
    fn builds_flat_gate() {
        let mut index = events(&["a", "b"]);
        index.insert("top".to_string(), 3);
        let mut formulas = IndexMap::new();
        formulas.insert(3, Formula::new("or").event("a").event("b"));
        let graph = build(3, &formulas, &index, &HashMap::new()).unwrap();
        let top = graph.gate(3);
        assert_eq!(top.gate_type(), GateType::Or);
        assert_eq!(top.children().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn nested_formulas_get_fresh_indices() {
        let mut index = events(&["a", "b", "c"]);
        index.insert("top".to_string(), 4);
        let mut formulas = IndexMap::new();
        formulas.insert(
            4,
            Formula::new("or")
                .event("a")
                .formula(Formula::new("and").event("b").event("c")),
        );
        let graph = build(4, &formulas, &index, &HashMap::new()).unwrap();
        let top = graph.gate(4);
        assert_eq!(top.children().len(), 2);
        let nested = top.children().iter().copied().find(|&c| c > 4).unwrap();
        assert_eq!(graph.gate(nested).gate_type(), GateType::And);
        assert_eq!(
            graph.gate(nested).children().iter().copied().collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn substitution_redirects_common_cause_events() {
        let mut index = events(&["a", "b"]);
        index.insert("top".to_string(), 3);
        let mut formulas = IndexMap::new();
        formulas.insert(3, Formula::new("and").event("a").event("b"));
        let mut substitutions = HashMap::new();
        substitutions.insert("b".to_string(), 9);
        let graph = build(3, &formulas, &index, &substitutions).unwrap();
        assert!(graph.gate(3).children().contains(&9));
        assert!(!graph.gate(3).children().contains(&2));
    }

    #[test]
    fn unknown_event_is_reported() {
        let mut index = events(&["a"]);
        index.insert("top".to_string(), 2);
        let mut formulas = IndexMap::new();
        formulas.insert(2, Formula::new("or").event("a").event("ghost"));
        let err = build(2, &formulas, &index, &HashMap::new()).unwrap_err();
        assert_eq!(err, FaultTreeError::UnknownEvent("ghost".to_string()));
    }

    #[test]
    fn unknown_formula_type_is_reported() {
        let mut index = events(&["a", "b"]);
        index.insert("top".to_string(), 3);
        let mut formulas = IndexMap::new();
        formulas.insert(3, Formula::new("majority").event("a").event("b"));
        let err = build(3, &formulas, &index, &HashMap::new()).unwrap_err();
        assert_eq!(err, FaultTreeError::UnknownFormulaType("majority".to_string()));
    }

    #[test]
    fn duplicate_event_is_reported() {
        let mut index = events(&["a", "b"]);
        index.insert("top".to_string(), 3);
        let mut formulas = IndexMap::new();
        formulas.insert(3, Formula::new("or").event("a").event("a"));
        let err = build(3, &formulas, &index, &HashMap::new()).unwrap_err();
        assert_eq!(err, FaultTreeError::DuplicateChild { gate: 3, child: 1 });
    }

    #[test]
    fn atleast_needs_vote_number() {
        let mut index = events(&["a", "b", "c"]);
        index.insert("top".to_string(), 4);
        let mut formulas = IndexMap::new();
        formulas.insert(4, Formula::new("atleast").event("a").event("b").event("c"));
        let err = build(4, &formulas, &index, &HashMap::new()).unwrap_err();
        assert_eq!(err, FaultTreeError::MissingVoteNumber(4));
    }

    #[test]
    fn atleast_vote_must_be_below_child_count() {
        let mut index = events(&["a", "b", "c"]);
        index.insert("top".to_string(), 4);
        let mut formulas = IndexMap::new();
        formulas.insert(
            4,
            Formula::new("atleast").vote(3).event("a").event("b").event("c"),
        );
        let err = build(4, &formulas, &index, &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            FaultTreeError::InvalidVoteNumber {
                gate: 4,
                vote: 3,
                children: 3
            }
        );
    }

    #[test]
    fn single_child_or_is_rejected() {
        let mut index = events(&["a"]);
        index.insert("top".to_string(), 2);
        let mut formulas = IndexMap::new();
        formulas.insert(2, Formula::new("or").event("a"));
        let err = build(2, &formulas, &index, &HashMap::new()).unwrap_err();
        assert!(matches!(err, FaultTreeError::WrongChildCount { gate: 2, .. }));
    }
}
