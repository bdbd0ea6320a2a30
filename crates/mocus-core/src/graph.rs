//! Indexed fault-tree graph
//!
//! The graph is a flat map from positive integer indices to gate records.
//! Basic events occupy indices below `first_gate_index` and have no
//! records of their own; gates occupy indices at or above it. Child
//! references are signed: a negative index denotes the logical complement
//! of the referenced node, which keeps explicit NOT nodes out of the
//! internal representation. Index `0` is never valid.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::FaultTreeError;

/// Boolean operator carried by a gate.
///
/// After preprocessing only `And` and `Or` remain on reachable gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateType {
    And,
    Or,
    Atleast,
    Xor,
    Not,
    Nand,
    Nor,
    Null,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateType::And => "and",
            GateType::Or => "or",
            GateType::Atleast => "atleast",
            GateType::Xor => "xor",
            GateType::Not => "not",
            GateType::Nand => "nand",
            GateType::Nor => "nor",
            GateType::Null => "null",
        };
        f.write_str(name)
    }
}

impl FromStr for GateType {
    type Err = FaultTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(GateType::And),
            "or" => Ok(GateType::Or),
            "atleast" => Ok(GateType::Atleast),
            "xor" => Ok(GateType::Xor),
            "not" => Ok(GateType::Not),
            "nand" => Ok(GateType::Nand),
            "nor" => Ok(GateType::Nor),
            "null" => Ok(GateType::Null),
            other => Err(FaultTreeError::UnknownFormulaType(other.to_string())),
        }
    }
}

/// Constant-value state of a gate.
///
/// `Null` is constant false, `Unity` constant true. A constant gate
/// carries no semantic children; parents absorb it during preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Normal,
    Null,
    Unity,
}

/// A gate record in the indexed graph.
///
/// Children are kept in an ordered set of signed indices; the same child
/// must not appear twice under any sign. Parent back-references are a
/// lookup aid rebuilt by traversal, not an ownership edge, and may go
/// stale between passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    index: i32,
    gate_type: GateType,
    state: GateState,
    vote_number: Option<usize>,
    children: BTreeSet<i32>,
    parents: BTreeSet<i32>,
    module: bool,
    /// Enter, exit, and last-revisit timestamps of the current DFS pass.
    visits: [i32; 3],
}

impl Gate {
    pub fn new(index: i32, gate_type: GateType) -> Self {
        debug_assert!(index > 0);
        Self {
            index,
            gate_type,
            state: GateState::Normal,
            vote_number: None,
            children: BTreeSet::new(),
            parents: BTreeSet::new(),
            module: false,
            visits: [0; 3],
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn gate_type(&self) -> GateType {
        self.gate_type
    }

    pub fn set_type(&mut self, gate_type: GateType) {
        self.gate_type = gate_type;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn vote_number(&self) -> Option<usize> {
        self.vote_number
    }

    pub fn set_vote_number(&mut self, vote: usize) {
        self.vote_number = Some(vote);
    }

    pub fn children(&self) -> &BTreeSet<i32> {
        &self.children
    }

    /// Replaces the whole child set. Used when cloning a gate for
    /// complement propagation.
    pub fn set_children(&mut self, children: BTreeSet<i32>) {
        self.children = children;
    }

    /// The only child of a single-child gate (NOT/NULL shells).
    pub fn sole_child(&self) -> i32 {
        debug_assert_eq!(self.children.len(), 1);
        *self.children.iter().next().expect("gate has no children")
    }

    /// Adds a child during construction, where complement pairs are a
    /// client error caught by the builder, not a rewrite opportunity.
    pub fn init_child(&mut self, child: i32) {
        debug_assert_ne!(child, 0);
        debug_assert!(!self.children.contains(&child) && !self.children.contains(&-child));
        self.children.insert(child);
    }

    /// Adds a child to an AND/OR gate during rewriting.
    ///
    /// Inserting the complement of an existing child collapses the gate
    /// to its absorbing constant (`x ∨ ¬x` is Unity, `x ∧ ¬x` is Null)
    /// and returns false; the caller must stop rewriting this gate.
    pub fn add_child(&mut self, child: i32) -> bool {
        debug_assert_ne!(child, 0);
        debug_assert!(matches!(self.gate_type, GateType::And | GateType::Or));
        if self.children.contains(&-child) {
            self.state = if self.gate_type == GateType::Or {
                GateState::Unity
            } else {
                GateState::Null
            };
            self.children.clear();
            return false;
        }
        self.children.insert(child);
        true
    }

    /// Replaces one child edge with another, composing constant collapse
    /// the same way as [`Gate::add_child`] for AND/OR gates. Other gate
    /// types swap the edge verbatim.
    pub fn swap_child(&mut self, existing: i32, new_child: i32) -> bool {
        let removed = self.children.remove(&existing);
        debug_assert!(removed);
        match self.gate_type {
            GateType::And | GateType::Or => self.add_child(new_child),
            _ => {
                debug_assert!(!self.children.contains(&-new_child));
                self.children.insert(new_child);
                true
            }
        }
    }

    /// Flips the sign of every child edge.
    pub fn invert_children(&mut self) {
        let inverted = self.children.iter().map(|&c| -c).collect();
        self.children = inverted;
    }

    pub fn erase_child(&mut self, child: i32) {
        let removed = self.children.remove(&child);
        debug_assert!(removed);
    }

    pub fn erase_all_children(&mut self) {
        self.children.clear();
    }

    /// Absorbs a same-type child gate: the edge to `child_index` is
    /// dropped and the grandchildren are adopted directly. Returns false
    /// if a grandchild's complement collapses this gate to a constant.
    pub fn join_gate(&mut self, child_index: i32, grandchildren: &BTreeSet<i32>) -> bool {
        self.children.remove(&child_index);
        for &child in grandchildren {
            if !self.add_child(child) {
                return false;
            }
        }
        true
    }

    /// Turns the gate into constant false.
    pub fn nullify(&mut self) {
        self.state = GateState::Null;
        self.children.clear();
    }

    /// Turns the gate into constant true.
    pub fn make_unity(&mut self) {
        self.state = GateState::Unity;
        self.children.clear();
    }

    pub fn is_module(&self) -> bool {
        self.module
    }

    pub fn mark_module(&mut self) {
        self.module = true;
    }

    pub fn parents(&self) -> &BTreeSet<i32> {
        &self.parents
    }

    pub fn add_parent(&mut self, parent: i32) {
        self.parents.insert(parent);
    }

    pub fn clear_parents(&mut self) {
        self.parents.clear();
    }

    /// Registers a DFS visit at `time`.
    ///
    /// The first call stamps the enter time, the second the exit time.
    /// Any later call records a revisit and returns true.
    pub fn visit(&mut self, time: i32) -> bool {
        if self.visits[0] == 0 {
            self.visits[0] = time;
            false
        } else if self.visits[1] == 0 {
            self.visits[1] = time;
            false
        } else {
            self.visits[2] = time;
            true
        }
    }

    pub fn visited(&self) -> bool {
        self.visits[0] != 0
    }

    pub fn revisited(&self) -> bool {
        self.visits[2] != 0
    }

    pub fn enter_time(&self) -> i32 {
        self.visits[0]
    }

    pub fn exit_time(&self) -> i32 {
        self.visits[1]
    }

    /// The latest visit of the current pass, revisit or exit.
    pub fn last_visit(&self) -> i32 {
        if self.visits[2] != 0 {
            self.visits[2]
        } else {
            self.visits[1]
        }
    }

    pub fn clear_visits(&mut self) {
        self.visits = [0; 3];
    }
}

/// The indexed fault tree: gate records addressed by positive index,
/// plus the top-event index and the sign accumulated while normalizing
/// top-level negations.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultTreeGraph {
    gates: IndexMap<i32, Gate>,
    top_index: i32,
    first_gate_index: i32,
    last_gate_index: i32,
    top_sign: i32,
}

impl FaultTreeGraph {
    /// Creates an empty graph whose gate indices start at `top_index`.
    ///
    /// Every index below `top_index` is read as a basic event.
    pub fn new(top_index: i32) -> Self {
        debug_assert!(top_index > 0);
        Self {
            gates: IndexMap::new(),
            top_index,
            first_gate_index: top_index,
            last_gate_index: top_index,
            top_sign: 1,
        }
    }

    pub fn top_index(&self) -> i32 {
        self.top_index
    }

    pub fn set_top_index(&mut self, index: i32) {
        debug_assert!(self.is_gate_index(index));
        self.top_index = index;
    }

    pub fn top_sign(&self) -> i32 {
        self.top_sign
    }

    pub fn set_top_sign(&mut self, sign: i32) {
        debug_assert!(sign == 1 || sign == -1);
        self.top_sign = sign;
    }

    pub fn first_gate_index(&self) -> i32 {
        self.first_gate_index
    }

    /// True iff the signed index refers to a gate rather than a basic
    /// event.
    pub fn is_gate_index(&self, index: i32) -> bool {
        debug_assert_ne!(index, 0);
        index.abs() >= self.first_gate_index
    }

    /// Seeds the fresh-index counter above every index the client has
    /// already assigned.
    pub fn seed_gate_index(&mut self, last_used: i32) {
        self.last_gate_index = self.last_gate_index.max(last_used);
    }

    /// Allocates the next unused gate index.
    pub fn fresh_gate_index(&mut self) -> i32 {
        self.last_gate_index += 1;
        self.last_gate_index
    }

    pub fn add_gate(&mut self, gate: Gate) {
        debug_assert!(!self.gates.contains_key(&gate.index()));
        self.gates.insert(gate.index(), gate);
    }

    pub fn has_gate(&self, index: i32) -> bool {
        self.gates.contains_key(&index.abs())
    }

    /// Looks up a gate record. A missing index is a programmer error and
    /// panics.
    pub fn gate(&self, index: i32) -> &Gate {
        debug_assert!(index > 0);
        &self.gates[&index]
    }

    pub fn gate_mut(&mut self, index: i32) -> &mut Gate {
        debug_assert!(index > 0);
        &mut self.gates[&index]
    }

    /// Drops a gate record. Used when re-rooting the top event.
    pub fn remove_gate(&mut self, index: i32) {
        self.gates.shift_remove(&index);
    }

    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values()
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Resets the DFS visit stamps of every gate before a new pass.
    pub fn clear_visits(&mut self) {
        for gate in self.gates.values_mut() {
            gate.clear_visits();
        }
    }

    /// Drops all parent back-references before a traversal rebuilds them.
    pub fn clear_parents(&mut self) {
        for gate in self.gates.values_mut() {
            gate.clear_parents();
        }
    }
}
