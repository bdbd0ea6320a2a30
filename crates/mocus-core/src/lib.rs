//! # mocus-core
//!
//! Fault-tree analysis core: an indexed-graph preprocessor and a
//! MOCUS-style minimal-cut-set engine.
//!
//! The crate takes a symbolic Boolean formula DAG over basic and house
//! events, lowers it into a compact integer-indexed graph with
//! sign-encoded complement edges, rewrites it into AND/OR normal form,
//! and enumerates every minimal cut set up to a configured order.
//!
//! # Pipeline
//!
//! ```text
//! Formula DAG → build → propagate_constants → preprocess → find_minimal_cut_sets
//! ```
//!
//! Each stage settles fully before the next begins. [`Analysis`] wires
//! the stages together for the common case:
//!
//! ```
//! use mocus_core::{build, Analysis, AnalysisSettings, Formula};
//! use indexmap::IndexMap;
//! use std::collections::HashMap;
//!
//! // top = OR(pump_fails, valve_stuck), events indexed 1 and 2.
//! let event_index: HashMap<String, i32> = [
//!     ("pump_fails".to_string(), 1),
//!     ("valve_stuck".to_string(), 2),
//!     ("top".to_string(), 3),
//! ]
//! .into_iter()
//! .collect();
//! let mut formulas = IndexMap::new();
//! formulas.insert(3, Formula::new("or").event("pump_fails").event("valve_stuck"));
//!
//! let graph = build(3, &formulas, &event_index, &HashMap::new()).unwrap();
//! let report = Analysis::new(AnalysisSettings::default())
//!     .unwrap()
//!     .run(graph)
//!     .unwrap();
//! assert_eq!(report.total_cut_sets(), 2);
//! ```
//!
//! Everything around the core (model parsing, visualization,
//! probability computation, reporting) belongs to external
//! collaborators. The core is single-threaded; a session owns its graph
//! exclusively and drops it wholesale when the run returns.

pub mod analysis;
pub mod builder;
pub mod error;
pub mod graph;
pub mod mcs;
pub mod preprocess;

pub use analysis::{Analysis, AnalysisSettings, CutSetReport};
pub use builder::{build, Formula};
pub use error::{FaultTreeError, Result};
pub use graph::{FaultTreeGraph, Gate, GateState, GateType};
pub use mcs::{delete_term_approximation, find_minimal_cut_sets};
pub use preprocess::{preprocess, propagate_constants};
