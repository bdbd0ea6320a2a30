//! Analysis session
//!
//! Owns the configured settings and drives the pipeline over a built
//! graph: constant propagation, preprocessing, cut-set generation, and
//! result aggregation. The graph is consumed by the run and dropped
//! wholesale with all its rewrite products when the report is returned.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{FaultTreeError, Result};
use crate::graph::FaultTreeGraph;
use crate::mcs::find_minimal_cut_sets;
use crate::preprocess::{preprocess, propagate_constants};

/// Configuration recognized by the analysis core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Maximum cardinality of reported cut sets.
    pub limit_order: usize,
    /// Sizes the per-basic-event visit table for module detection.
    /// Zero means derive it from the graph's gate index threshold.
    pub num_basic_events: usize,
    /// Basic events fixed to true before preprocessing.
    pub true_house_events: BTreeSet<i32>,
    /// Basic events fixed to false before preprocessing.
    pub false_house_events: BTreeSet<i32>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            limit_order: 20,
            num_basic_events: 0,
            true_house_events: BTreeSet::new(),
            false_house_events: BTreeSet::new(),
        }
    }
}

/// Aggregated cut-set results of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutSetReport {
    /// All minimal cut sets, each a set of signed basic-event indices.
    pub cut_sets: Vec<BTreeSet<i32>>,
    /// Number of cut sets per order.
    pub by_order: IndexMap<usize, usize>,
    /// Order-1 cut sets: the single-point failures of the tree.
    pub single_point_failures: Vec<i32>,
    /// Gate records alive after preprocessing, rewrite products included.
    pub gate_count: usize,
    /// Gates the preprocessor proved to be independent modules.
    pub module_count: usize,
}

impl CutSetReport {
    pub fn total_cut_sets(&self) -> usize {
        self.cut_sets.len()
    }

    pub fn max_order(&self) -> usize {
        self.cut_sets.iter().map(BTreeSet::len).max().unwrap_or(0)
    }

    /// True when the top event is unconditionally reached.
    pub fn is_unity(&self) -> bool {
        self.cut_sets.len() == 1 && self.cut_sets[0].is_empty()
    }
}

/// A single-use analysis session over one fault tree.
#[derive(Debug)]
pub struct Analysis {
    settings: AnalysisSettings,
}

impl Analysis {
    pub fn new(settings: AnalysisSettings) -> Result<Self> {
        if settings.limit_order == 0 {
            return Err(FaultTreeError::InvalidLimitOrder(0));
        }
        if let Some(&clash) = settings
            .true_house_events
            .intersection(&settings.false_house_events)
            .next()
        {
            return Err(FaultTreeError::ConflictingHouseEvent(clash));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Runs the full pipeline and consumes the graph.
    pub fn run(&self, mut graph: FaultTreeGraph) -> Result<CutSetReport> {
        propagate_constants(
            &mut graph,
            &self.settings.true_house_events,
            &self.settings.false_house_events,
        );
        let num_basic_events = if self.settings.num_basic_events > 0 {
            self.settings.num_basic_events
        } else {
            (graph.first_gate_index() - 1) as usize
        };
        preprocess(&mut graph, num_basic_events)?;
        let cut_sets = find_minimal_cut_sets(&graph, self.settings.limit_order);

        let mut by_order = IndexMap::new();
        for set in &cut_sets {
            *by_order.entry(set.len()).or_insert(0) += 1;
        }
        by_order.sort_keys();
        let single_point_failures = cut_sets
            .iter()
            .filter(|set| set.len() == 1)
            .filter_map(|set| set.iter().next().copied())
            .collect();
        let module_count = graph.gates().filter(|gate| gate.is_module()).count();
        Ok(CutSetReport {
            cut_sets,
            by_order,
            single_point_failures,
            gate_count: graph.gate_count(),
            module_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Gate, GateType};

    fn or_of_three() -> FaultTreeGraph {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(2);
        top.init_child(11);
        let mut inner = Gate::new(11, GateType::And);
        inner.init_child(3);
        inner.init_child(4);
        graph.add_gate(top);
        graph.add_gate(inner);
        graph.seed_gate_index(11);
        graph
    }

    #[test]
    fn report_aggregates_orders_and_single_points() {
        let analysis = Analysis::new(AnalysisSettings::default()).unwrap();
        let report = analysis.run(or_of_three()).unwrap();
        assert_eq!(report.total_cut_sets(), 3);
        assert_eq!(report.by_order[&1], 2);
        assert_eq!(report.by_order[&2], 1);
        assert_eq!(report.single_point_failures, vec![1, 2]);
        assert_eq!(report.max_order(), 2);
        assert!(!report.is_unity());
    }

    #[test]
    fn zero_limit_order_is_rejected() {
        let settings = AnalysisSettings {
            limit_order: 0,
            ..Default::default()
        };
        let err = Analysis::new(settings).unwrap_err();
        assert_eq!(err, FaultTreeError::InvalidLimitOrder(0));
    }

    #[test]
    fn conflicting_house_events_are_rejected() {
        let settings = AnalysisSettings {
            true_house_events: [2].into_iter().collect(),
            false_house_events: [2, 3].into_iter().collect(),
            ..Default::default()
        };
        let err = Analysis::new(settings).unwrap_err();
        assert_eq!(err, FaultTreeError::ConflictingHouseEvent(2));
    }

    #[test]
    fn unity_top_reports_one_empty_set() {
        let mut graph = FaultTreeGraph::new(10);
        let mut top = Gate::new(10, GateType::Or);
        top.init_child(1);
        top.init_child(2);
        graph.add_gate(top);
        let settings = AnalysisSettings {
            true_house_events: [1].into_iter().collect(),
            ..Default::default()
        };
        let report = Analysis::new(settings).unwrap().run(graph).unwrap();
        assert!(report.is_unity());
        assert_eq!(report.max_order(), 0);
    }

    #[test]
    fn settings_round_trip_through_serde() {
        let settings = AnalysisSettings {
            limit_order: 4,
            num_basic_events: 12,
            true_house_events: [3].into_iter().collect(),
            false_house_events: [5, 6].into_iter().collect(),
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: AnalysisSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.limit_order, 4);
        assert_eq!(back.num_basic_events, 12);
        assert_eq!(back.true_house_events, settings.true_house_events);
        assert_eq!(back.false_house_events, settings.false_house_events);
    }
}
