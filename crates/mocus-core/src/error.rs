//! Error types for fault-tree construction and analysis

use crate::graph::GateType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaultTreeError>;

/// Structural errors raised while building or preprocessing a fault tree.
///
/// Every variant indicates a broken client model, not a recoverable
/// condition: the analysis session is dead once one of these surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultTreeError {
    #[error("unknown event `{0}` referenced by a formula")]
    UnknownEvent(String),

    #[error("unsupported formula type `{0}`")]
    UnknownFormulaType(String),

    #[error("atleast formula for gate {0} is missing a vote number")]
    MissingVoteNumber(i32),

    #[error("invalid vote number {vote} for gate {gate} with {children} children")]
    InvalidVoteNumber {
        gate: i32,
        vote: usize,
        children: usize,
    },

    #[error("{gate_type} gate {gate} must have {expected} children, got {actual}")]
    WrongChildCount {
        gate: i32,
        gate_type: GateType,
        expected: &'static str,
        actual: usize,
    },

    #[error("event {child} occurs more than once in gate {gate}")]
    DuplicateChild { gate: i32, child: i32 },

    #[error("cycle detected through gate {0}")]
    CycleDetected(i32),

    #[error("gate {gate} references missing gate index {child}")]
    DanglingIndex { gate: i32, child: i32 },

    #[error("house event {0} is marked both true and false")]
    ConflictingHouseEvent(i32),

    #[error("limit order must be positive, got {0}")]
    InvalidLimitOrder(usize),
}
