//! Error types for linear analysis and design.

use csl_core::{Complex64, CoreError};
use thiserror::Error;

/// Result type for linear analysis and design operations.
pub type LinearResult<T> = Result<T, LinearError>;

/// Errors raised while building or analyzing a state-space model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinearError {
    /// Matrix dimensions are inconsistent.
    #[error("Shape error: {matrix} is {rows}x{cols}, {requirement}")]
    Shape {
        matrix: &'static str,
        rows: usize,
        cols: usize,
        requirement: String,
    },

    /// Matrix entries are unusable (NaN, infinite).
    #[error("Invalid matrix data: {0}")]
    InvalidData(CoreError),

    /// Desired pole configuration cannot be placed.
    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    /// An underlying decomposition failed to converge or was singular.
    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

impl From<CoreError> for LinearError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Empty { what } => LinearError::Shape {
                matrix: what,
                rows: 0,
                cols: 0,
                requirement: "must not be empty".to_string(),
            },
            CoreError::Ragged {
                what,
                row,
                expected,
                found,
            } => LinearError::Shape {
                matrix: what,
                rows: row + 1,
                cols: found,
                requirement: format!("row {row} must have {expected} columns like row 0"),
            },
            other => LinearError::InvalidData(other),
        }
    }
}

/// Infeasible pole-placement requests.
///
/// Every variant names the pole, count or rank that made the request
/// infeasible so callers can re-prompt with a corrected pole list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlacementError {
    #[error("expected {expected} desired poles (system order), got {found}")]
    PoleCount { expected: usize, found: usize },

    #[error("desired pole {pole} is not finite")]
    NonFinitePole { pole: Complex64 },

    #[error("complex pole {pole} has no matching conjugate")]
    UnpairedComplexPole { pole: Complex64 },

    #[error(
        "pole {pole} requested {multiplicity} times but at most {rank} can be placed (rank of the gain channel matrix)"
    )]
    MultiplicityExceedsRank {
        pole: Complex64,
        multiplicity: usize,
        rank: usize,
    },

    #[error("pair is not controllable: controllability rank {rank} < order {order}")]
    Uncontrollable { rank: usize, order: usize },

    #[error("pair is not observable: observability rank {rank} < order {order}")]
    Unobservable { rank: usize, order: usize },

    #[error("closed-loop eigenvector matrix is singular: {what}")]
    Singular { what: String },
}
