//! Error types for compensator design.

use thiserror::Error;

/// Result type for PID and transfer-function operations.
pub type DesignResult<T> = Result<T, DesignError>;

/// Errors that can occur while forming or analysing a compensated loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DesignError {
    /// The loop was requested before any compensator gains were supplied.
    #[error("No compensator defined; supply PID gains first")]
    MissingCompensator,

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite coefficient in {what}")]
    NonFinite { what: &'static str },

    #[error("Zero denominator polynomial in {what}")]
    ZeroDenominator { what: &'static str },

    /// Numerator degree exceeds denominator degree.
    #[error("Improper transfer function: numerator degree {num_degree} > denominator degree {den_degree}")]
    Improper { num_degree: usize, den_degree: usize },

    #[error("Linear algebra error: {0}")]
    Linear(#[from] csl_linear::LinearError),

    #[error("Simulation error: {0}")]
    Sim(#[from] csl_sim::SimError),
}
