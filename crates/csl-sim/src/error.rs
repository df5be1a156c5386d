//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered during trajectory simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch: {what} has length {found}, expected {expected}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The solver could not honour its tolerance within its step budget.
    #[error("Integration failed at t = {t}: {what}")]
    Integration {
        t: f64,
        state: Vec<f64>,
        what: String,
    },

    #[error("Model evaluation failed: {message}")]
    Model { message: String },

    #[error("Linear model error: {0}")]
    Linear(#[from] csl_linear::LinearError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<csl_core::CoreError> for SimError {
    fn from(e: csl_core::CoreError) -> Self {
        SimError::Model {
            message: e.to_string(),
        }
    }
}
