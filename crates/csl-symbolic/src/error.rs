//! Error types for expression parsing and nonlinear analysis.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolicError {
    #[error("Parse error at {position} in '{input}': {what}")]
    Parse {
        input: String,
        position: usize,
        what: String,
    },

    #[error("Unknown symbol '{name}' at {position}")]
    UnknownSymbol { name: String, position: usize },

    #[error("Unknown function '{name}' at {position}")]
    UnknownFunction { name: String, position: usize },

    /// Evaluation to a number was requested but symbols are still unbound.
    #[error("Free symbols remain: {}", symbols.join(", "))]
    FreeSymbols { symbols: Vec<String> },

    #[error("Duplicate state symbol '{name}'")]
    DuplicateSymbol { name: String },

    #[error("Dimension mismatch: {what} has length {found}, expected {expected}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value {value} at {what}[{index}]")]
    NonFinite {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error("Simulation error: {0}")]
    Sim(#[from] csl_sim::SimError),
}

pub type SymbolicResult<T> = Result<T, SymbolicError>;
