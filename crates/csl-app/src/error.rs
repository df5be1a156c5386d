//! Error types for the csl-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the analysis crates
/// and gives the CLI a single error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Study error: {0}")]
    Study(String),

    #[error("Failed to read study file: {path}")]
    StudyFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write study file: {path}")]
    StudyFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Study validation failed: {0}")]
    Validation(String),

    #[error("Study has no '{0}' section")]
    MissingSection(&'static str),

    #[error("Linear analysis error: {0}")]
    Linear(#[from] csl_linear::LinearError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] csl_sim::SimError),

    #[error("Symbolic error: {0}")]
    Symbolic(#[from] csl_symbolic::SymbolicError),

    #[error("PID design error: {0}")]
    Design(#[from] csl_pid::DesignError),

    #[error("Failed to render output: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for csl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<csl_core::CoreError> for AppError {
    fn from(err: csl_core::CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_linear::{LinearError, PlacementError};

    #[test]
    fn backend_errors_keep_their_type() {
        let err: AppError = LinearError::from(PlacementError::PoleCount {
            expected: 2,
            found: 3,
        })
        .into();
        assert!(matches!(
            err,
            AppError::Linear(LinearError::Placement(PlacementError::PoleCount {
                expected: 2,
                found: 3
            }))
        ));
        assert!(err.to_string().starts_with("Linear analysis error: "));

        let err: AppError = csl_pid::DesignError::MissingCompensator.into();
        assert!(matches!(
            err,
            AppError::Design(csl_pid::DesignError::MissingCompensator)
        ));
    }
}
