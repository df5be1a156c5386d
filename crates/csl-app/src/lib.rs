//! Shared application service layer for controlsyslab.
//!
//! Loads YAML study files and composes the analysis crates into
//! serializable records for the CLI.

pub mod error;
pub mod linear_service;
pub mod nonlinear_service;
pub mod pid_service;
pub mod records;
pub mod report;
pub mod schema;
pub mod study_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use linear_service::{analyze, analyze_model, build_model, feedback, observer};
pub use nonlinear_service::nonlinear;
pub use pid_service::{pid, resolve_gains, tune};
pub use records::{
    AnalysisRecord, ComplexRecord, FeedbackRecord, NonlinearRecord, NyquistRecord, ObserverRecord,
    PidRecord, StudyReport, TrajectoryRecord,
};
pub use report::{OutputFormat, render, run_all};
pub use schema::Study;
pub use study_service::{load_study, parse_study, save_study, study_to_yaml, validate_study};
