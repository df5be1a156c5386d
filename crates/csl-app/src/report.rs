//! Whole-study runs and output rendering.

use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::linear_service::{analyze, feedback, observer};
use crate::nonlinear_service::nonlinear;
use crate::pid_service::pid;
use crate::records::StudyReport;
use crate::schema::Study;

/// Serialization format for records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Run every section the study defines. System analysis runs whenever a
/// system is present.
pub fn run_all(study: &Study) -> AppResult<StudyReport> {
    let report = StudyReport {
        name: study.name.clone(),
        analysis: study.system.as_ref().map(|_| analyze(study)).transpose()?,
        state_feedback: study
            .state_feedback
            .as_ref()
            .map(|_| feedback(study))
            .transpose()?,
        observer: study.observer.as_ref().map(|_| observer(study)).transpose()?,
        nonlinear: study
            .nonlinear
            .as_ref()
            .map(|_| nonlinear(study))
            .transpose()?,
        pid: study.pid.as_ref().map(|_| pid(study)).transpose()?,
    };
    info!(study = %study.name, "study complete");
    Ok(report)
}

pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| AppError::Render(format!("JSON: {}", e))),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| AppError::Render(format!("YAML: {}", e)))
        }
    }
}
