//! Study loading, saving and validation.

use std::path::Path;

use csl_symbolic::NonlinearSystem;

use crate::error::{AppError, AppResult};
use crate::linear_service::build_model;
use crate::schema::{PoleDef, Study};

/// Load a study from a YAML file and validate it.
pub fn load_study(path: &Path) -> AppResult<Study> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::StudyFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let study = parse_study(&content)?;
    validate_study(&study)?;
    Ok(study)
}

pub fn parse_study(yaml: &str) -> AppResult<Study> {
    serde_yaml::from_str(yaml)
        .map_err(|e| AppError::Study(format!("Failed to parse study YAML: {}", e)))
}

/// Validate and save a study to a YAML file.
pub fn save_study(path: &Path, study: &Study) -> AppResult<()> {
    validate_study(study)?;
    let content = study_to_yaml(study)?;

    std::fs::write(path, content).map_err(|e| AppError::StudyFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

pub fn study_to_yaml(study: &Study) -> AppResult<String> {
    serde_yaml::to_string(study)
        .map_err(|e| AppError::Study(format!("Failed to serialize study: {}", e)))
}

/// Check that sections agree with each other and with the system order.
pub fn validate_study(study: &Study) -> AppResult<()> {
    if study.system.is_none() && study.nonlinear.is_none() && study.pid.is_none() {
        return Err(AppError::Validation(
            "Study must define at least one of system, nonlinear or pid".to_string(),
        ));
    }

    let sim = &study.simulation;
    if let Some(samples) = sim.samples {
        if samples < 2 {
            return Err(AppError::Validation(
                "simulation.samples must be at least 2".to_string(),
            ));
        }
    }
    if !(sim.rtol > 0.0 && sim.atol > 0.0) {
        return Err(AppError::Validation(
            "simulation tolerances must be positive".to_string(),
        ));
    }

    let order = match &study.system {
        Some(def) => Some(
            build_model(def)
                .map_err(|e| AppError::Validation(format!("system: {}", e)))?
                .order(),
        ),
        None => None,
    };

    if let Some(sf) = &study.state_feedback {
        let n = order.ok_or_else(|| needs_system("state_feedback"))?;
        if sf.poles.is_empty() && sf.specs.is_none() {
            return Err(AppError::Validation(
                "state_feedback needs either poles or specs".to_string(),
            ));
        }
        if !sf.poles.is_empty() {
            check_pole_count("state_feedback", &sf.poles, n)?;
        }
        check_len("state_feedback.x0", sf.x0.as_deref(), n)?;
        if let Some(t) = sf.t_final {
            check_horizon("state_feedback.t_final", t)?;
        }
    }

    if let Some(obs) = &study.observer {
        let n = order.ok_or_else(|| needs_system("observer"))?;
        check_pole_count("observer", &obs.poles, n)?;
        check_len("observer.x0", obs.x0.as_deref(), n)?;
        check_len("observer.xhat0", obs.xhat0.as_deref(), n)?;
        check_horizon("observer.t_final", obs.t_final)?;
    }

    if let Some(nl) = &study.nonlinear {
        let system = NonlinearSystem::from_strings(&nl.states, &nl.dynamics)
            .map_err(|e| AppError::Validation(format!("nonlinear: {}", e)))?;
        let n = system.order();
        check_len("nonlinear.x0", Some(&nl.x0), n)?;
        check_len("nonlinear.equilibrium", nl.equilibrium.as_deref(), n)?;
        check_horizon("nonlinear.t_final", nl.t_final)?;
    }

    if let Some(pid) = &study.pid {
        if pid.den.is_empty() {
            return Err(AppError::Validation(
                "pid.den must have at least one coefficient".to_string(),
            ));
        }
        if pid.gains.is_none() && pid.ziegler_nichols.is_none() {
            return Err(AppError::Validation(
                "pid needs either gains or ziegler_nichols".to_string(),
            ));
        }
        if let Some(h) = pid.horizon {
            check_horizon("pid.horizon", h)?;
        }
    }

    Ok(())
}

fn needs_system(section: &str) -> AppError {
    AppError::Validation(format!("{} requires a system section", section))
}

fn check_pole_count(section: &str, poles: &[PoleDef], order: usize) -> AppResult<()> {
    if poles.len() != order {
        return Err(AppError::Validation(format!(
            "{} lists {} poles but the system order is {}",
            section,
            poles.len(),
            order
        )));
    }
    Ok(())
}

fn check_len(what: &str, values: Option<&[f64]>, order: usize) -> AppResult<()> {
    match values {
        Some(v) if v.len() != order => Err(AppError::Validation(format!(
            "{} has {} entries, expected {}",
            what,
            v.len(),
            order
        ))),
        _ => Ok(()),
    }
}

fn check_horizon(what: &str, t: f64) -> AppResult<()> {
    if !(t > 0.0 && t.is_finite()) {
        return Err(AppError::Validation(format!("{} must be positive", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ObserverDef, PidDef};

    #[test]
    fn default_example_is_valid() {
        validate_study(&Study::default_example()).unwrap();
    }

    #[test]
    fn empty_study_is_rejected() {
        let study = parse_study("name: empty\n").unwrap();
        assert!(matches!(
            validate_study(&study),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn observer_without_system_is_rejected() {
        let mut study = Study::default_example();
        study.system = None;
        study.state_feedback = None;
        study.observer = Some(ObserverDef {
            poles: vec![PoleDef::Real(-1.0)],
            k: None,
            x0: None,
            xhat0: None,
            t_final: 1.0,
        });
        let err = validate_study(&study).unwrap_err();
        assert!(err.to_string().contains("observer requires a system"));
    }

    #[test]
    fn pole_count_must_match_order() {
        let mut study = Study::default_example();
        if let Some(sf) = study.state_feedback.as_mut() {
            sf.poles.push(PoleDef::Real(-7.0));
        }
        let err = validate_study(&study).unwrap_err();
        assert!(err.to_string().contains("3 poles"));
    }

    #[test]
    fn pid_needs_some_gains() {
        let mut study = Study::default_example();
        study.pid = Some(PidDef {
            num: vec![1.0],
            den: vec![1.0, 1.0],
            gains: None,
            ziegler_nichols: None,
            horizon: None,
        });
        assert!(validate_study(&study).is_err());
    }

    #[test]
    fn bad_expression_is_a_validation_error() {
        let mut study = Study::default_example();
        if let Some(nl) = study.nonlinear.as_mut() {
            nl.dynamics[1] = "-x1 + * x2".to_string();
        }
        let err = validate_study(&study).unwrap_err();
        assert!(err.to_string().starts_with("Study validation failed: nonlinear:"));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = std::env::temp_dir().join("csl_app_no_such_study.yaml");
        let err = load_study(&path).unwrap_err();
        assert!(matches!(err, AppError::StudyFileRead { .. }));
    }
}
