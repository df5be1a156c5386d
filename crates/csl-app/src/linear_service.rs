//! Linear analysis, state-feedback and observer services.

use csl_core::{PoleSet, matrix_from_rows, matrix_to_rows};
use csl_linear::{
    DEFAULT_STABILITY_TOL, PlacementMethod, PlacementResult, StateSpaceModel, TransientSpecs,
    is_stable, place_observer_gain, place_state_feedback, poles, stability_margin, summary,
};
use csl_sim::{SimOptions, simulate_closed_loop, simulate_observer, simulate_open_loop};
use nalgebra::DMatrix;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::records::{AnalysisRecord, FeedbackRecord, ObserverRecord, pole_records};
use crate::schema::{StateFeedbackDef, Study, SystemDef, pole_set};

const DEFAULT_T_FINAL: f64 = 10.0;

/// Build the model, filling a missing D with zeros.
pub fn build_model(def: &SystemDef) -> AppResult<StateSpaceModel> {
    let zeros;
    let d = match &def.d {
        Some(d) => d.as_slice(),
        None => {
            let inputs = def.b.first().map_or(0, Vec::len);
            zeros = vec![vec![0.0; inputs]; def.c.len()];
            zeros.as_slice()
        }
    };
    Ok(StateSpaceModel::from_rows(&def.a, &def.b, &def.c, d)?)
}

fn study_model(study: &Study) -> AppResult<StateSpaceModel> {
    build_model(study.system.as_ref().ok_or(AppError::MissingSection("system"))?)
}

fn linear_options(study: &Study) -> SimOptions {
    study.simulation.options(SimOptions::default().samples)
}

/// Poles, stability verdict and rank tests of the study's system.
pub fn analyze(study: &Study) -> AppResult<AnalysisRecord> {
    analyze_model(&study_model(study)?)
}

pub fn analyze_model(model: &StateSpaceModel) -> AppResult<AnalysisRecord> {
    let poles = poles(model)?;
    let stable = is_stable(model, DEFAULT_STABILITY_TOL)?;
    let reach = summary(model)?;
    info!(
        order = model.order(),
        stable,
        controllable = reach.controllable,
        observable = reach.observable,
        "analyzed system"
    );

    Ok(AnalysisRecord {
        poles: pole_records(&poles.sorted()),
        is_stable: stable,
        stability_margin: stability_margin(model)?,
        wc: matrix_to_rows(&reach.controllability_matrix),
        wo: matrix_to_rows(&reach.observability_matrix),
        rank_wc: reach.controllability_rank,
        rank_wo: reach.observability_rank,
        controllable: reach.controllable,
        observable: reach.observable,
    })
}

/// A state-feedback placement together with the request it answered.
struct FeedbackDesign {
    desired: PoleSet,
    horizon: f64,
    placement: PlacementResult,
}

fn design_state_feedback(
    model: &StateSpaceModel,
    def: &StateFeedbackDef,
) -> AppResult<FeedbackDesign> {
    let (desired, horizon) = if !def.poles.is_empty() {
        (pole_set(&def.poles), def.t_final.unwrap_or(DEFAULT_T_FINAL))
    } else if let Some(specs) = def.specs {
        let specs = TransientSpecs::from(specs);
        (
            specs.desired_poles(model.order())?,
            def.t_final.unwrap_or_else(|| specs.simulation_horizon()),
        )
    } else {
        return Err(AppError::Validation(
            "state_feedback needs either poles or specs".to_string(),
        ));
    };

    let placement = place_state_feedback(model.a(), model.b(), &desired)?;
    Ok(FeedbackDesign {
        desired,
        horizon,
        placement,
    })
}

/// First unit vector, the default initial state.
fn unit_state(n: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];
    if let Some(first) = x.first_mut() {
        *first = 1.0;
    }
    x
}

/// Place K, then simulate the free and the state-feedback responses.
pub fn feedback(study: &Study) -> AppResult<FeedbackRecord> {
    let model = study_model(study)?;
    let def = study
        .state_feedback
        .as_ref()
        .ok_or(AppError::MissingSection("state_feedback"))?;
    let design = design_state_feedback(&model, def)?;
    let placement = &design.placement;

    let x0 = def.x0.clone().unwrap_or_else(|| unit_state(model.order()));
    let opts = linear_options(study);
    let t_span = (0.0, design.horizon);
    let open = simulate_open_loop(&model, &x0, t_span, &opts)?;
    let closed = simulate_closed_loop(&model, &placement.gain, &x0, t_span, &opts)?;

    info!(
        poles = %design.desired,
        sweeps = placement.sweeps,
        converged = placement.converged,
        "placed state-feedback poles"
    );

    Ok(FeedbackRecord {
        k: matrix_to_rows(&placement.gain),
        desired_poles: pole_records(&design.desired),
        achieved_poles: pole_records(&placement.achieved_poles),
        method: method_name(placement.method).to_string(),
        sweeps: placement.sweeps,
        converged: placement.converged,
        open_loop: open.into(),
        closed_loop: closed.into(),
    })
}

fn method_name(method: PlacementMethod) -> &'static str {
    match method {
        PlacementMethod::Ackermann => "ackermann",
        PlacementMethod::Eigenstructure => "eigenstructure",
    }
}

/// Place L and simulate the plant driven by u = −K·x̂.
pub fn observer(study: &Study) -> AppResult<ObserverRecord> {
    let model = study_model(study)?;
    let def = study
        .observer
        .as_ref()
        .ok_or(AppError::MissingSection("observer"))?;
    let n = model.order();

    let k = match (&def.k, &study.state_feedback) {
        (Some(rows), _) => matrix_from_rows(rows, "K")?,
        (None, Some(sf)) => design_state_feedback(&model, sf)?.placement.gain,
        (None, None) => DMatrix::zeros(model.inputs(), n),
    };

    let placement = place_observer_gain(model.a(), model.c(), &pole_set(&def.poles))?;
    let x0 = def.x0.clone().unwrap_or_else(|| unit_state(n));
    let xhat0 = def.xhat0.clone().unwrap_or_else(|| vec![0.0; n]);
    let traj = simulate_observer(
        &model,
        &k,
        &placement.gain,
        &x0,
        &xhat0,
        (0.0, def.t_final),
        &linear_options(study),
    )?;

    let error = traj.estimation_error();
    let final_error = error
        .column_iter()
        .last()
        .map_or(0.0, |col| col.amax());
    info!(
        poles = %placement.achieved_poles,
        final_error,
        "designed observer"
    );

    Ok(ObserverRecord {
        l: matrix_to_rows(&placement.gain),
        k: matrix_to_rows(&k),
        achieved_poles: pole_records(&placement.achieved_poles),
        true_state: matrix_to_rows(&traj.true_state),
        estimated_state: matrix_to_rows(&traj.estimate),
        estimation_error: matrix_to_rows(&error),
        time: traj.time,
    })
}
