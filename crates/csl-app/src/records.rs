//! Serializable result records returned by the services.

use csl_core::{Complex64, PoleSet};
use csl_pid::PidGains;
use csl_sim::Trajectory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComplexRecord {
    pub re: f64,
    pub im: f64,
}

impl From<Complex64> for ComplexRecord {
    fn from(c: Complex64) -> Self {
        Self { re: c.re, im: c.im }
    }
}

pub fn pole_records(poles: &PoleSet) -> Vec<ComplexRecord> {
    poles.iter().map(|p| ComplexRecord::from(*p)).collect()
}

/// Sampled trajectory: one row per state component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrajectoryRecord {
    pub time: Vec<f64>,
    pub states: Vec<Vec<f64>>,
}

impl From<Trajectory> for TrajectoryRecord {
    fn from(traj: Trajectory) -> Self {
        Self {
            states: traj.to_rows(),
            time: traj.time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    pub poles: Vec<ComplexRecord>,
    pub is_stable: bool,
    /// Largest pole real part.
    pub stability_margin: f64,
    pub wc: Vec<Vec<f64>>,
    pub wo: Vec<Vec<f64>>,
    pub rank_wc: usize,
    pub rank_wo: usize,
    pub controllable: bool,
    pub observable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    pub k: Vec<Vec<f64>>,
    pub desired_poles: Vec<ComplexRecord>,
    pub achieved_poles: Vec<ComplexRecord>,
    pub method: String,
    pub sweeps: usize,
    pub converged: bool,
    pub open_loop: TrajectoryRecord,
    pub closed_loop: TrajectoryRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObserverRecord {
    pub l: Vec<Vec<f64>>,
    /// Feedback gain acting on the estimate.
    pub k: Vec<Vec<f64>>,
    pub achieved_poles: Vec<ComplexRecord>,
    pub time: Vec<f64>,
    pub true_state: Vec<Vec<f64>>,
    pub estimated_state: Vec<Vec<f64>>,
    pub estimation_error: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonlinearRecord {
    pub time: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub equilibrium: Vec<f64>,
    /// Symbolic Jacobian ∂fᵢ/∂xⱼ.
    pub jacobian_expr: Vec<Vec<String>>,
    /// Jacobian evaluated at `equilibrium`.
    pub jacobian: Vec<Vec<f64>>,
    pub linearized_poles: Vec<ComplexRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dv_dt_expr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NyquistRecord {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PidRecord {
    pub gains: PidGains,
    pub time: Vec<f64>,
    pub step_response: Vec<f64>,
    pub tracking_error: Vec<f64>,
    /// rad/s
    pub frequency_grid: Vec<f64>,
    /// dB
    pub magnitude: Vec<f64>,
    /// degrees, unwrapped
    pub phase: Vec<f64>,
    pub nyquist: NyquistRecord,
    pub open_loop_poles: Vec<ComplexRecord>,
    pub open_loop_zeros: Vec<ComplexRecord>,
    pub closed_loop_poles: Vec<ComplexRecord>,
}

/// Everything a study produced, section by section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_feedback: Option<FeedbackRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer: Option<ObserverRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinear: Option<NonlinearRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<PidRecord>,
}
