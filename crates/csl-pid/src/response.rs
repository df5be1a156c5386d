//! Closed-loop step, frequency and Nyquist responses of compensated loops.

use std::f64::consts::PI;

use csl_core::{linspace, logspace};
use csl_sim::{SimOptions, step_response};
use tracing::debug;

use crate::compensator::PidCompensator;
use crate::error::{DesignError, DesignResult};
use crate::transfer_function::TransferFunction;

/// Number of log-spaced frequency samples.
pub const FREQUENCY_POINTS: usize = 1000;
/// Frequency grid bounds as powers of ten (rad/s).
pub const FREQUENCY_DECADES: (f64, f64) = (-2.0, 2.0);

const TIME_CONSTANTS: f64 = 7.0;
const MIN_HORIZON: f64 = 1.0;
const MAX_HORIZON: f64 = 1000.0;
const FALLBACK_HORIZON: f64 = 10.0;

/// Options for closed-loop step responses.
#[derive(Clone, Debug, Default)]
pub struct ResponseOptions {
    /// Final time; chosen from the slowest closed-loop pole when `None`.
    ///
    /// The automatic choice is seven time constants, clamped to
    /// [1 s, 1000 s]. Loops slower than a time constant of about 140 s
    /// need an explicit horizon to reach steady state.
    pub horizon: Option<f64>,
    pub sim: SimOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepResponse {
    pub time: Vec<f64>,
    pub output: Vec<f64>,
}

impl StepResponse {
    /// Tracking error 1 - y(t) for a unit-step reference.
    pub fn tracking_error(&self) -> Vec<f64> {
        self.output.iter().map(|y| 1.0 - y).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyResponse {
    /// Angular frequencies (rad/s).
    pub omega: Vec<f64>,
    /// |H(jω)|, absolute.
    pub magnitude: Vec<f64>,
    /// ∠H(jω) in radians, unwrapped.
    pub phase: Vec<f64>,
}

impl FrequencyResponse {
    pub fn magnitude_db(&self) -> Vec<f64> {
        self.magnitude.iter().map(|m| 20.0 * m.log10()).collect()
    }

    pub fn phase_deg(&self) -> Vec<f64> {
        self.phase.iter().map(|p| p.to_degrees()).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NyquistData {
    pub omega: Vec<f64>,
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

/// Compensator in series with the plant.
pub fn open_loop(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
) -> DesignResult<TransferFunction> {
    let compensator = compensator.ok_or(DesignError::MissingCompensator)?;
    Ok(compensator.transfer_function().series(plant))
}

/// Unity-feedback closed loop of compensator · plant.
pub fn closed_loop(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
) -> DesignResult<TransferFunction> {
    open_loop(plant, compensator)?.unity_feedback()
}

/// Unit-step response of the unity-feedback loop.
pub fn closed_loop_step_response(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
    opts: &ResponseOptions,
) -> DesignResult<StepResponse> {
    let cl = closed_loop(plant, compensator)?;
    if !cl.is_proper() {
        return Err(DesignError::Improper {
            num_degree: cl.num().degree(),
            den_degree: cl.den().degree(),
        });
    }

    let horizon = match opts.horizon {
        Some(h) if h > 0.0 && h.is_finite() => h,
        Some(_) => {
            return Err(DesignError::InvalidArg {
                what: "horizon must be positive",
            });
        }
        None => auto_horizon(&cl)?,
    };
    debug!(horizon, order = cl.den().degree(), "closed-loop step response");

    // Static loop: output jumps to the gain immediately.
    if cl.den().degree() == 0 {
        let gain = cl.num().eval(0.0) / cl.den().eval(0.0);
        let time = linspace(0.0, horizon, opts.sim.samples.max(2));
        let output = vec![gain; time.len()];
        return Ok(StepResponse { time, output });
    }

    let model = cl.to_state_space()?;
    let traj = step_response(&model, 0, horizon, &opts.sim)?;
    Ok(StepResponse {
        output: traj.component(0),
        time: traj.time,
    })
}

/// Step response followed by e(t) = 1 - y(t).
pub fn tracking_error(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
    opts: &ResponseOptions,
) -> DesignResult<(Vec<f64>, Vec<f64>)> {
    let resp = closed_loop_step_response(plant, compensator, opts)?;
    let error = resp.tracking_error();
    Ok((resp.time, error))
}

/// About seven time constants of the slowest stable pole.
fn auto_horizon(cl: &TransferFunction) -> DesignResult<f64> {
    let poles = cl.poles()?;
    let slowest = poles.max_real_part();
    Ok(match slowest {
        Some(re) if re < -1e-9 => {
            let wanted = TIME_CONSTANTS / -re;
            let horizon = wanted.clamp(MIN_HORIZON, MAX_HORIZON);
            if horizon != wanted {
                debug!(wanted, horizon, "clamped automatic step-response horizon");
            }
            horizon
        }
        _ => FALLBACK_HORIZON,
    })
}

/// Default grid: 1000 points from 1e-2 to 1e2 rad/s.
pub fn frequency_grid() -> Vec<f64> {
    logspace(FREQUENCY_DECADES.0, FREQUENCY_DECADES.1, FREQUENCY_POINTS)
}

/// Bode data of the open loop compensator · plant.
pub fn frequency_response(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
) -> DesignResult<FrequencyResponse> {
    let ol = open_loop(plant, compensator)?;
    Ok(frequency_response_on(&ol, &frequency_grid()))
}

/// |H(jω)| and unwrapped ∠H(jω) on a caller-supplied grid.
pub fn frequency_response_on(tf: &TransferFunction, omega: &[f64]) -> FrequencyResponse {
    let values: Vec<_> = omega.iter().map(|w| tf.frequency_point(*w)).collect();
    let magnitude = values.iter().map(|h| h.norm()).collect();
    let phase = unwrap_phase(&values.iter().map(|h| h.arg()).collect::<Vec<_>>());
    FrequencyResponse {
        omega: omega.to_vec(),
        magnitude,
        phase,
    }
}

/// Real and imaginary parts of the open loop on the default grid.
pub fn nyquist(
    plant: &TransferFunction,
    compensator: Option<&PidCompensator>,
) -> DesignResult<NyquistData> {
    let ol = open_loop(plant, compensator)?;
    let omega = frequency_grid();
    let values: Vec<_> = omega.iter().map(|w| ol.frequency_point(*w)).collect();
    Ok(NyquistData {
        real: values.iter().map(|h| h.re).collect(),
        imag: values.iter().map(|h| h.im).collect(),
        omega,
    })
}

/// Remove 2π jumps between consecutive phase samples.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::with_capacity(phase.len());
    let mut offset = 0.0;
    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let delta = p + offset - out[i - 1];
            if delta > PI {
                offset -= 2.0 * PI * ((delta + PI) / (2.0 * PI)).floor();
            } else if delta < -PI {
                offset += 2.0 * PI * ((-delta + PI) / (2.0 * PI)).floor();
            }
        }
        out.push(p + offset);
    }
    out
}
