//! Simulation runner: integrate ẋ = g(t, x) and sample on an even grid.

use csl_core::linspace;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::error::{SimError, SimResult};
use crate::integrator::{DormandPrince54, Integrator, Rk4};
use crate::model::Dynamics;
use crate::trajectory::Trajectory;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4) (default).
    #[default]
    DormandPrince,
    /// Fixed-step RK4 with `rk4_substeps` steps per grid interval.
    Rk4,
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Number of evenly spaced output samples, including both endpoints
    pub samples: usize,
    /// Relative error tolerance (adaptive only)
    pub rtol: f64,
    /// Absolute error tolerance (adaptive only)
    pub atol: f64,
    /// Maximum number of attempted steps (safety limit)
    pub max_steps: usize,
    /// Smallest step the adaptive controller may shrink to
    pub min_dt: f64,
    /// First trial step; chosen from the initial slope when `None`
    pub initial_dt: Option<f64>,
    /// Integrator type (default: Dormand-Prince)
    pub integrator: IntegratorType,
    /// RK4 steps per output interval
    pub rk4_substeps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            samples: 500,
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
            min_dt: 1e-12,
            initial_dt: None,
            integrator: IntegratorType::default(),
            rk4_substeps: 10,
        }
    }
}

impl SimOptions {
    pub fn with_samples(samples: usize) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    fn validate(&self) -> SimResult<()> {
        if self.samples < 2 {
            return Err(SimError::InvalidArg {
                what: "samples must be at least 2",
            });
        }
        if !(self.rtol > 0.0 && self.rtol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "rtol must be positive",
            });
        }
        if !(self.atol > 0.0 && self.atol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "atol must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !(self.min_dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "min_dt must be positive",
            });
        }
        if let Some(dt) = self.initial_dt {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(SimError::InvalidArg {
                    what: "initial_dt must be positive",
                });
            }
        }
        if self.integrator == IntegratorType::Rk4 && self.rk4_substeps == 0 {
            return Err(SimError::InvalidArg {
                what: "rk4_substeps must be positive",
            });
        }
        Ok(())
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Integrate `model` from `x0` over `(t0, tf)` and sample the state on
/// `opts.samples` evenly spaced times.
///
/// The adaptive controller clips steps so that every grid time is hit
/// exactly; no interpolation is involved.
pub fn run_sim<D: Dynamics + ?Sized>(
    model: &D,
    x0: &DVector<f64>,
    t_span: (f64, f64),
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    opts.validate()?;
    let (t0, tf) = t_span;
    if !(t0.is_finite() && tf.is_finite() && tf > t0) {
        return Err(SimError::InvalidArg {
            what: "time span must satisfy t0 < tf",
        });
    }
    if x0.len() != model.dim() {
        return Err(SimError::Dimension {
            what: "x0",
            expected: model.dim(),
            found: x0.len(),
        });
    }
    check_finite(t0, x0, "initial state is not finite")?;

    let time = linspace(t0, tf, opts.samples);
    let mut values = DMatrix::zeros(x0.len(), time.len());
    values.set_column(0, x0);

    match opts.integrator {
        IntegratorType::DormandPrince => adaptive(model, x0, &time, opts, &mut values)?,
        IntegratorType::Rk4 => fixed(model, x0, &time, opts, &mut values)?,
    }

    Ok(Trajectory { time, values })
}

fn fixed<D: Dynamics + ?Sized>(
    model: &D,
    x0: &DVector<f64>,
    time: &[f64],
    opts: &SimOptions,
    values: &mut DMatrix<f64>,
) -> SimResult<()> {
    let mut x = x0.clone();
    let mut steps = 0usize;
    for k in 1..time.len() {
        let h = (time[k] - time[k - 1]) / opts.rk4_substeps as f64;
        for s in 0..opts.rk4_substeps {
            if steps >= opts.max_steps {
                return Err(integration_failure(time[k - 1], &x, "step budget exhausted"));
            }
            let t = time[k - 1] + s as f64 * h;
            x = Rk4.step(model, t, &x, h)?.x;
            steps += 1;
            check_finite(t + h, &x, "state became non-finite")?;
        }
        values.set_column(k, &x);
    }
    Ok(())
}

fn adaptive<D: Dynamics + ?Sized>(
    model: &D,
    x0: &DVector<f64>,
    time: &[f64],
    opts: &SimOptions,
    values: &mut DMatrix<f64>,
) -> SimResult<()> {
    let stepper = DormandPrince54;
    let exponent = -1.0 / stepper.order() as f64;
    let spacing = time[1] - time[0];

    let mut t = time[0];
    let mut x = x0.clone();
    let mut dt = match opts.initial_dt {
        Some(dt) => dt,
        None => initial_step(model, t, &x, opts)?,
    }
    .min(spacing)
    .max(opts.min_dt);

    let mut attempts = 0usize;
    let mut rejections = 0usize;

    for (k, &target) in time.iter().enumerate().skip(1) {
        while t < target {
            if attempts >= opts.max_steps {
                return Err(integration_failure(t, &x, "step budget exhausted"));
            }
            attempts += 1;

            let remaining = target - t;
            // Stretch to the grid point rather than leave a sliver behind.
            let clipped = dt >= remaining * 0.99;
            let h = if clipped { remaining } else { dt };

            let out = stepper.step(model, t, &x, h)?;
            let err_norm = match &out.error {
                Some(e) => scaled_error_norm(e, &x, &out.x, opts),
                None => 0.0,
            };
            let factor = if err_norm.is_finite() {
                (SAFETY * err_norm.max(1e-16).powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
            } else {
                MIN_FACTOR
            };

            if err_norm <= 1.0 {
                t = if clipped { target } else { t + h };
                x = out.x;
                check_finite(t, &x, "state became non-finite")?;
                dt = if clipped { dt.max(h * factor) } else { h * factor };
            } else {
                rejections += 1;
                trace!(t, h, err_norm, "step rejected");
                dt = h * factor;
                if dt < opts.min_dt {
                    return Err(integration_failure(t, &x, "step size underflow"));
                }
            }
        }
        values.set_column(k, &x);
    }

    debug!(attempts, rejections, "adaptive integration finished");
    Ok(())
}

/// Max-norm of the local error scaled by `atol + rtol * |x|`.
fn scaled_error_norm(
    err: &DVector<f64>,
    x_old: &DVector<f64>,
    x_new: &DVector<f64>,
    opts: &SimOptions,
) -> f64 {
    err.iter()
        .zip(x_old.iter().zip(x_new.iter()))
        .map(|(e, (a, b))| e.abs() / (opts.atol + opts.rtol * a.abs().max(b.abs())))
        .fold(0.0, f64::max)
}

/// Starting step from the ratio of state size to slope size.
fn initial_step<D: Dynamics + ?Sized>(
    model: &D,
    t: f64,
    x: &DVector<f64>,
    opts: &SimOptions,
) -> SimResult<f64> {
    let f0 = model.rhs(t, x)?;
    let scale = |v: &DVector<f64>| {
        v.iter()
            .zip(x.iter())
            .map(|(vi, xi)| (vi / (opts.atol + opts.rtol * xi.abs())).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let d0 = scale(x);
    let d1 = scale(&f0);
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    Ok(if h.is_finite() { h } else { 1e-6 })
}

fn check_finite(t: f64, x: &DVector<f64>, what: &str) -> SimResult<()> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(integration_failure(t, x, what))
    }
}

fn integration_failure(t: f64, x: &DVector<f64>, what: &str) -> SimError {
    SimError::Integration {
        t,
        state: x.iter().copied().collect(),
        what: what.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnDynamics;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.samples, 500);
        assert_eq!(opts.rtol, 1e-6);
        assert_eq!(opts.atol, 1e-9);
        assert_eq!(opts.max_steps, 100_000);
        assert_eq!(opts.min_dt, 1e-12);
        assert_eq!(opts.initial_dt, None);
        assert_eq!(opts.integrator, IntegratorType::DormandPrince);
    }

    #[test]
    fn rejects_bad_arguments() {
        let model = FnDynamics::new(1, |_t, x: &DVector<f64>| -x);
        let x0 = DVector::from_vec(vec![1.0]);

        let few = SimOptions::with_samples(1);
        assert!(matches!(
            run_sim(&model, &x0, (0.0, 1.0), &few),
            Err(SimError::InvalidArg { .. })
        ));
        assert!(matches!(
            run_sim(&model, &x0, (1.0, 1.0), &SimOptions::default()),
            Err(SimError::InvalidArg { .. })
        ));
        let wrong = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            run_sim(&model, &wrong, (0.0, 1.0), &SimOptions::default()),
            Err(SimError::Dimension { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn grid_is_hit_exactly() {
        let model = FnDynamics::new(1, |_t, x: &DVector<f64>| -x);
        let x0 = DVector::from_vec(vec![1.0]);
        let traj = run_sim(&model, &x0, (0.0, 2.0), &SimOptions::with_samples(21)).unwrap();
        assert_eq!(traj.time.len(), 21);
        assert_eq!(traj.time[20], 2.0);
        for (k, t) in traj.time.iter().enumerate() {
            assert!((traj.values[(0, k)] - (-t).exp()).abs() < 1e-6);
        }
    }

    #[test]
    fn rk4_option_matches_adaptive() {
        let model = FnDynamics::new(1, |_t, x: &DVector<f64>| -x);
        let x0 = DVector::from_vec(vec![1.0]);
        let opts = SimOptions {
            samples: 11,
            integrator: IntegratorType::Rk4,
            ..SimOptions::default()
        };
        let traj = run_sim(&model, &x0, (0.0, 1.0), &opts).unwrap();
        assert!((traj.values[(0, 10)] - (-1.0f64).exp()).abs() < 1e-8);
    }

    #[test]
    fn blow_up_reports_time_and_state() {
        // x' = x^2 escapes to infinity at t = 1.
        let model = FnDynamics::new(1, |_t, x: &DVector<f64>| x.map(|v| v * v));
        let x0 = DVector::from_vec(vec![1.0]);
        let opts = SimOptions {
            samples: 3,
            max_steps: 2_000,
            ..SimOptions::default()
        };
        match run_sim(&model, &x0, (0.0, 2.0), &opts) {
            Err(SimError::Integration { t, state, .. }) => {
                assert!(t > 0.5 && t < 2.0);
                assert_eq!(state.len(), 1);
            }
            other => panic!("expected integration failure, got {other:?}"),
        }
    }

    #[test]
    fn budget_exhaustion_is_an_error() {
        let model = FnDynamics::new(1, |_t, x: &DVector<f64>| -x);
        let x0 = DVector::from_vec(vec![1.0]);
        let opts = SimOptions {
            samples: 100,
            max_steps: 10,
            ..SimOptions::default()
        };
        assert!(matches!(
            run_sim(&model, &x0, (0.0, 1.0), &opts),
            Err(SimError::Integration { .. })
        ));
    }
}
