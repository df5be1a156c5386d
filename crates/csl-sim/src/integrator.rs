//! Explicit Runge-Kutta integrators.

use nalgebra::DVector;

use crate::error::SimResult;
use crate::model::Dynamics;

/// Result of a single integrator step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    /// Propagated state at `t + dt`.
    pub x: DVector<f64>,
    /// Local truncation error estimate, for embedded pairs only.
    pub error: Option<DVector<f64>>,
}

/// Trait for time integrators.
pub trait Integrator {
    /// Order of the propagated solution.
    fn order(&self) -> usize;

    /// Advance state by one time step.
    fn step<D: Dynamics + ?Sized>(
        &self,
        model: &D,
        t: f64,
        x: &DVector<f64>,
        dt: f64,
    ) -> SimResult<StepOutcome>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn order(&self) -> usize {
        4
    }

    fn step<D: Dynamics + ?Sized>(
        &self,
        model: &D,
        t: f64,
        x: &DVector<f64>,
        dt: f64,
    ) -> SimResult<StepOutcome> {
        let k1 = model.rhs(t, x)?;
        let k2 = model.rhs(t + 0.5 * dt, &(x + &k1 * (0.5 * dt)))?;
        let k3 = model.rhs(t + 0.5 * dt, &(x + &k2 * (0.5 * dt)))?;
        let k4 = model.rhs(t + dt, &(x + &k3 * dt))?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = k1 + k2 * 2.0 + k3 * 2.0 + k4;
        Ok(StepOutcome {
            x: x + k_sum * (dt / 6.0),
            error: None,
        })
    }
}

/// Dormand-Prince 5(4) embedded pair.
///
/// Seven stages; the fifth-order solution is propagated and the embedded
/// fourth-order solution only feeds the error estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DormandPrince54;

const DP_C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

#[rustfmt::skip]
const DP_A: [&[f64]; 6] = [
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
    &[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
    &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];

// Difference between fifth- and fourth-order weights.
const DP_E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

impl Integrator for DormandPrince54 {
    fn order(&self) -> usize {
        5
    }

    fn step<D: Dynamics + ?Sized>(
        &self,
        model: &D,
        t: f64,
        x: &DVector<f64>,
        dt: f64,
    ) -> SimResult<StepOutcome> {
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(7);
        k.push(model.rhs(t, x)?);

        for (stage, row) in DP_A.iter().enumerate() {
            let mut xs = x.clone();
            for (coef, slope) in row.iter().zip(k.iter()) {
                if *coef != 0.0 {
                    xs.axpy(dt * coef, slope, 1.0);
                }
            }
            k.push(model.rhs(t + DP_C[stage + 1] * dt, &xs)?);
        }

        // FSAL: the last stage input is the propagated solution.
        let mut x_new = x.clone();
        for (coef, slope) in DP_A[5].iter().zip(k.iter()) {
            if *coef != 0.0 {
                x_new.axpy(dt * coef, slope, 1.0);
            }
        }

        let mut err = DVector::zeros(x.len());
        for (coef, slope) in DP_E.iter().zip(k.iter()) {
            if *coef != 0.0 {
                err.axpy(dt * coef, slope, 1.0);
            }
        }

        Ok(StepOutcome {
            x: x_new,
            error: Some(err),
        })
    }
}
