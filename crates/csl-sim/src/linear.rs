//! Linear state-space dynamics: open loop, state feedback, observer.

use csl_core::vector_from_slice;
use csl_linear::StateSpaceModel;
use nalgebra::{DMatrix, DVector};

use crate::error::{SimError, SimResult};
use crate::model::Dynamics;
use crate::sim::{SimOptions, run_sim};
use crate::trajectory::{ObserverTrajectory, Trajectory};

/// ẋ = M·x + f for a constant matrix M and constant forcing f.
#[derive(Clone, Debug)]
pub struct LinearDynamics {
    matrix: DMatrix<f64>,
    forcing: Option<DVector<f64>>,
}

impl LinearDynamics {
    pub fn new(matrix: DMatrix<f64>) -> Self {
        Self {
            matrix,
            forcing: None,
        }
    }

    /// Add a constant forcing term (e.g. B·u for a held input).
    pub fn with_forcing(mut self, forcing: DVector<f64>) -> SimResult<Self> {
        if forcing.len() != self.matrix.nrows() {
            return Err(SimError::Dimension {
                what: "forcing",
                expected: self.matrix.nrows(),
                found: forcing.len(),
            });
        }
        self.forcing = Some(forcing);
        Ok(self)
    }
}

impl Dynamics for LinearDynamics {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn rhs(&self, _t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        let mut dx = &self.matrix * x;
        if let Some(f) = &self.forcing {
            dx += f;
        }
        Ok(dx)
    }
}

/// Plant and observer stacked as z = [x; x̂] under u = -K·x̂.
///
/// ẋ  = A·x + B·u
/// x̂' = A·x̂ + B·u + L·(C·x - C·x̂)
#[derive(Clone, Debug)]
pub struct ObserverDynamics {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DMatrix<f64>,
    k: DMatrix<f64>,
    l: DMatrix<f64>,
}

impl ObserverDynamics {
    pub fn new(model: &StateSpaceModel, k: &DMatrix<f64>, l: &DMatrix<f64>) -> SimResult<Self> {
        // Both calls only validate the gain shapes.
        model.closed_loop_matrix(k)?;
        model.observer_error_matrix(l)?;
        Ok(Self {
            a: model.a().clone(),
            b: model.b().clone(),
            c: model.c().clone(),
            k: k.clone(),
            l: l.clone(),
        })
    }

    fn order(&self) -> usize {
        self.a.nrows()
    }
}

impl Dynamics for ObserverDynamics {
    fn dim(&self) -> usize {
        2 * self.order()
    }

    fn rhs(&self, _t: f64, z: &DVector<f64>) -> SimResult<DVector<f64>> {
        let n = self.order();
        let x = z.rows(0, n);
        let xhat = z.rows(n, n);

        let u = -(&self.k * &xhat);
        let bu = &self.b * &u;
        let innovation = &self.c * (&x - &xhat);

        let dx = &self.a * &x + &bu;
        let dxhat = &self.a * &xhat + &bu + &self.l * innovation;

        let mut dz = DVector::zeros(2 * n);
        dz.rows_mut(0, n).copy_from(&dx);
        dz.rows_mut(n, n).copy_from(&dxhat);
        Ok(dz)
    }
}

fn state_vector(model: &StateSpaceModel, values: &[f64], what: &'static str) -> SimResult<DVector<f64>> {
    if values.len() != model.order() {
        return Err(SimError::Dimension {
            what,
            expected: model.order(),
            found: values.len(),
        });
    }
    Ok(vector_from_slice(values, what)?)
}

/// Free response ẋ = A·x.
pub fn simulate_open_loop(
    model: &StateSpaceModel,
    x0: &[f64],
    t_span: (f64, f64),
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    let x0 = state_vector(model, x0, "x0")?;
    run_sim(&LinearDynamics::new(model.a().clone()), &x0, t_span, opts)
}

/// State-feedback response ẋ = (A - B·K)·x.
pub fn simulate_closed_loop(
    model: &StateSpaceModel,
    k: &DMatrix<f64>,
    x0: &[f64],
    t_span: (f64, f64),
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    let x0 = state_vector(model, x0, "x0")?;
    let a_cl = model.closed_loop_matrix(k)?;
    run_sim(&LinearDynamics::new(a_cl), &x0, t_span, opts)
}

/// Simulate the plant together with its observer from `(x0, xhat0)`.
pub fn simulate_observer(
    model: &StateSpaceModel,
    k: &DMatrix<f64>,
    l: &DMatrix<f64>,
    x0: &[f64],
    xhat0: &[f64],
    t_span: (f64, f64),
    opts: &SimOptions,
) -> SimResult<ObserverTrajectory> {
    let n = model.order();
    let x0 = state_vector(model, x0, "x0")?;
    let xhat0 = state_vector(model, xhat0, "xhat0")?;
    let dynamics = ObserverDynamics::new(model, k, l)?;

    let mut z0 = DVector::zeros(2 * n);
    z0.rows_mut(0, n).copy_from(&x0);
    z0.rows_mut(n, n).copy_from(&xhat0);

    let traj = run_sim(&dynamics, &z0, t_span, opts)?;
    Ok(ObserverTrajectory {
        true_state: traj.values.rows(0, n).into_owned(),
        estimate: traj.values.rows(n, n).into_owned(),
        time: traj.time,
    })
}

fn input_column(model: &StateSpaceModel, input: usize) -> SimResult<DVector<f64>> {
    if input >= model.inputs() {
        return Err(SimError::InvalidArg {
            what: "input index out of range",
        });
    }
    Ok(model.b().column(input).into_owned())
}

/// Output response y = C·x + D·u to a unit step on one input, from rest.
pub fn step_response(
    model: &StateSpaceModel,
    input: usize,
    t_final: f64,
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    let forcing = input_column(model, input)?;
    let dynamics = LinearDynamics::new(model.a().clone()).with_forcing(forcing)?;
    let x0 = DVector::zeros(model.order());
    let traj = run_sim(&dynamics, &x0, (0.0, t_final), opts)?;

    let feedthrough = model.d().column(input).into_owned();
    let mut outputs = model.c() * &traj.values;
    for mut col in outputs.column_iter_mut() {
        col += &feedthrough;
    }
    Ok(Trajectory {
        time: traj.time,
        values: outputs,
    })
}

/// Output response y = C·x to a unit impulse on one input.
///
/// The impulse moves the state to B·e_i at t = 0⁺; the direct
/// feedthrough term D·δ(t) is not representable on a sampled grid and is
/// omitted.
pub fn impulse_response(
    model: &StateSpaceModel,
    input: usize,
    t_final: f64,
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    let x0 = input_column(model, input)?;
    let traj = run_sim(&LinearDynamics::new(model.a().clone()), &x0, (0.0, t_final), opts)?;
    Ok(Trajectory {
        values: model.c() * &traj.values,
        time: traj.time,
    })
}
