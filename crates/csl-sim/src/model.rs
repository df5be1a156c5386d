//! Dynamics trait for pluggable right-hand sides.

use nalgebra::DVector;

use crate::error::SimResult;

/// Right-hand side of an ODE ẋ = g(t, x).
///
/// Implementations are pure: the same `(t, x)` always yields the same
/// derivative, which keeps simulations bit-for-bit repeatable.
pub trait Dynamics {
    /// Length of the state vector.
    fn dim(&self) -> usize;

    /// Compute state derivative dxdt = g(t, x).
    fn rhs(&self, t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>>;
}

impl<D: Dynamics + ?Sized> Dynamics for &D {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn rhs(&self, t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        (**self).rhs(t, x)
    }
}

/// Adapter turning a closure into [`Dynamics`].
pub struct FnDynamics<F> {
    dim: usize,
    f: F,
}

impl<F> FnDynamics<F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    pub fn new(dim: usize, f: F) -> Self {
        Self { dim, f }
    }
}

impl<F> Dynamics for FnDynamics<F>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn rhs(&self, t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        Ok((self.f)(t, x))
    }
}
