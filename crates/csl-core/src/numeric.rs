use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Loose tolerances for comparing results of iterative eigen computations.
    pub fn eigen() -> Self {
        Self {
            abs: 1e-6,
            rel: 1e-6,
        }
    }

    /// Allowed difference between `a` and `b` under these tolerances.
    pub fn bound(&self, a: Real, b: Real) -> Real {
        self.abs.max(self.rel * a.abs().max(b.abs()))
    }
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// `count` evenly spaced samples from `start` to `end`, both included.
///
/// The last sample is exactly `end` so that resampled trajectories always
/// close on the requested final time.
pub fn linspace(start: Real, end: Real, count: usize) -> Vec<Real> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as Real;
            let mut out: Vec<Real> = (0..count).map(|i| start + step * i as Real).collect();
            out[count - 1] = end;
            out
        }
    }
}

/// `count` logarithmically spaced samples from `10^start_exp` to `10^end_exp`.
pub fn logspace(start_exp: Real, end_exp: Real, count: usize) -> Vec<Real> {
    linspace(start_exp, end_exp, count)
        .into_iter()
        .map(|e| Real::powf(10.0, e))
        .collect()
}
