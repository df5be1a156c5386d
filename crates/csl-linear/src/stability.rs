//! Poles and asymptotic stability.

use csl_core::PoleSet;
use nalgebra::DMatrix;
use nalgebra::linalg::Schur;

use crate::error::{LinearError, LinearResult};
use crate::model::StateSpaceModel;

/// Default margin for [`is_stable`].
pub const DEFAULT_STABILITY_TOL: f64 = 1e-6;

const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Eigenvalues of a real square matrix via the real Schur form.
///
/// The order follows the diagonal of the Schur form and is stable for a
/// given matrix.
pub fn eigenvalues(m: &DMatrix<f64>) -> LinearResult<PoleSet> {
    if !m.is_square() {
        return Err(LinearError::Shape {
            matrix: "eigenvalue input",
            rows: m.nrows(),
            cols: m.ncols(),
            requirement: "must be square".to_string(),
        });
    }
    if m.is_empty() {
        return Ok(PoleSet::default());
    }
    let schur = Schur::try_new(m.clone(), f64::EPSILON, MAX_SCHUR_ITERATIONS).ok_or_else(|| {
        LinearError::Numeric {
            what: format!(
                "real Schur iteration did not converge for {}x{} matrix",
                m.nrows(),
                m.ncols()
            ),
        }
    })?;
    Ok(schur.complex_eigenvalues().iter().copied().collect())
}

/// Poles of the model: eigenvalues of A.
pub fn poles(model: &StateSpaceModel) -> LinearResult<PoleSet> {
    eigenvalues(model.a())
}

/// Asymptotic stability with a safety margin.
///
/// True iff every pole satisfies `re < -tol`. Poles with real part in
/// `[-tol, 0)` are reported unstable: they are too close to the imaginary
/// axis to be told apart from marginal modes at this precision.
pub fn is_stable(model: &StateSpaceModel, tol: f64) -> LinearResult<bool> {
    Ok(poles(model)?.iter().all(|p| p.re < -tol))
}

/// Largest real part among the poles (spectral abscissa).
pub fn stability_margin(model: &StateSpaceModel) -> LinearResult<f64> {
    poles(model)?
        .max_real_part()
        .ok_or_else(|| LinearError::Numeric {
            what: "model has no poles".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_core::Tolerances;

    fn model(a: &[Vec<f64>]) -> StateSpaceModel {
        let n = a.len();
        StateSpaceModel::new(
            DMatrix::from_row_slice(n, n, &a.concat()),
            DMatrix::from_element(n, 1, 1.0),
            DMatrix::from_element(1, n, 1.0),
            DMatrix::zeros(1, 1),
        )
        .unwrap()
    }

    #[test]
    fn second_order_example() {
        let m = model(&[vec![0.0, 1.0], vec![-2.0, -3.0]]);
        let p = poles(&m).unwrap();
        assert!(p.matches(&PoleSet::from_real(&[-1.0, -2.0]), Tolerances::eigen()));
        assert!(is_stable(&m, DEFAULT_STABILITY_TOL).unwrap());
        assert!((stability_margin(&m).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn oscillator_is_not_stable() {
        let m = model(&[vec![0.0, 1.0], vec![-1.0, 0.0]]);
        let p = poles(&m).unwrap();
        assert!(p.iter().all(|z| z.re.abs() < 1e-9));
        assert!(p.iter().all(|z| (z.im.abs() - 1.0).abs() < 1e-9));
        assert!(!is_stable(&m, DEFAULT_STABILITY_TOL).unwrap());
    }

    #[test]
    fn marginal_pole_inside_margin_is_unstable() {
        let m = model(&[vec![-1e-8]]);
        assert!(!is_stable(&m, DEFAULT_STABILITY_TOL).unwrap());
        assert!(is_stable(&m, 0.0).unwrap());
    }

    #[test]
    fn eigenvalues_are_repeatable() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, -4.0, 0.5, 1.0, 0.0, 3.0, -2.0]);
        assert_eq!(eigenvalues(&a).unwrap(), eigenvalues(&a).unwrap());
    }
}
