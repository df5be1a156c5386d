//! Controllability and observability rank tests.

use nalgebra::DMatrix;
use nalgebra::linalg::SVD;

use crate::error::{LinearError, LinearResult};
use crate::model::StateSpaceModel;

const MAX_SVD_ITERATIONS: usize = 10_000;

/// Wc = [B, A·B, A²·B, …, A^(n−1)·B] for an arbitrary (A, B) pair.
///
/// `a` must be n×n and `b` must have n rows.
pub fn controllability_matrix_of(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let m = b.ncols();
    let mut wc = DMatrix::zeros(n, n * m);
    let mut block = b.clone();
    for i in 0..n {
        wc.view_mut((0, i * m), (n, m)).copy_from(&block);
        if i + 1 < n {
            block = a * &block;
        }
    }
    wc
}

/// Wo = [C; C·A; C·A²; …; C·A^(n−1)] for an arbitrary (A, C) pair.
pub fn observability_matrix_of(a: &DMatrix<f64>, c: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let p = c.nrows();
    let mut wo = DMatrix::zeros(n * p, n);
    let mut block = c.clone();
    for i in 0..n {
        wo.view_mut((i * p, 0), (p, n)).copy_from(&block);
        if i + 1 < n {
            block = &block * a;
        }
    }
    wo
}

pub fn controllability_matrix(model: &StateSpaceModel) -> DMatrix<f64> {
    controllability_matrix_of(model.a(), model.b())
}

pub fn observability_matrix(model: &StateSpaceModel) -> DMatrix<f64> {
    observability_matrix_of(model.a(), model.c())
}

/// Numerical rank: number of singular values above
/// `max(rows, cols) · ε · σ_max`.
pub fn rank(m: &DMatrix<f64>) -> LinearResult<usize> {
    if m.is_empty() {
        return Ok(0);
    }
    let svd = SVD::try_new(m.clone(), false, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or_else(|| LinearError::Numeric {
            what: format!(
                "SVD did not converge for {}x{} matrix",
                m.nrows(),
                m.ncols()
            ),
        })?;
    let sigma_max = svd.singular_values.max();
    if sigma_max <= 0.0 {
        return Ok(0);
    }
    let tol = m.nrows().max(m.ncols()) as f64 * f64::EPSILON * sigma_max;
    Ok(svd.singular_values.iter().filter(|&&s| s > tol).count())
}

/// Controllability of an (A, B) pair.
pub fn is_controllable_pair(a: &DMatrix<f64>, b: &DMatrix<f64>) -> LinearResult<bool> {
    Ok(rank(&controllability_matrix_of(a, b))? == a.nrows())
}

pub fn is_controllable(model: &StateSpaceModel) -> LinearResult<bool> {
    is_controllable_pair(model.a(), model.b())
}

pub fn is_observable(model: &StateSpaceModel) -> LinearResult<bool> {
    Ok(rank(&observability_matrix(model))? == model.order())
}

/// Structured rank-test verdicts for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilitySummary {
    pub order: usize,
    pub controllability_matrix: DMatrix<f64>,
    pub observability_matrix: DMatrix<f64>,
    pub controllability_rank: usize,
    pub observability_rank: usize,
    pub controllable: bool,
    pub observable: bool,
}

pub fn summary(model: &StateSpaceModel) -> LinearResult<ReachabilitySummary> {
    let wc = controllability_matrix(model);
    let wo = observability_matrix(model);
    let rank_wc = rank(&wc)?;
    let rank_wo = rank(&wo)?;
    let n = model.order();
    Ok(ReachabilitySummary {
        order: n,
        controllability_matrix: wc,
        observability_matrix: wo,
        controllability_rank: rank_wc,
        observability_rank: rank_wo,
        controllable: rank_wc == n,
        observable: rank_wo == n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> StateSpaceModel {
        StateSpaceModel::from_rows(
            &[vec![0.0, 1.0], vec![-2.0, -3.0]],
            &[vec![0.0], vec![1.0]],
            &[vec![1.0, 0.0]],
            &[vec![0.0]],
        )
        .unwrap()
    }

    #[test]
    fn controllability_matrix_columns() {
        let wc = controllability_matrix(&example());
        // [B, AB] = [[0, 1], [1, -3]]
        assert_eq!(wc, DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, -3.0]));
    }

    #[test]
    fn observability_matrix_rows() {
        let wo = observability_matrix(&example());
        // [C; CA] = [[1, 0], [0, 1]]
        assert_eq!(wo, DMatrix::<f64>::identity(2, 2));
    }

    #[test]
    fn mimo_block_layout() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::<f64>::identity(2, 2);
        let wc = controllability_matrix_of(&a, &b);
        assert_eq!(wc.shape(), (2, 4));
        assert_eq!(wc.columns(2, 2).into_owned(), a);
    }

    #[test]
    fn rank_of_degenerate_matrices() {
        assert_eq!(rank(&DMatrix::zeros(3, 3)).unwrap(), 0);
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0]);
        assert_eq!(rank(&m).unwrap(), 1);
        assert_eq!(rank(&DMatrix::<f64>::identity(4, 4)).unwrap(), 4);
    }

    #[test]
    fn summary_verdicts() {
        let s = summary(&example()).unwrap();
        assert_eq!(s.controllability_rank, 2);
        assert_eq!(s.observability_rank, 2);
        assert!(s.controllable && s.observable);
    }

    #[test]
    fn decoupled_input_is_not_controllable() {
        let m = StateSpaceModel::from_rows(
            &[vec![-1.0, 0.0], vec![0.0, -2.0]],
            &[vec![1.0], vec![0.0]],
            &[vec![1.0, 1.0]],
            &[vec![0.0]],
        )
        .unwrap();
        let s = summary(&m).unwrap();
        assert!(s.controllability_rank < 2);
        assert!(!s.controllable);
        assert!(s.observable);
    }
}
