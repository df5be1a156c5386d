//! Pole placement for state feedback and observer gains.
//!
//! A single algorithm serves both problems. The state-feedback problem finds
//! K such that eig(A − B·K) equals the desired poles. The observer problem is
//! solved as its dual: place (Aᵀ, Cᵀ) and transpose the gain, giving L with
//! eig(A − L·C) at the desired poles.
//!
//! # Method
//!
//! - Single input: Ackermann's formula `K = eₙᵀ·Wc⁻¹·φ(A)`, where φ is the
//!   desired characteristic polynomial.
//! - Multiple inputs: eigenstructure assignment. For each desired pole λ the
//!   admissible closed-loop eigenvectors are the x-parts of ker[A − λI, B].
//!   Starting vectors are projected into those subspaces and then
//!   re-orthogonalised one at a time (Kautsky–Nichols–Van Dooren, method 0)
//!   to keep the eigenvector matrix X well conditioned. With W the matching
//!   input directions, K = −W·X⁻¹.
//!
//! # Preconditions
//!
//! Checked before any numeric work, in this order: pole count equals the
//! order, poles are finite, complex poles come in conjugate pairs, no pole is
//! repeated more often than rank(B), and (A, B) is controllable.

use csl_core::{Complex64, PoleSet, Tolerances};
use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{LinearError, LinearResult, PlacementError};
use crate::reachability::{controllability_matrix_of, rank};
use crate::stability::eigenvalues;

/// Tolerance used to decide whether two desired poles are the same value.
pub const PLACEMENT_TOL: Tolerances = Tolerances {
    abs: 1e-10,
    rel: 1e-8,
};

const MAX_SVD_ITERATIONS: usize = 10_000;

/// Eigenvector matrices with a reciprocal condition number below this are
/// treated as singular.
const MIN_RCOND: f64 = 1e-13;

type CMatrix = DMatrix<Complex64>;
type CVector = DVector<Complex64>;

/// Which branch of the placement algorithm produced the gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMethod {
    Ackermann,
    Eigenstructure,
}

/// Options for the multi-input conditioning sweeps.
#[derive(Debug, Clone)]
pub struct PlacementOptions {
    /// Maximum number of full passes over the eigenvectors.
    pub max_sweeps: usize,
    /// Stop once no eigenvector direction changes by more than this
    /// (measured as 1 − |⟨x_old, x_new⟩| for unit vectors).
    pub sweep_tol: f64,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            max_sweeps: 50,
            sweep_tol: 1e-10,
        }
    }
}

/// Result of a placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    /// K (m×n) for state feedback, L (n×p) for observers.
    pub gain: DMatrix<f64>,
    /// Eigenvalues of the resulting closed-loop (or estimation error) matrix.
    pub achieved_poles: PoleSet,
    pub method: PlacementMethod,
    /// Conditioning sweeps performed (0 for Ackermann).
    pub sweeps: usize,
    pub converged: bool,
}

/// State-feedback gain K with eig(A − B·K) at `desired`.
pub fn place_state_feedback(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    desired: &PoleSet,
) -> LinearResult<PlacementResult> {
    place_state_feedback_with(a, b, desired, &PlacementOptions::default())
}

pub fn place_state_feedback_with(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    desired: &PoleSet,
    opts: &PlacementOptions,
) -> LinearResult<PlacementResult> {
    check_pair_shapes(a, b, "B", "rows")?;
    validate_request(a, b, desired)?;

    let (gain, method, sweeps, converged) = if b.ncols() == 1 {
        (ackermann(a, b, desired)?, PlacementMethod::Ackermann, 0, true)
    } else {
        let outcome = eigenstructure(a, b, desired, opts)?;
        (
            outcome.gain,
            PlacementMethod::Eigenstructure,
            outcome.sweeps,
            outcome.converged,
        )
    };

    let achieved_poles = eigenvalues(&(a - b * &gain))?;
    if !desired.matches(&achieved_poles, Tolerances::eigen()) {
        debug!(
            desired = %desired,
            achieved = %achieved_poles,
            "placed poles deviate from the request beyond eigen tolerance"
        );
    }

    Ok(PlacementResult {
        gain,
        achieved_poles,
        method,
        sweeps,
        converged,
    })
}

/// Observer gain L with eig(A − L·C) at `desired`.
///
/// Solved as the dual state-feedback problem on (Aᵀ, Cᵀ); the result is the
/// transpose of that gain. An uncontrollable dual pair is reported as an
/// unobservable (A, C) pair.
pub fn place_observer_gain(
    a: &DMatrix<f64>,
    c: &DMatrix<f64>,
    desired: &PoleSet,
) -> LinearResult<PlacementResult> {
    place_observer_gain_with(a, c, desired, &PlacementOptions::default())
}

pub fn place_observer_gain_with(
    a: &DMatrix<f64>,
    c: &DMatrix<f64>,
    desired: &PoleSet,
    opts: &PlacementOptions,
) -> LinearResult<PlacementResult> {
    check_pair_shapes(a, &c.transpose(), "C", "columns")?;

    let dual = place_state_feedback_with(&a.transpose(), &c.transpose(), desired, opts)
        .map_err(|err| match err {
            LinearError::Placement(PlacementError::Uncontrollable { rank, order }) => {
                LinearError::Placement(PlacementError::Unobservable { rank, order })
            }
            other => other,
        })?;

    let gain = dual.gain.transpose();
    let achieved_poles = eigenvalues(&(a - &gain * c))?;
    Ok(PlacementResult {
        gain,
        achieved_poles,
        ..dual
    })
}

/// `b` is the gain channel matrix in state-feedback orientation (n rows).
fn check_pair_shapes(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    name: &'static str,
    along: &str,
) -> LinearResult<()> {
    if a.nrows() == 0 || !a.is_square() {
        return Err(LinearError::Shape {
            matrix: "A",
            rows: a.nrows(),
            cols: a.ncols(),
            requirement: "must be square and non-empty".to_string(),
        });
    }
    if b.nrows() != a.nrows() || b.ncols() == 0 {
        let (rows, cols) = if name == "C" {
            (b.ncols(), b.nrows())
        } else {
            (b.nrows(), b.ncols())
        };
        return Err(LinearError::Shape {
            matrix: name,
            rows,
            cols,
            requirement: format!("must have {} {along} (order of A)", a.nrows()),
        });
    }
    Ok(())
}

fn validate_request(a: &DMatrix<f64>, b: &DMatrix<f64>, desired: &PoleSet) -> LinearResult<()> {
    let n = a.nrows();
    if desired.len() != n {
        return Err(PlacementError::PoleCount {
            expected: n,
            found: desired.len(),
        }
        .into());
    }
    if let Some(&pole) = desired
        .iter()
        .find(|p| !p.re.is_finite() || !p.im.is_finite())
    {
        return Err(PlacementError::NonFinitePole { pole }.into());
    }
    if let Some(pole) = desired.first_unpaired(PLACEMENT_TOL) {
        return Err(PlacementError::UnpairedComplexPole { pole }.into());
    }

    let rank_b = rank(b)?;
    for (pole, multiplicity) in desired.multiplicities(PLACEMENT_TOL) {
        if multiplicity > rank_b {
            return Err(PlacementError::MultiplicityExceedsRank {
                pole,
                multiplicity,
                rank: rank_b,
            }
            .into());
        }
    }

    let rank_wc = rank(&controllability_matrix_of(a, b))?;
    if rank_wc < n {
        return Err(PlacementError::Uncontrollable {
            rank: rank_wc,
            order: n,
        }
        .into());
    }
    Ok(())
}

/// Real coefficients of Π(s − pᵢ), highest power first.
pub fn characteristic_coefficients(poles: &PoleSet) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &p in poles {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * p;
        }
        coeffs = next;
    }
    coeffs.iter().map(|c| c.re).collect()
}

fn ackermann(a: &DMatrix<f64>, b: &DMatrix<f64>, desired: &PoleSet) -> LinearResult<DMatrix<f64>> {
    let n = a.nrows();
    let identity = DMatrix::<f64>::identity(n, n);

    // φ(A) by Horner's scheme
    let coeffs = characteristic_coefficients(desired);
    let mut phi = &identity * coeffs[0];
    for &c in &coeffs[1..] {
        phi = &phi * a + &identity * c;
    }

    let wc = controllability_matrix_of(a, b);
    let mut e_n = DVector::zeros(n);
    e_n[n - 1] = 1.0;
    let row = wc
        .transpose()
        .lu()
        .solve(&e_n)
        .ok_or_else(|| PlacementError::Singular {
            what: "controllability matrix is not invertible".to_string(),
        })?;

    let k = phi.tr_mul(&row);
    Ok(DMatrix::from_row_slice(1, n, k.as_slice()))
}

/// x-parts and w-parts of an orthonormal basis of ker[A − λI, B].
struct Admissible {
    zx: CMatrix,
    zw: CMatrix,
    zx_pinv: CMatrix,
}

impl Admissible {
    fn new(a: &CMatrix, b: &CMatrix, lambda: Complex64) -> LinearResult<Self> {
        let n = a.nrows();
        let m = b.ncols();

        // Pad to a square matrix so the SVD returns a full V.
        let mut s = CMatrix::zeros(n + m, n + m);
        s.view_mut((0, 0), (n, n)).copy_from(a);
        for i in 0..n {
            s[(i, i)] -= lambda;
        }
        s.view_mut((0, n), (n, m)).copy_from(b);

        let svd = SVD::try_new(s, false, true, f64::EPSILON, MAX_SVD_ITERATIONS)
            .ok_or_else(|| svd_failure("admissible subspace"))?;
        let v_t = svd
            .v_t
            .as_ref()
            .ok_or_else(|| svd_failure("admissible subspace"))?;

        let mut order: Vec<usize> = (0..n + m).collect();
        order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));

        let mut z = CMatrix::zeros(n + m, m);
        for (col, &idx) in order.iter().take(m).enumerate() {
            z.set_column(col, &v_t.row(idx).adjoint());
        }
        let zx = z.rows(0, n).into_owned();
        let zw = z.rows(n, m).into_owned();

        let pinv_svd = SVD::try_new(zx.clone(), true, true, f64::EPSILON, MAX_SVD_ITERATIONS)
            .ok_or_else(|| svd_failure("eigenvector projector"))?;
        let largest = pinv_svd.singular_values.max();
        if largest <= f64::EPSILON {
            return Err(PlacementError::Singular {
                what: format!("no admissible eigenvector for pole {lambda}"),
            }
            .into());
        }
        let zx_pinv = pinv_svd
            .pseudo_inverse(largest * 1e-10)
            .map_err(|what| LinearError::Numeric {
                what: what.to_string(),
            })?;

        Ok(Self { zx, zw, zx_pinv })
    }

    /// Closest admissible (x, w) to direction `y`, scaled so |x| = 1.
    fn project(&self, y: &CVector) -> (CVector, CVector) {
        let mut coeffs = &self.zx_pinv * y;
        let mut x = &self.zx * &coeffs;
        if x.norm() < 1e-8 {
            // y is (numerically) orthogonal to the subspace: fall back to
            // the basis direction with the largest state component.
            let best = (0..self.zx.ncols())
                .max_by(|&i, &j| {
                    self.zx
                        .column(i)
                        .norm()
                        .total_cmp(&self.zx.column(j).norm())
                })
                .unwrap_or(0);
            coeffs = CVector::zeros(self.zx.ncols());
            coeffs[best] = Complex64::new(1.0, 0.0);
            x = &self.zx * &coeffs;
        }
        let scale = Complex64::new(1.0 / x.norm(), 0.0);
        let w = &self.zw * &coeffs * scale;
        (x * scale, w)
    }
}

fn svd_failure(what: &str) -> LinearError {
    LinearError::Numeric {
        what: format!("SVD did not converge while computing {what}"),
    }
}

struct EigenstructureOutcome {
    gain: DMatrix<f64>,
    sweeps: usize,
    converged: bool,
}

fn eigenstructure(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    desired: &PoleSet,
    opts: &PlacementOptions,
) -> LinearResult<EigenstructureOutcome> {
    let n = a.nrows();
    let m = b.ncols();
    let a_c = a.map(|v| Complex64::new(v, 0.0));
    let b_c = b.map(|v| Complex64::new(v, 0.0));
    let poles: Vec<Complex64> = desired
        .iter()
        .map(|&p| {
            if is_real(p) {
                Complex64::new(p.re, 0.0)
            } else {
                p
            }
        })
        .collect();

    // Lower-half-plane poles mirror their conjugate partner's eigenvector.
    let mut mirror_of: Vec<Option<usize>> = vec![None; n];
    let mut claimed = vec![false; n];
    for i in 0..n {
        if is_real(poles[i]) || poles[i].im > 0.0 {
            continue;
        }
        let partner = (0..n).find(|&k| {
            !claimed[k]
                && poles[k].im > 0.0
                && (poles[k] - poles[i].conj()).norm()
                    <= PLACEMENT_TOL.bound(poles[k].norm(), poles[i].norm())
        });
        match partner {
            Some(k) => {
                claimed[k] = true;
                mirror_of[i] = Some(k);
            }
            None => {
                return Err(PlacementError::UnpairedComplexPole { pole: poles[i] }.into());
            }
        }
    }
    let primaries: Vec<usize> = (0..n).filter(|&i| mirror_of[i].is_none()).collect();
    let mirrors: Vec<(usize, usize)> = (0..n)
        .filter_map(|i| mirror_of[i].map(|k| (k, i)))
        .collect();

    let mut subspaces: Vec<Option<Admissible>> = (0..n).map(|_| None).collect();
    for &j in &primaries {
        subspaces[j] = Some(Admissible::new(&a_c, &b_c, poles[j])?);
    }

    let mut x_mat = CMatrix::zeros(n, n);
    let mut w_mat = CMatrix::zeros(m, n);
    let set_slot = |x_mat: &mut CMatrix, w_mat: &mut CMatrix, j: usize, x: &CVector, w: &CVector| {
        x_mat.set_column(j, x);
        w_mat.set_column(j, w);
        if let Some(&(_, mirror)) = mirrors.iter().find(|(primary, _)| *primary == j) {
            x_mat.set_column(mirror, &x.conjugate());
            w_mat.set_column(mirror, &w.conjugate());
        }
    };

    for &j in &primaries {
        if let Some(space) = &subspaces[j] {
            let mut e = CVector::zeros(n);
            e[j] = Complex64::new(1.0, 0.0);
            let (x, w) = space.project(&e);
            set_slot(&mut x_mat, &mut w_mat, j, &x, &w);
        }
    }

    let mut sweeps = 0;
    let mut converged = n < 2;
    if !converged {
        for sweep in 1..=opts.max_sweeps {
            let mut max_change: f64 = 0.0;
            for &j in &primaries {
                let Some(space) = &subspaces[j] else { continue };
                let y = complement_direction(&x_mat, j)?;
                let (x, w) = space.project(&y);
                let change = 1.0 - x_mat.column(j).dotc(&x).norm();
                max_change = max_change.max(change);
                set_slot(&mut x_mat, &mut w_mat, j, &x, &w);
            }
            sweeps = sweep;
            debug!(sweep, max_change, "eigenvector conditioning sweep");
            if max_change < opts.sweep_tol {
                converged = true;
                break;
            }
        }
    }

    let svd = SVD::try_new(x_mat.clone(), false, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or_else(|| svd_failure("eigenvector conditioning"))?;
    let rcond = svd.singular_values.min() / svd.singular_values.max();
    if !(rcond > MIN_RCOND) {
        return Err(PlacementError::Singular {
            what: format!("reciprocal condition number {rcond:e}"),
        }
        .into());
    }

    // K·X = −W  ⇔  Xᵀ·Kᵀ = −Wᵀ
    let k_t = x_mat
        .transpose()
        .lu()
        .solve(&(-w_mat.transpose()))
        .ok_or_else(|| PlacementError::Singular {
            what: "eigenvector matrix LU solve failed".to_string(),
        })?;
    let imag = k_t.iter().map(|z| z.im.abs()).fold(0.0, f64::max);
    debug!(imag, rcond, "eigenstructure gain assembled");

    Ok(EigenstructureOutcome {
        gain: k_t.transpose().map(|z| z.re),
        sweeps,
        converged,
    })
}

fn is_real(p: Complex64) -> bool {
    p.im.abs() <= PLACEMENT_TOL.bound(p.re, 0.0)
}

/// Unit vector orthogonal to every column of `x` except column `j`.
fn complement_direction(x: &CMatrix, j: usize) -> LinearResult<CVector> {
    let mut others = x.clone();
    others.column_mut(j).fill(Complex64::new(0.0, 0.0));
    let svd = SVD::try_new(others, true, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or_else(|| svd_failure("orthogonal complement"))?;
    let u = svd.u.as_ref().ok_or_else(|| svd_failure("orthogonal complement"))?;
    let smallest = svd.singular_values.imin();
    Ok(u.column(smallest).into_owned())
}
