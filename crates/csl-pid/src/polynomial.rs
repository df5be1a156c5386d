//! Real polynomials in descending powers of s.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use csl_core::{Complex64, PoleSet};
use csl_linear::eigenvalues;
use nalgebra::DMatrix;

use crate::error::{DesignError, DesignResult};

/// Polynomial `c[0] s^n + c[1] s^(n-1) + ... + c[n]`.
///
/// Leading zeros are trimmed; the zero polynomial is stored as `[0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<f64>, what: &'static str) -> DesignResult<Self> {
        if coeffs.is_empty() {
            return Err(DesignError::InvalidArg {
                what: "polynomial needs at least one coefficient",
            });
        }
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(DesignError::NonFinite { what });
        }
        Ok(Self::trimmed(coeffs))
    }

    fn trimmed(coeffs: Vec<f64>) -> Self {
        let first = coeffs.iter().position(|c| *c != 0.0);
        let coeffs = match first {
            Some(i) => coeffs[i..].to_vec(),
            None => vec![0.0],
        };
        Self { coeffs }
    }

    pub fn constant(c: f64) -> Self {
        Self { coeffs: vec![c] }
    }

    /// The polynomial `s`.
    pub fn s() -> Self {
        Self {
            coeffs: vec![1.0, 0.0],
        }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    pub fn leading(&self) -> f64 {
        self.coeffs[0]
    }

    pub fn scale(&self, k: f64) -> Self {
        Self::trimmed(self.coeffs.iter().map(|c| c * k).collect())
    }

    pub fn eval(&self, s: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, c| acc * s + c)
    }

    pub fn eval_complex(&self, s: Complex64) -> Complex64 {
        self.coeffs
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, c| acc * s + *c)
    }

    /// Roots as eigenvalues of the companion matrix.
    pub fn roots(&self) -> DesignResult<PoleSet> {
        let n = self.degree();
        if n == 0 {
            return Ok(PoleSet::new(Vec::new()));
        }
        let lead = self.leading();
        let mut companion = DMatrix::zeros(n, n);
        for j in 0..n {
            companion[(0, j)] = -self.coeffs[j + 1] / lead;
        }
        for i in 1..n {
            companion[(i, i - 1)] = 1.0;
        }
        Ok(eigenvalues(&companion)?)
    }

    /// Coefficients left-padded with zeros to `len`.
    pub fn padded(&self, len: usize) -> Vec<f64> {
        let mut out = vec![0.0; len.saturating_sub(self.coeffs.len())];
        out.extend_from_slice(&self.coeffs);
        out
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let a = self.padded(len);
        let b = rhs.padded(len);
        Polynomial::trimmed(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &rhs.scale(-1.0)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut out = vec![0.0; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Polynomial::trimmed(out)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.degree();
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate() {
            let power = n - i;
            if *c == 0.0 && !(first && power == 0) {
                continue;
            }
            if !first {
                write!(f, " {} ", if *c < 0.0 { '-' } else { '+' })?;
            } else if *c < 0.0 {
                write!(f, "-")?;
            }
            let mag = c.abs();
            match power {
                0 => write!(f, "{mag}")?,
                1 if mag == 1.0 => write!(f, "s")?,
                1 => write!(f, "{mag} s")?,
                _ if mag == 1.0 => write!(f, "s^{power}")?,
                _ => write!(f, "{mag} s^{power}")?,
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_core::Tolerances;

    fn p(c: &[f64]) -> Polynomial {
        Polynomial::new(c.to_vec(), "test").unwrap()
    }

    #[test]
    fn trims_leading_zeros() {
        assert_eq!(p(&[0.0, 0.0, 1.0, 2.0]).coeffs(), &[1.0, 2.0]);
        assert_eq!(p(&[0.0, 0.0]).coeffs(), &[0.0]);
        assert!(p(&[0.0]).is_zero());
    }

    #[test]
    fn arithmetic() {
        let a = p(&[1.0, 1.0]);
        let b = p(&[1.0, 2.0]);
        assert_eq!((&a * &b).coeffs(), &[1.0, 3.0, 2.0]);
        assert_eq!((&a + &p(&[1.0, 0.0, 0.0])).coeffs(), &[1.0, 1.0, 1.0]);
        assert_eq!((&a - &a).coeffs(), &[0.0]);
    }

    #[test]
    fn evaluation() {
        let q = p(&[1.0, 3.0, 2.0]);
        assert_eq!(q.eval(1.0), 6.0);
        let v = q.eval_complex(Complex64::new(0.0, 1.0));
        assert_eq!(v, Complex64::new(1.0, 3.0));
    }

    #[test]
    fn roots_from_companion_matrix() {
        let roots = p(&[2.0, 6.0, 4.0]).roots().unwrap();
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        assert!(roots.matches(&PoleSet::from_real(&[-1.0, -2.0]), tol));
        assert!(p(&[5.0]).roots().unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_coefficients() {
        assert!(matches!(
            Polynomial::new(vec![], "num"),
            Err(DesignError::InvalidArg { .. })
        ));
        assert!(matches!(
            Polynomial::new(vec![1.0, f64::NAN], "num"),
            Err(DesignError::NonFinite { what: "num" })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(p(&[1.0, -3.0, 2.0]).to_string(), "s^2 - 3 s + 2");
        assert_eq!(p(&[0.5, 0.0, 1.0]).to_string(), "0.5 s^2 + 1");
        assert_eq!(p(&[0.0]).to_string(), "0");
    }
}
