//! Rational SISO transfer functions N(s)/D(s).

use std::fmt;

use csl_core::{Complex64, PoleSet};
use csl_linear::StateSpaceModel;
use nalgebra::DMatrix;

use crate::error::{DesignError, DesignResult};
use crate::polynomial::Polynomial;

#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
    num: Polynomial,
    den: Polynomial,
}

impl TransferFunction {
    /// Build from coefficient lists in descending powers of s.
    pub fn new(num: Vec<f64>, den: Vec<f64>) -> DesignResult<Self> {
        Self::from_polynomials(
            Polynomial::new(num, "numerator")?,
            Polynomial::new(den, "denominator")?,
        )
    }

    pub fn from_polynomials(num: Polynomial, den: Polynomial) -> DesignResult<Self> {
        if den.is_zero() {
            return Err(DesignError::ZeroDenominator {
                what: "transfer function",
            });
        }
        Ok(Self { num, den })
    }

    pub fn num(&self) -> &Polynomial {
        &self.num
    }

    pub fn den(&self) -> &Polynomial {
        &self.den
    }

    pub fn is_proper(&self) -> bool {
        self.num.is_zero() || self.num.degree() <= self.den.degree()
    }

    /// Series connection self · other.
    pub fn series(&self, other: &TransferFunction) -> TransferFunction {
        TransferFunction {
            num: &self.num * &other.num,
            den: &self.den * &other.den,
        }
    }

    /// Unity negative feedback around self: N / (D + N).
    pub fn unity_feedback(&self) -> DesignResult<TransferFunction> {
        let den = &self.den + &self.num;
        if den.is_zero() {
            return Err(DesignError::ZeroDenominator {
                what: "closed loop",
            });
        }
        Ok(TransferFunction {
            num: self.num.clone(),
            den,
        })
    }

    pub fn poles(&self) -> DesignResult<PoleSet> {
        self.den.roots()
    }

    pub fn zeros(&self) -> DesignResult<PoleSet> {
        if self.num.is_zero() {
            return Ok(PoleSet::new(Vec::new()));
        }
        self.num.roots()
    }

    /// H(0), or `None` when s = 0 is a pole.
    pub fn dc_gain(&self) -> Option<f64> {
        let d = self.den.eval(0.0);
        (d != 0.0).then(|| self.num.eval(0.0) / d)
    }

    pub fn eval(&self, s: Complex64) -> Complex64 {
        self.num.eval_complex(s) / self.den.eval_complex(s)
    }

    /// H(jω).
    pub fn frequency_point(&self, omega: f64) -> Complex64 {
        self.eval(Complex64::new(0.0, omega))
    }

    /// Controllable canonical realization (A, B, C, D).
    ///
    /// With D(s) normalized to sⁿ + a₁sⁿ⁻¹ + … + aₙ and N(s) padded to
    /// b₀sⁿ + … + bₙ: the last row of A is [-aₙ … -a₁], B = eₙ,
    /// C = [bₙ - b₀aₙ … b₁ - b₀a₁] and D = b₀.
    pub fn to_state_space(&self) -> DesignResult<StateSpaceModel> {
        if !self.is_proper() {
            return Err(DesignError::Improper {
                num_degree: self.num.degree(),
                den_degree: self.den.degree(),
            });
        }
        let n = self.den.degree();
        if n == 0 {
            return Err(DesignError::InvalidArg {
                what: "static gain has no state-space realization",
            });
        }

        let lead = self.den.leading();
        let a_coef: Vec<f64> = self.den.coeffs().iter().map(|c| c / lead).collect();
        let b_coef: Vec<f64> = self.num.padded(n + 1).iter().map(|c| c / lead).collect();
        let d = b_coef[0];

        let mut a = DMatrix::zeros(n, n);
        for i in 0..n - 1 {
            a[(i, i + 1)] = 1.0;
        }
        let mut c = DMatrix::zeros(1, n);
        for j in 0..n {
            // column j pairs with coefficient index n - j
            a[(n - 1, j)] = -a_coef[n - j];
            c[(0, j)] = b_coef[n - j] - d * a_coef[n - j];
        }
        let mut b = DMatrix::zeros(n, 1);
        b[(n - 1, 0)] = 1.0;

        Ok(StateSpaceModel::new(
            a,
            b,
            c,
            DMatrix::from_element(1, 1, d),
        )?)
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) / ({})", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csl_core::Tolerances;

    fn plant() -> TransferFunction {
        TransferFunction::new(vec![1.0], vec![1.0, 3.0, 2.0]).unwrap()
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!(matches!(
            TransferFunction::new(vec![1.0], vec![0.0, 0.0]),
            Err(DesignError::ZeroDenominator { .. })
        ));
    }

    #[test]
    fn poles_zeros_and_gain() {
        let g = TransferFunction::new(vec![1.0, 1.0], vec![1.0, 3.0, 2.0]).unwrap();
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        assert!(g.poles().unwrap().matches(&PoleSet::from_real(&[-1.0, -2.0]), tol));
        assert!(g.zeros().unwrap().matches(&PoleSet::from_real(&[-1.0]), tol));
        assert_eq!(g.dc_gain(), Some(0.5));
    }

    #[test]
    fn feedback_and_series() {
        let k = TransferFunction::new(vec![2.0], vec![1.0]).unwrap();
        let cl = k.series(&plant()).unity_feedback().unwrap();
        assert_eq!(cl.num().coeffs(), &[2.0]);
        assert_eq!(cl.den().coeffs(), &[1.0, 3.0, 4.0]);
        assert_eq!(cl.dc_gain(), Some(0.5));
    }

    #[test]
    fn canonical_realization_matches_frequency_response() {
        let g = TransferFunction::new(vec![2.0, 1.0, 5.0], vec![2.0, 6.0, 4.0]).unwrap();
        let ss = g.to_state_space().unwrap();
        assert_eq!(ss.order(), 2);
        assert_eq!(ss.d()[(0, 0)], 1.0);

        // C (jωI - A)^-1 B + D against direct evaluation
        for &w in &[0.1, 1.0, 7.0] {
            let s = Complex64::new(0.0, w);
            let a = ss.a().map(|v| Complex64::new(v, 0.0));
            let m = DMatrix::<Complex64>::identity(2, 2) * s - a;
            let inv = m.try_inverse().unwrap();
            let b = ss.b().map(|v| Complex64::new(v, 0.0));
            let c = ss.c().map(|v| Complex64::new(v, 0.0));
            let h = (c * inv * b)[(0, 0)] + Complex64::new(ss.d()[(0, 0)], 0.0);
            assert!((h - g.frequency_point(w)).norm() < 1e-12);
        }
    }

    #[test]
    fn improper_has_no_realization() {
        let g = TransferFunction::new(vec![1.0, 0.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert!(!g.is_proper());
        assert!(matches!(
            g.to_state_space(),
            Err(DesignError::Improper {
                num_degree: 2,
                den_degree: 1
            })
        ));
    }
}
