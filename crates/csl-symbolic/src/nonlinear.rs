//! Nonlinear systems ẋ = f(x) given as symbolic right-hand sides.

use std::collections::{BTreeMap, BTreeSet};

use csl_sim::{Dynamics, SimOptions, SimResult, Trajectory, run_sim};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::compile::Program;
use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::Expr;
use crate::parser::parse_with_symbols;

/// Output samples used by [`NonlinearSystem::simulate_default`].
pub const NONLINEAR_SAMPLES: usize = 1000;

/// Autonomous system with one expression per state symbol.
///
/// Expressions are compiled once at construction; simulation and
/// evaluation run the compiled programs.
#[derive(Clone, Debug)]
pub struct NonlinearSystem {
    symbols: Vec<String>,
    dynamics: Vec<Expr>,
    programs: Vec<Program>,
}

/// Lyapunov candidate V and its derivative along trajectories.
#[derive(Clone, Debug, PartialEq)]
pub struct LyapunovPair {
    pub v: Expr,
    pub dv_dt: Expr,
}

impl NonlinearSystem {
    pub fn new(symbols: Vec<String>, dynamics: Vec<Expr>) -> SymbolicResult<Self> {
        if symbols.len() != dynamics.len() {
            return Err(SymbolicError::Dimension {
                what: "dynamics",
                expected: symbols.len(),
                found: dynamics.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for s in &symbols {
            if !seen.insert(s.as_str()) {
                return Err(SymbolicError::DuplicateSymbol { name: s.clone() });
            }
        }

        let dynamics: Vec<Expr> = dynamics.iter().map(Expr::simplify).collect();
        let programs = dynamics
            .iter()
            .map(|e| Program::compile(e, &symbols))
            .collect::<SymbolicResult<Vec<_>>>()?;

        Ok(Self {
            symbols,
            dynamics,
            programs,
        })
    }

    /// Parse one right-hand side per state symbol.
    pub fn from_strings<S: AsRef<str>>(symbols: &[S], dynamics: &[S]) -> SymbolicResult<Self> {
        let symbols: Vec<String> = symbols.iter().map(|s| s.as_ref().to_string()).collect();
        if symbols.len() != dynamics.len() {
            return Err(SymbolicError::Dimension {
                what: "dynamics",
                expected: symbols.len(),
                found: dynamics.len(),
            });
        }
        let exprs = dynamics
            .iter()
            .map(|d| parse_with_symbols(d.as_ref(), &symbols))
            .collect::<SymbolicResult<Vec<_>>>()?;
        Self::new(symbols, exprs)
    }

    pub fn order(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn dynamics(&self) -> &[Expr] {
        &self.dynamics
    }

    fn check_point(&self, point: &[f64], what: &'static str) -> SymbolicResult<()> {
        if point.len() != self.order() {
            return Err(SymbolicError::Dimension {
                what,
                expected: self.order(),
                found: point.len(),
            });
        }
        check_finite(point, what)
    }

    /// f(x) through the compiled programs.
    pub fn evaluate(&self, x: &[f64]) -> SymbolicResult<Vec<f64>> {
        self.check_point(x, "x")?;
        let mut stack = Vec::new();
        Ok(self.programs.iter().map(|p| p.eval(x, &mut stack)).collect())
    }

    pub fn simulate(
        &self,
        x0: &[f64],
        t_span: (f64, f64),
        opts: &SimOptions,
    ) -> SymbolicResult<Trajectory> {
        self.check_point(x0, "x0")?;
        let x0 = DVector::from_column_slice(x0);
        Ok(run_sim(self, &x0, t_span, opts)?)
    }

    /// Simulate with the default options on a 1000-sample grid.
    pub fn simulate_default(&self, x0: &[f64], t_span: (f64, f64)) -> SymbolicResult<Trajectory> {
        self.simulate(x0, t_span, &SimOptions::with_samples(NONLINEAR_SAMPLES))
    }

    /// Symbolic Jacobian ∂fᵢ/∂xⱼ, row-major.
    pub fn jacobian(&self) -> Vec<Vec<Expr>> {
        self.dynamics
            .iter()
            .map(|f| self.symbols.iter().map(|s| f.diff(s)).collect())
            .collect()
    }

    /// Jacobian evaluated at `point`.
    ///
    /// A point shorter than the state leaves the trailing states unbound,
    /// reported as [`SymbolicError::FreeSymbols`] whether or not they
    /// survive simplification.
    pub fn linearize_at(&self, point: &[f64]) -> SymbolicResult<DMatrix<f64>> {
        if point.len() > self.order() {
            return Err(SymbolicError::Dimension {
                what: "point",
                expected: self.order(),
                found: point.len(),
            });
        }
        if point.len() < self.order() {
            return Err(SymbolicError::FreeSymbols {
                symbols: self.symbols[point.len()..].to_vec(),
            });
        }
        check_finite(point, "point")?;
        let values: BTreeMap<String, f64> = self
            .symbols
            .iter()
            .cloned()
            .zip(point.iter().copied())
            .collect();

        let n = self.order();
        let mut out = DMatrix::zeros(n, n);
        for (i, row) in self.jacobian().iter().enumerate() {
            for (j, entry) in row.iter().enumerate() {
                out[(i, j)] = entry.substitute_values(&values).eval(&BTreeMap::new())?;
            }
        }
        debug!(order = n, "linearized nonlinear system");
        Ok(out)
    }

    /// Parse V over the state symbols and form dV/dt = ∇V · f.
    pub fn lyapunov_derivative(&self, v: &str) -> SymbolicResult<LyapunovPair> {
        let v = parse_with_symbols(v, &self.symbols)?;
        let dv_dt = self
            .symbols
            .iter()
            .zip(self.dynamics.iter())
            .fold(Expr::num(0.0), |acc, (s, f)| {
                Expr::add(acc, Expr::mul(v.diff(s), f.clone()))
            });
        Ok(LyapunovPair { v, dv_dt })
    }

    /// Evaluate any expression over the state symbols at `point`.
    pub fn evaluate_expr(&self, expr: &Expr, point: &[f64]) -> SymbolicResult<f64> {
        self.check_point(point, "point")?;
        let values: BTreeMap<String, f64> = self
            .symbols
            .iter()
            .cloned()
            .zip(point.iter().copied())
            .collect();
        expr.eval(&values)
    }
}

fn check_finite(point: &[f64], what: &'static str) -> SymbolicResult<()> {
    match point.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SymbolicError::NonFinite {
            what,
            index,
            value: point[index],
        }),
        None => Ok(()),
    }
}

impl Dynamics for NonlinearSystem {
    fn dim(&self) -> usize {
        self.order()
    }

    fn rhs(&self, _t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        let mut stack = Vec::new();
        Ok(DVector::from_iterator(
            self.order(),
            self.programs.iter().map(|p| p.eval(x.as_slice(), &mut stack)),
        ))
    }
}
