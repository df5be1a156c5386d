//! Validated continuous-time state-space models.

use csl_core::matrix_from_rows;
use nalgebra::DMatrix;

use crate::error::{LinearError, LinearResult};

/// Linear time-invariant model ẋ = A·x + B·u, y = C·x + D·u.
///
/// Immutable after construction: every accessor hands out shared references
/// and derived quantities (closed-loop matrix, dual model) are new values.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpaceModel {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DMatrix<f64>,
    d: DMatrix<f64>,
}

fn shape_error(
    matrix: &'static str,
    m: &DMatrix<f64>,
    requirement: impl Into<String>,
) -> LinearError {
    LinearError::Shape {
        matrix,
        rows: m.nrows(),
        cols: m.ncols(),
        requirement: requirement.into(),
    }
}

impl StateSpaceModel {
    /// Create a model, checking that all four matrices agree in shape.
    ///
    /// # Errors
    ///
    /// `LinearError::Shape` when A is empty or not square, B does not have n
    /// rows, C does not have n columns, or D is not (rows of C) x (columns of B).
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        c: DMatrix<f64>,
        d: DMatrix<f64>,
    ) -> LinearResult<Self> {
        let n = a.nrows();
        if n == 0 {
            return Err(shape_error("A", &a, "must not be empty"));
        }
        if !a.is_square() {
            return Err(shape_error("A", &a, "must be square"));
        }
        if b.nrows() != n || b.ncols() == 0 {
            return Err(shape_error(
                "B",
                &b,
                format!("must have {n} rows (order of A) and at least one column"),
            ));
        }
        if c.ncols() != n || c.nrows() == 0 {
            return Err(shape_error(
                "C",
                &c,
                format!("must have {n} columns (order of A) and at least one row"),
            ));
        }
        if d.nrows() != c.nrows() || d.ncols() != b.ncols() {
            return Err(shape_error(
                "D",
                &d,
                format!("must be {}x{} (rows of C x columns of B)", c.nrows(), b.ncols()),
            ));
        }
        Ok(Self { a, b, c, d })
    }

    /// Create a model from row-major nested sequences.
    pub fn from_rows(
        a: &[Vec<f64>],
        b: &[Vec<f64>],
        c: &[Vec<f64>],
        d: &[Vec<f64>],
    ) -> LinearResult<Self> {
        Self::new(
            matrix_from_rows(a, "A")?,
            matrix_from_rows(b, "B")?,
            matrix_from_rows(c, "C")?,
            matrix_from_rows(d, "D")?,
        )
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn c(&self) -> &DMatrix<f64> {
        &self.c
    }

    pub fn d(&self) -> &DMatrix<f64> {
        &self.d
    }

    /// State dimension n.
    pub fn order(&self) -> usize {
        self.a.nrows()
    }

    /// Input dimension m.
    pub fn inputs(&self) -> usize {
        self.b.ncols()
    }

    /// Output dimension p.
    pub fn outputs(&self) -> usize {
        self.c.nrows()
    }

    /// A − B·K for a state-feedback gain K (m×n).
    pub fn closed_loop_matrix(&self, k: &DMatrix<f64>) -> LinearResult<DMatrix<f64>> {
        if k.nrows() != self.inputs() || k.ncols() != self.order() {
            return Err(shape_error(
                "K",
                k,
                format!("must be {}x{} (inputs x order)", self.inputs(), self.order()),
            ));
        }
        Ok(&self.a - &self.b * k)
    }

    /// A − L·C for an observer gain L (n×p).
    pub fn observer_error_matrix(&self, l: &DMatrix<f64>) -> LinearResult<DMatrix<f64>> {
        if l.nrows() != self.order() || l.ncols() != self.outputs() {
            return Err(shape_error(
                "L",
                l,
                format!("must be {}x{} (order x outputs)", self.order(), self.outputs()),
            ));
        }
        Ok(&self.a - l * &self.c)
    }

    /// Dual model (Aᵀ, Cᵀ, Bᵀ, Dᵀ): observability of `self` is
    /// controllability of the dual and vice versa.
    pub fn dual(&self) -> Self {
        Self {
            a: self.a.transpose(),
            b: self.c.transpose(),
            c: self.b.transpose(),
            d: self.d.transpose(),
        }
    }
}
