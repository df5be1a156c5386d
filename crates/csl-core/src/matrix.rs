//! Conversion between nested numeric rows and `nalgebra` matrices.

use nalgebra::{DMatrix, DVector};

use crate::error::{CoreError, CoreResult};
use crate::numeric::ensure_finite;

/// Build a dense matrix from row-major nested rows.
///
/// Rejects empty input, ragged rows and non-finite entries.
pub fn matrix_from_rows(rows: &[Vec<f64>], what: &'static str) -> CoreResult<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if nrows == 0 || ncols == 0 {
        return Err(CoreError::Empty { what });
    }

    let mut flat = Vec::with_capacity(nrows * ncols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(CoreError::Ragged {
                what,
                row: i,
                expected: ncols,
                found: row.len(),
            });
        }
        for &v in row {
            flat.push(ensure_finite(v, what)?);
        }
    }

    Ok(DMatrix::from_row_slice(nrows, ncols, &flat))
}

/// Flatten a matrix back into row-major nested rows.
pub fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Build a column vector, rejecting non-finite entries.
pub fn vector_from_slice(values: &[f64], what: &'static str) -> CoreResult<DVector<f64>> {
    for &v in values {
        ensure_finite(v, what)?;
    }
    Ok(DVector::from_column_slice(values))
}
