//! Sampled trajectories on a fixed time grid.

use nalgebra::{DMatrix, DVector};

/// Time vector paired with a matrix of samples.
///
/// Rows are state (or output) components, columns are time samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub values: DMatrix<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of components per sample.
    pub fn dim(&self) -> usize {
        self.values.nrows()
    }

    pub fn sample(&self, k: usize) -> DVector<f64> {
        self.values.column(k).into_owned()
    }

    pub fn final_sample(&self) -> Option<DVector<f64>> {
        if self.is_empty() {
            None
        } else {
            Some(self.sample(self.len() - 1))
        }
    }

    /// Time history of component `i`.
    pub fn component(&self, i: usize) -> Vec<f64> {
        self.values.row(i).iter().copied().collect()
    }

    /// All components as nested rows (one row per component).
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dim()).map(|i| self.component(i)).collect()
    }
}

/// Joint simulation of a plant and its state observer.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverTrajectory {
    pub time: Vec<f64>,
    pub true_state: DMatrix<f64>,
    pub estimate: DMatrix<f64>,
}

impl ObserverTrajectory {
    /// Estimation error x - x̂ at every sample.
    pub fn estimation_error(&self) -> DMatrix<f64> {
        &self.true_state - &self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_access() {
        let traj = Trajectory {
            time: vec![0.0, 1.0, 2.0],
            values: DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        };
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.dim(), 2);
        assert_eq!(traj.component(1), vec![4.0, 5.0, 6.0]);
        assert_eq!(traj.final_sample().unwrap().as_slice(), &[3.0, 6.0]);
        assert_eq!(traj.to_rows()[0], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn estimation_error_is_difference() {
        let obs = ObserverTrajectory {
            time: vec![0.0, 1.0],
            true_state: DMatrix::from_row_slice(1, 2, &[1.0, 2.0]),
            estimate: DMatrix::from_row_slice(1, 2, &[0.5, 2.0]),
        };
        assert_eq!(obs.estimation_error(), DMatrix::from_row_slice(1, 2, &[0.5, 0.0]));
    }
}
