//! Gaussian belief passed between filter cycles.

use serde::Serialize;

use crate::error::{FilterError, Result};
use crate::types::linalg::{matrix_sqrt, Matrix, Vector};

const SYMMETRY_TOLERANCE: f64 = 1e-9;
const SEMIDEFINITE_TOLERANCE: f64 = 1e-9;

/// Mean and covariance of a multivariate normal.
///
/// The covariance is kept square, symmetric, positive semidefinite and the
/// same size as the mean.
/// Filters never mutate a belief in place; they return a fresh one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Gaussian {
    mean: Vector,
    covariance: Matrix,
}

impl Gaussian {
    pub fn new(mean: Vector, covariance: Matrix) -> Result<Self> {
        check_covariance(mean.len(), &covariance)?;
        Ok(Self { mean, covariance })
    }

    /// Standard normal N(0, I) of the given dimension
    pub fn standard(dimension: usize) -> Self {
        Self {
            mean: Vector::zeros(dimension),
            covariance: Matrix::identity(dimension, dimension),
        }
    }

    /// Build from a mean and per-component standard deviations
    pub fn from_std(mean: Vector, std: &[f64]) -> Result<Self> {
        if std.len() != mean.len() {
            return Err(FilterError::mismatch("standard deviations", mean.len(), std.len()));
        }
        let variances = Vector::from_iterator(std.len(), std.iter().map(|s| s * s));
        Self::new(mean, Matrix::from_diagonal(&variances))
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    pub fn covariance(&self) -> &Matrix {
        &self.covariance
    }

    pub fn set_mean(&mut self, mean: Vector) -> Result<()> {
        if mean.len() != self.dimension() {
            return Err(FilterError::mismatch("belief mean", self.dimension(), mean.len()));
        }
        self.mean = mean;
        Ok(())
    }

    pub fn set_covariance(&mut self, covariance: Matrix) -> Result<()> {
        check_covariance(self.dimension(), &covariance)?;
        self.covariance = covariance;
        Ok(())
    }

    /// Covariance trace for uncertainty
    pub fn covariance_trace(&self) -> f64 {
        self.covariance.trace()
    }

    pub fn into_parts(self) -> (Vector, Matrix) {
        (self.mean, self.covariance)
    }
}

fn check_covariance(dimension: usize, covariance: &Matrix) -> Result<()> {
    if covariance.nrows() != dimension {
        return Err(FilterError::mismatch("covariance rows", dimension, covariance.nrows()));
    }
    if covariance.ncols() != dimension {
        return Err(FilterError::mismatch("covariance columns", dimension, covariance.ncols()));
    }

    let scale = covariance.amax().max(1.0);
    let asymmetry = (covariance - covariance.transpose()).amax();
    if asymmetry > SYMMETRY_TOLERANCE * scale {
        return Err(FilterError::InvalidParameters(format!(
            "covariance is not symmetric (max asymmetry {asymmetry:e})"
        )));
    }

    // Cholesky for the usual definite case, eigenvalues otherwise
    matrix_sqrt(covariance, SEMIDEFINITE_TOLERANCE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_dimensions() {
        let err = Gaussian::new(Vector::zeros(2), Matrix::identity(3, 3)).unwrap_err();
        assert_eq!(err, FilterError::mismatch("covariance rows", 2, 3));

        let err = Gaussian::new(Vector::zeros(2), Matrix::zeros(2, 3)).unwrap_err();
        assert_eq!(err, FilterError::mismatch("covariance columns", 2, 3));
    }

    #[test]
    fn test_new_rejects_asymmetric() {
        let cov = Matrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        assert!(matches!(
            Gaussian::new(Vector::zeros(2), cov),
            Err(FilterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_new_rejects_indefinite() {
        let cov = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            Gaussian::new(Vector::zeros(2), cov),
            Err(FilterError::NotPositiveSemidefinite(_))
        ));

        let mut g = Gaussian::standard(2);
        let err = g.set_covariance(Matrix::from_diagonal(&Vector::from_vec(vec![1.0, -0.5])));
        assert!(matches!(err, Err(FilterError::NotPositiveSemidefinite(_))));
        assert_eq!(g.covariance(), &Matrix::identity(2, 2));
    }

    #[test]
    fn test_accepts_semidefinite() {
        let rank_one = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(Gaussian::new(Vector::zeros(2), rank_one).is_ok());
        assert!(Gaussian::new(Vector::zeros(2), Matrix::zeros(2, 2)).is_ok());
    }

    #[test]
    fn test_standard() {
        let g = Gaussian::standard(3);
        assert_eq!(g.dimension(), 3);
        assert_eq!(g.covariance_trace(), 3.0);
        assert_eq!(g.mean().norm(), 0.0);

        assert_eq!(Gaussian::standard(0).dimension(), 0);
    }

    #[test]
    fn test_from_std() {
        let g = Gaussian::from_std(Vector::from_vec(vec![1.0, 2.0]), &[2.0, 0.5]).unwrap();
        assert_eq!(g.covariance()[(0, 0)], 4.0);
        assert_eq!(g.covariance()[(1, 1)], 0.25);
        assert!(Gaussian::from_std(Vector::zeros(2), &[1.0]).is_err());
    }

    #[test]
    fn test_setters_keep_shape() {
        let mut g = Gaussian::standard(2);
        assert!(g.set_mean(Vector::zeros(3)).is_err());
        assert!(g.set_covariance(Matrix::identity(3, 3)).is_err());

        g.set_mean(Vector::from_vec(vec![1.0, -1.0])).unwrap();
        g.set_covariance(Matrix::identity(2, 2) * 2.0).unwrap();
        assert_eq!(g.mean()[1], -1.0);
        assert_eq!(g.covariance_trace(), 4.0);
    }
}
