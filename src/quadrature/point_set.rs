use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::types::linalg::{symmetrize, Matrix, Vector};

/// A weighted sigma-point cloud.
///
/// Points are stored one per column. Mean weights sum to one; covariance
/// weights may be negative and need not sum to one. The weights belong to the
/// abscissa pattern, so propagating the points through a function keeps them.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    points: Matrix,
    weights_mean: Vector,
    weights_cov: Vector,
}

impl PointSet {
    pub fn new(points: Matrix, weights_mean: Vector, weights_cov: Vector) -> Result<Self> {
        let count = points.ncols();
        if weights_mean.len() != count {
            return Err(FilterError::mismatch("mean weights", count, weights_mean.len()));
        }
        if weights_cov.len() != count {
            return Err(FilterError::mismatch("covariance weights", count, weights_cov.len()));
        }
        Ok(Self {
            points,
            weights_mean,
            weights_cov,
        })
    }

    /// Replace the points, keeping this set's weights
    pub fn with_points(&self, points: Matrix) -> Result<Self> {
        Self::new(points, self.weights_mean.clone(), self.weights_cov.clone())
    }

    /// Dimension of each point
    pub fn dimension(&self) -> usize {
        self.points.nrows()
    }

    /// Number of points
    pub fn count(&self) -> usize {
        self.points.ncols()
    }

    pub fn point(&self, i: usize) -> Vector {
        self.points.column(i).into_owned()
    }

    pub fn points(&self) -> &Matrix {
        &self.points
    }

    pub fn mean_weights_vector(&self) -> &Vector {
        &self.weights_mean
    }

    pub fn covariance_weights_vector(&self) -> &Vector {
        &self.weights_cov
    }

    /// Weighted mean of the points
    pub fn center(&self) -> Vector {
        &self.points * &self.weights_mean
    }

    /// Points with the weighted mean subtracted from every column
    pub fn centered_points(&self) -> Matrix {
        let mu = self.center();
        let mut centered = self.points.clone();
        for mut column in centered.column_iter_mut() {
            column -= &mu;
        }
        centered
    }

    /// Σ wc[i] * (a[i] - mean(a)) * (b[i] - mean(b))ᵀ
    ///
    /// Both sets must come from the same quadrature call, i.e. share count
    /// and covariance weights.
    pub fn cross_covariance(&self, other: &PointSet) -> Result<Matrix> {
        if other.count() != self.count() {
            return Err(FilterError::mismatch("cross covariance points", self.count(), other.count()));
        }
        if other.weights_cov != self.weights_cov {
            return Err(FilterError::InvalidParameters(
                "cross covariance of point sets with different weights".to_string(),
            ));
        }
        Ok(weighted_cross_product(
            &self.centered_points(),
            &other.centered_points(),
            &self.weights_cov,
        ))
    }

    /// Weighted covariance of the points, symmetrized
    pub fn covariance(&self) -> Matrix {
        let centered = self.centered_points();
        symmetrize(&weighted_cross_product(&centered, &centered, &self.weights_cov))
    }

    /// Recombine into mean and covariance
    pub fn to_gaussian(&self) -> Result<Gaussian> {
        Gaussian::new(self.center(), self.covariance())
    }
}

/// A * diag(w) * Bᵀ for column-centered point matrices
pub(crate) fn weighted_cross_product(a: &Matrix, b: &Matrix, weights: &Vector) -> Matrix {
    let mut scaled = a.clone();
    for (mut column, w) in scaled.column_iter_mut().zip(weights.iter()) {
        column *= *w;
    }
    scaled * b.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_points() -> PointSet {
        // Points -1, 0, 1 on the line, equal mean weights
        let points = Matrix::from_row_slice(1, 3, &[-1.0, 0.0, 1.0]);
        let w = Vector::from_element(3, 1.0 / 3.0);
        PointSet::new(points, w.clone(), w).unwrap()
    }

    #[test]
    fn test_new_checks_weight_lengths() {
        let points = Matrix::zeros(2, 5);
        let err = PointSet::new(points, Vector::zeros(4), Vector::zeros(5)).unwrap_err();
        assert_eq!(err, FilterError::mismatch("mean weights", 5, 4));
    }

    #[test]
    fn test_center_and_covariance() {
        let set = three_points();
        assert_eq!(set.dimension(), 1);
        assert_eq!(set.count(), 3);
        assert!(set.center()[0].abs() < 1e-15);
        assert_relative_eq!(set.covariance()[(0, 0)], 2.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_centered_points_shift() {
        let points = Matrix::from_row_slice(2, 2, &[1.0, 3.0, 10.0, 20.0]);
        let w = Vector::from_element(2, 0.5);
        let set = PointSet::new(points, w.clone(), w).unwrap();
        let centered = set.centered_points();
        assert_relative_eq!(centered, Matrix::from_row_slice(2, 2, &[-1.0, 1.0, -5.0, 5.0]));
    }

    #[test]
    fn test_cross_covariance_of_scaled_copy() {
        let set = three_points();
        let doubled = set.with_points(set.points() * 2.0).unwrap();
        let c = set.cross_covariance(&doubled).unwrap();
        assert_relative_eq!(c[(0, 0)], 4.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_cross_covariance_requires_shared_weights() {
        let set = three_points();
        let other = PointSet::new(
            Matrix::zeros(1, 3),
            Vector::from_element(3, 1.0 / 3.0),
            Vector::from_vec(vec![2.0, 0.5, 0.5]),
        )
        .unwrap();
        assert!(set.cross_covariance(&other).is_err());

        let fewer = PointSet::new(Matrix::zeros(1, 2), Vector::zeros(2), Vector::zeros(2)).unwrap();
        assert!(matches!(
            set.cross_covariance(&fewer),
            Err(FilterError::DimensionMismatch { .. })
        ));
    }
}
