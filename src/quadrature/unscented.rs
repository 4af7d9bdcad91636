use serde::{Deserialize, Serialize};

use super::{PointSet, Quadrature};
use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::types::linalg::{block_diagonal, matrix_sqrt, Matrix, Vector};

const SQRT_TOLERANCE: f64 = 1e-10;

/// Scaled unscented transform with 2a + 1 points for augmented dimension a.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnscentedQuadrature {
    /// Spread of sigma points
    pub alpha: f64,
    /// Prior knowledge (2.0 for Gaussian)
    pub beta: f64,
    /// Secondary scaling
    pub kappa: f64,
}

impl Default for UnscentedQuadrature {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 2.0,
            kappa: 0.0,
        }
    }
}

impl UnscentedQuadrature {
    pub fn new(alpha: f64, beta: f64, kappa: f64) -> Result<Self> {
        if !(alpha > 0.0) || !alpha.is_finite() {
            return Err(FilterError::InvalidParameters(format!(
                "unscented alpha must be positive, got {alpha}"
            )));
        }
        if !beta.is_finite() || !kappa.is_finite() {
            return Err(FilterError::InvalidParameters(
                "unscented beta and kappa must be finite".to_string(),
            ));
        }
        Ok(Self { alpha, beta, kappa })
    }

    /// Combined scaling parameter λ = α²(a + κ) − a
    pub fn lambda(&self, dimension: usize) -> f64 {
        let a = dimension as f64;
        self.alpha * self.alpha * (a + self.kappa) - a
    }

    /// Mean and covariance weights for an augmented dimension
    pub fn weights(&self, dimension: usize) -> Result<(Vector, Vector)> {
        let count = self.number_of_points(dimension);
        let lambda = self.lambda(dimension);
        let scale = dimension as f64 + lambda;
        if !(scale > 0.0) {
            return Err(FilterError::InvalidParameters(format!(
                "unscented scale a + lambda = {scale} must be positive (a = {dimension})"
            )));
        }

        let mut weights_mean = Vector::from_element(count, 1.0 / (2.0 * scale));
        let mut weights_cov = weights_mean.clone();
        weights_mean[0] = lambda / scale;
        weights_cov[0] = lambda / scale + (1.0 - self.alpha * self.alpha + self.beta);

        Ok((weights_mean, weights_cov))
    }
}

impl Quadrature for UnscentedQuadrature {
    fn number_of_points(&self, dimension: usize) -> usize {
        2 * dimension + 1
    }

    fn transform_to_points(
        &self,
        prior: &Gaussian,
        noise_prior: Option<&Gaussian>,
    ) -> Result<(PointSet, PointSet)> {
        let standard = Gaussian::standard(0);
        let noise = noise_prior.unwrap_or(&standard);

        let n = prior.dimension();
        let q = noise.dimension();
        let a = n + q;
        let (weights_mean, weights_cov) = self.weights(a)?;
        let scale = (a as f64 + self.lambda(a)).sqrt();

        // Compute L = sqrt((a+lambda)*P_aug); the augmented covariance is block
        // diagonal so each block is factored on its own
        let l_state = matrix_sqrt(prior.covariance(), SQRT_TOLERANCE)?;
        let l_noise = matrix_sqrt(noise.covariance(), SQRT_TOLERANCE)?;
        let l_mat = block_diagonal(&l_state, &l_noise) * scale;

        let mut mean = Vector::zeros(a);
        mean.rows_mut(0, n).copy_from(prior.mean());
        mean.rows_mut(n, q).copy_from(noise.mean());

        let count = self.number_of_points(a);
        let mut points = Matrix::zeros(a, count);

        // Sigma point 0: mean
        points.set_column(0, &mean);

        // Sigma points 1..a: mean + L_col[i], (a+1)..2a: mean - L_col[i]
        for i in 0..a {
            let offset = l_mat.column(i);
            points.set_column(i + 1, &(&mean + offset));
            points.set_column(a + i + 1, &(&mean - offset));
        }

        let states = PointSet::new(
            points.rows(0, n).into_owned(),
            weights_mean.clone(),
            weights_cov.clone(),
        )?;
        let noise_points = PointSet::new(points.rows(n, q).into_owned(), weights_mean, weights_cov)?;

        Ok((states, noise_points))
    }
}
