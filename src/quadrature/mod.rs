//! Deterministic sigma-point quadrature.
//!
//! A quadrature rule turns a Gaussian (optionally augmented with a noise
//! Gaussian) into a weighted point cloud, and pushes such clouds through
//! arbitrary functions. Filters only recombine the propagated clouds.

pub mod point_set;
pub mod unscented;

pub use point_set::PointSet;
pub use unscented::UnscentedQuadrature;

use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::types::linalg::{Matrix, Vector};

pub trait Quadrature {
    /// Number of points generated for an augmented dimension
    fn number_of_points(&self, dimension: usize) -> usize;

    /// Sigma points of the joint (state, noise) Gaussian, split into the state
    /// rows and the noise rows. Both sets share one weight pattern.
    ///
    /// The weighted mean and covariance of the joint points reproduce the
    /// input moments exactly. Without a noise prior the noise set has
    /// dimension zero.
    fn transform_to_points(
        &self,
        prior: &Gaussian,
        noise_prior: Option<&Gaussian>,
    ) -> Result<(PointSet, PointSet)>;

    /// Apply `f(state[i], noise[i])` to every point pair. The result keeps
    /// the weights of `states`.
    fn propagate_points<F>(&self, f: F, states: &PointSet, noise: &PointSet) -> Result<PointSet>
    where
        F: Fn(&Vector, &Vector) -> Vector,
    {
        if noise.count() != states.count() {
            return Err(FilterError::mismatch("noise points", states.count(), noise.count()));
        }

        let mut outputs = Vec::with_capacity(states.count());
        for i in 0..states.count() {
            outputs.push(f(&states.point(i), &noise.point(i)));
        }

        let dim = outputs.first().map_or(0, |y| y.len());
        let mut points = Matrix::zeros(dim, states.count());
        for (i, y) in outputs.iter().enumerate() {
            if y.len() != dim {
                return Err(FilterError::mismatch("propagated point", dim, y.len()));
            }
            points.set_column(i, y);
        }

        states.with_points(points)
    }
}
