use super::sigma_point_predict::check_prior;
use crate::error::{CovarianceKind, FilterError, Result};
use crate::gaussian::Gaussian;
use crate::models::{AdditiveObservationModel, ObservationModel};
use crate::quadrature::{PointSet, Quadrature};
use crate::types::linalg::{diagonal_scale, invert_spd, symmetrize, Matrix, Vector};

/// Single-sensor measurement update from sigma-point statistics.
#[derive(Clone, Copy, Debug)]
pub struct SigmaPointUpdate {
    tolerance: f64,
}

impl Default for SigmaPointUpdate {
    fn default() -> Self {
        Self { tolerance: 1e-12 }
    }
}

impl SigmaPointUpdate {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Update with a non-additive observation model. Observation noise is
    /// N(0, I) of the model's noise dimension, augmented into the points.
    pub fn update<M, Q>(&self, model: &M, quadrature: &Q, prior: &Gaussian, y: &Vector) -> Result<Gaussian>
    where
        M: ObservationModel + ?Sized,
        Q: Quadrature,
    {
        check_prior(prior, model.state_dimension())?;
        check_observation(y, model.observation_dimension())?;

        // 1. Generate sigma points over (state, observation noise)
        let noise = Gaussian::standard(model.noise_dimension());
        let (states, noise_points) = quadrature.transform_to_points(prior, Some(&noise))?;

        // 2. Transform sigma points to measurement space
        let observations =
            quadrature.propagate_points(|x, w| model.observe(x, w), &states, &noise_points)?;
        if observations.dimension() != model.observation_dimension() {
            return Err(FilterError::mismatch(
                "predicted observation",
                model.observation_dimension(),
                observations.dimension(),
            ));
        }

        self.correct(&states, &observations, y, None)
    }

    /// Update with an additive observation model: only the state is sampled
    /// and R is added to the predicted observation covariance.
    pub fn update_additive<M, Q>(
        &self,
        model: &M,
        quadrature: &Q,
        prior: &Gaussian,
        y: &Vector,
    ) -> Result<Gaussian>
    where
        M: AdditiveObservationModel + ?Sized,
        Q: Quadrature,
    {
        let m = model.observation_dimension();
        check_prior(prior, model.state_dimension())?;
        check_observation(y, m)?;

        let (states, noise_points) = quadrature.transform_to_points(prior, None)?;
        let observations = quadrature.propagate_points(
            |x, _| model.expected_observation(x),
            &states,
            &noise_points,
        )?;
        if observations.dimension() != m {
            return Err(FilterError::mismatch("predicted observation", m, observations.dimension()));
        }

        let r = model.noise_covariance();
        if r.shape() != (m, m) {
            return Err(FilterError::mismatch("observation noise", m, r.nrows()));
        }

        self.correct(&states, &observations, y, Some(&r))
    }

    /// Kalman correction from the state and observation clouds
    fn correct(
        &self,
        states: &PointSet,
        observations: &PointSet,
        y: &Vector,
        noise_covariance: Option<&Matrix>,
    ) -> Result<Gaussian> {
        let mu_x = states.center();
        let mu_y = observations.center();

        let c_xx = states.covariance();
        let c_xy = states.cross_covariance(observations)?;
        let mut c_yy = observations.covariance();
        if let Some(r) = noise_covariance {
            c_yy += r;
        }

        let c_yy_inv = invert_spd(&c_yy, diagonal_scale(&c_yy), self.tolerance).ok_or_else(|| {
            log::warn!("[UKF] innovation covariance is singular, update rejected");
            FilterError::singular(CovarianceKind::Innovation, None)
        })?;

        // K = Pxy * Pyy^-1
        let gain = &c_xy * &c_yy_inv;
        let innovation = y - &mu_y;

        // Normalized innovation squared for consistency monitoring
        let nis = innovation.dot(&(&c_yy_inv * &innovation));
        log::debug!("[UKF] update NIS = {nis:.3}");

        let mean = mu_x + &gain * innovation;
        let covariance = symmetrize(&(c_xx - &gain * &c_yy * gain.transpose()));

        Gaussian::new(mean, covariance)
    }
}

fn check_observation(y: &Vector, observation_dimension: usize) -> Result<()> {
    if y.len() != observation_dimension {
        return Err(FilterError::mismatch("observation", observation_dimension, y.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinearObservationModel, RangeObservationModel};
    use crate::quadrature::UnscentedQuadrature;
    use approx::assert_relative_eq;

    fn prior() -> Gaussian {
        let cov = Matrix::from_row_slice(3, 3, &[1.0, 0.2, 0.0, 0.2, 2.0, 0.3, 0.0, 0.3, 0.5]);
        Gaussian::new(Vector::from_vec(vec![0.5, -1.0, 2.0]), cov).unwrap()
    }

    /// Textbook Kalman update with the Joseph covariance form
    fn kalman(prior: &Gaussian, h: &Matrix, r: &Matrix, y: &Vector) -> Gaussian {
        let p = prior.covariance();
        let s = h * p * h.transpose() + r;
        let k = p * h.transpose() * s.try_inverse().unwrap();
        let mean = prior.mean() + &k * (y - h * prior.mean());
        let i_kh = Matrix::identity(p.nrows(), p.nrows()) - &k * h;
        let cov = &i_kh * p * i_kh.transpose() + &k * r * k.transpose();
        Gaussian::new(mean, symmetrize(&cov)).unwrap()
    }

    #[test]
    fn test_linear_update_matches_kalman() {
        let h = Matrix::from_row_slice(2, 3, &[1.0, 0.0, 0.5, 0.0, 1.0, -1.0]);
        let r = Matrix::from_row_slice(2, 2, &[0.3, 0.05, 0.05, 0.2]);
        let model = LinearObservationModel::new(h.clone(), r.clone()).unwrap();
        let y = Vector::from_vec(vec![1.5, 0.0]);

        let expected = kalman(&prior(), &h, &r, &y);
        let ut = UnscentedQuadrature::default();

        let posterior = SigmaPointUpdate::default().update(&model, &ut, &prior(), &y).unwrap();
        assert_relative_eq!(posterior.mean(), expected.mean(), epsilon = 1e-10);
        assert_relative_eq!(posterior.covariance(), expected.covariance(), epsilon = 1e-10);

        let additive = SigmaPointUpdate::default()
            .update_additive(&model, &ut, &prior(), &y)
            .unwrap();
        assert_relative_eq!(additive.mean(), expected.mean(), epsilon = 1e-10);
        assert_relative_eq!(additive.covariance(), expected.covariance(), epsilon = 1e-10);
    }

    #[test]
    fn test_nonlinear_update_reduces_uncertainty() {
        let model = RangeObservationModel::new(Vector::from_vec(vec![5.0, 0.0]), 3, 0.1).unwrap();
        let ut = UnscentedQuadrature::default();
        let y = Vector::from_element(1, 4.0);

        let posterior = SigmaPointUpdate::default().update(&model, &ut, &prior(), &y).unwrap();
        assert!(posterior.covariance_trace() < prior().covariance_trace());
        let eigen = posterior.covariance().clone().symmetric_eigen();
        assert!(eigen.eigenvalues.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_singular_innovation() {
        // Deterministic prior observed through a noiseless sensor
        let prior = Gaussian::new(Vector::zeros(2), Matrix::zeros(2, 2)).unwrap();
        let model = LinearObservationModel::new(Matrix::identity(2, 2), Matrix::zeros(2, 2)).unwrap();
        let err = SigmaPointUpdate::default()
            .update(&model, &UnscentedQuadrature::default(), &prior, &Vector::zeros(2))
            .unwrap_err();
        assert_eq!(err, FilterError::singular(CovarianceKind::Innovation, None));
    }

    #[test]
    fn test_observation_length_checked() {
        let model = LinearObservationModel::new(Matrix::identity(3, 3), Matrix::identity(3, 3)).unwrap();
        let err = SigmaPointUpdate::default()
            .update(&model, &UnscentedQuadrature::default(), &prior(), &Vector::zeros(2))
            .unwrap_err();
        assert_eq!(err, FilterError::mismatch("observation", 3, 2));
    }
}
