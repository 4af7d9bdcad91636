//! Multi-sensor fusion in information form.
//!
//! All K sensors are conditioned on one shared set of state sigma points.
//! Each sensor contributes
//!
//!   A_i = Cyx Cxx⁻¹
//!   S_i = Cyy − Cyx Cxx⁻¹ Cxy      (innovation covariance given the state)
//!   C  += A_iᵀ S_i⁻¹ A_i
//!   D  += A_iᵀ S_i⁻¹ (y_i − μ_y)
//!
//! starting from C = Cxx⁻¹, D = 0. The posterior is P = C⁻¹, μ = μ_x + P D.
//! For conditionally independent sensors this equals one stacked update but
//! only inverts K small m×m matrices plus one n×n matrix.
//!
//! The sensors share one standard-normal noise point set, so they must share
//! a noise dimension; per-sensor noise magnitudes live inside each model.

use nalgebra::DVectorView;

use crate::config::FilterConfig;
use crate::error::{CovarianceKind, FilterError, Result};
use crate::gaussian::Gaussian;
use crate::models::{JointObservationModel, ObservationModel};
use crate::quadrature::point_set::weighted_cross_product;
use crate::quadrature::{PointSet, Quadrature};
use crate::types::linalg::{diagonal_scale, invert_spd, symmetrize, Matrix, Vector};

use super::sigma_point_predict::check_prior;

#[derive(Clone, Copy, Debug)]
pub struct MultiSensorSigmaPointUpdate {
    tolerance: f64,
    parallel: bool,
    parallel_min_sensors: usize,
}

impl Default for MultiSensorSigmaPointUpdate {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

/// Quantities shared read-only by every sensor of one update
struct FusionBasis {
    states: PointSet,
    noise: PointSet,
    centered_states: Matrix,
    mu_x: Vector,
    c_xx_inv: Matrix,
}

impl MultiSensorSigmaPointUpdate {
    /// Sequential fusion with the given singularity tolerance
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            parallel: false,
            parallel_min_sensors: usize::MAX,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            tolerance: config.singularity_tolerance,
            parallel: config.parallel_fusion,
            parallel_min_sensors: config.parallel_min_sensors,
        }
    }

    /// Fuse the stacked observation `y` of all sensors in `joint`.
    ///
    /// Uses worker threads when parallel fusion is enabled and there are at
    /// least `parallel_min_sensors` sensors; the result is the same either way
    /// up to rounding.
    pub fn update<Q>(
        &self,
        joint: &JointObservationModel,
        quadrature: &Q,
        prior: &Gaussian,
        y: &Vector,
    ) -> Result<Gaussian>
    where
        Q: Quadrature + Sync,
    {
        if self.parallel && joint.count_local_models() >= self.parallel_min_sensors {
            self.update_parallel(joint, quadrature, prior, y)
        } else {
            self.update_sequential(joint, quadrature, prior, y)
        }
    }

    /// Accumulate sensor information one sensor at a time, in index order
    pub fn update_sequential<Q>(
        &self,
        joint: &JointObservationModel,
        quadrature: &Q,
        prior: &Gaussian,
        y: &Vector,
    ) -> Result<Gaussian>
    where
        Q: Quadrature,
    {
        check_joint(joint, prior, y)?;
        if joint.count_local_models() == 0 {
            log::debug!("[fusion] no sensors, prior unchanged");
            return Ok(prior.clone());
        }

        let basis = self.prepare(joint, quadrature, prior)?;
        let mut information = basis.c_xx_inv.clone();
        let mut information_vector = Vector::zeros(prior.dimension());

        for (i, model) in joint.iter().enumerate() {
            let y_i = joint.local_observation(y, i)?;
            let (c_i, d_i) = self.sensor_information(&basis, i, model, quadrature, y_i)?;
            information += c_i;
            information_vector += d_i;
        }

        self.finish(&basis, &information, &information_vector)
    }

    /// Split the sensors into contiguous blocks, one per worker thread.
    ///
    /// Workers read the shared sigma points and return partial information
    /// sums which are merged in block order. On failure the error of the
    /// lowest failing sensor index is returned.
    pub fn update_parallel<Q>(
        &self,
        joint: &JointObservationModel,
        quadrature: &Q,
        prior: &Gaussian,
        y: &Vector,
    ) -> Result<Gaussian>
    where
        Q: Quadrature + Sync,
    {
        check_joint(joint, prior, y)?;
        let sensors = joint.count_local_models();
        if sensors == 0 {
            log::debug!("[fusion] no sensors, prior unchanged");
            return Ok(prior.clone());
        }

        let basis = self.prepare(joint, quadrature, prior)?;
        let n = prior.dimension();
        let workers = std::thread::available_parallelism()
            .map_or(1, |w| w.get())
            .min(sensors);
        let block = sensors.div_ceil(workers);
        log::debug!("[fusion] {sensors} sensors on {workers} workers");

        let partials: Vec<Result<(Matrix, Vector)>> = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..sensors)
                .step_by(block)
                .map(|start| {
                    let end = (start + block).min(sensors);
                    let basis = &basis;
                    scope.spawn(move |_| -> Result<(Matrix, Vector)> {
                        let mut c = Matrix::zeros(n, n);
                        let mut d = Vector::zeros(n);
                        for i in start..end {
                            let model = joint.local_model(i).ok_or_else(|| {
                                FilterError::InvalidModelShape(format!("missing sensor {i}"))
                            })?;
                            let y_i = joint.local_observation(y, i)?;
                            let (c_i, d_i) = self.sensor_information(basis, i, model, quadrature, y_i)?;
                            c += c_i;
                            d += d_i;
                        }
                        Ok((c, d))
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        let mut information = basis.c_xx_inv.clone();
        let mut information_vector = Vector::zeros(n);
        for partial in partials {
            let (c, d) = partial?;
            information += c;
            information_vector += d;
        }

        self.finish(&basis, &information, &information_vector)
    }

    /// Sigma points of (state, shared sensor noise) and the prior information
    fn prepare<Q: Quadrature>(
        &self,
        joint: &JointObservationModel,
        quadrature: &Q,
        prior: &Gaussian,
    ) -> Result<FusionBasis> {
        let noise_prior = Gaussian::standard(joint.noise_dimension());
        let (states, noise) = quadrature.transform_to_points(prior, Some(&noise_prior))?;

        let mu_x = states.center();
        let centered_states = states.centered_points();
        let c_xx = symmetrize(&weighted_cross_product(
            &centered_states,
            &centered_states,
            states.covariance_weights_vector(),
        ));
        let c_xx_inv = invert_spd(&c_xx, diagonal_scale(&c_xx), self.tolerance).ok_or_else(|| {
            log::warn!("[fusion] prior state covariance is singular");
            FilterError::singular(CovarianceKind::State, None)
        })?;

        Ok(FusionBasis {
            states,
            noise,
            centered_states,
            mu_x,
            c_xx_inv,
        })
    }

    /// Information contribution (A_iᵀ S_i⁻¹ A_i, A_iᵀ S_i⁻¹ (y_i − μ_y)) of one sensor
    fn sensor_information<M, Q>(
        &self,
        basis: &FusionBasis,
        index: usize,
        model: &M,
        quadrature: &Q,
        y_i: DVectorView<'_, f64>,
    ) -> Result<(Matrix, Vector)>
    where
        M: ObservationModel + ?Sized,
        Q: Quadrature,
    {
        let observations = quadrature.propagate_points(
            |x, w| model.observe(x, w),
            &basis.states,
            &basis.noise,
        )?;
        if observations.dimension() != model.observation_dimension() {
            return Err(FilterError::mismatch(
                "local observation",
                model.observation_dimension(),
                observations.dimension(),
            ));
        }

        let weights = basis.states.covariance_weights_vector();
        let mu_y = observations.center();
        let centered_obs = observations.centered_points();
        let c_yy = symmetrize(&weighted_cross_product(&centered_obs, &centered_obs, weights));
        let c_xy = weighted_cross_product(&basis.centered_states, &centered_obs, weights);

        let a_i = c_xy.transpose() * &basis.c_xx_inv;

        // S_i from the regression residuals Y − A_i X rather than Cyy − A_i Cxy.
        // Both are equal, but a noiseless sensor leaves residuals at rounding
        // level of the observation spread while a small real noise floor stays
        // intact, so S_i is judged in standard deviations against Cyy.
        let residuals = &centered_obs - &a_i * &basis.centered_states;
        let c_yy_given_x = symmetrize(&weighted_cross_product(&residuals, &residuals, weights));
        let c_yy_given_x_inv = invert_spd(
            &c_yy_given_x,
            diagonal_scale(&c_yy),
            self.tolerance * self.tolerance,
        )
        .ok_or_else(|| {
            log::warn!("[fusion] sensor {index}: conditional innovation covariance is singular");
            FilterError::singular(CovarianceKind::ConditionalInnovation, Some(index))
        })?;

        let t = a_i.transpose() * c_yy_given_x_inv;
        let information = &t * &a_i;
        let information_vector = &t * (y_i - &mu_y);

        log::debug!(
            "[fusion] sensor {index}: information trace {:.4e}",
            information.trace()
        );

        Ok((information, information_vector))
    }

    /// C only adds information to Cxx⁻¹, so its pivots are judged against the
    /// prior information rather than the largest sensor contribution.
    fn finish(&self, basis: &FusionBasis, information: &Matrix, information_vector: &Vector) -> Result<Gaussian> {
        let covariance = invert_spd(information, diagonal_scale(&basis.c_xx_inv), self.tolerance)
            .ok_or_else(|| {
                log::warn!("[fusion] accumulated information matrix is singular");
                FilterError::singular(CovarianceKind::Information, None)
            })?;
        let mean = &basis.mu_x + &covariance * information_vector;
        Gaussian::new(mean, covariance)
    }
}

fn check_joint(joint: &JointObservationModel, prior: &Gaussian, y: &Vector) -> Result<()> {
    check_prior(prior, joint.state_dimension())?;
    if y.len() != joint.observation_dimension() {
        return Err(FilterError::mismatch(
            "stacked observation",
            joint.observation_dimension(),
            y.len(),
        ));
    }
    Ok(())
}
