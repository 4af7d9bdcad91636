use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::models::{AdditiveProcessModel, ProcessModel};
use crate::quadrature::Quadrature;
use crate::types::linalg::{symmetrize, Vector};

/// Time update: push the belief through the process model and recombine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SigmaPointPredict;

impl SigmaPointPredict {
    /// Non-additive prediction. Process noise is N(0, I) of the model's
    /// noise dimension and is augmented into the sigma points.
    pub fn predict<P, Q>(
        &self,
        model: &P,
        quadrature: &Q,
        prior: &Gaussian,
        input: &Vector,
        dt: f64,
    ) -> Result<Gaussian>
    where
        P: ProcessModel + ?Sized,
        Q: Quadrature,
    {
        check_prior(prior, model.state_dimension())?;
        if input.len() != model.input_dimension() {
            return Err(FilterError::mismatch("process input", model.input_dimension(), input.len()));
        }

        // 1. Generate sigma points over (state, process noise)
        let noise = Gaussian::standard(model.noise_dimension());
        let (states, noise_points) = quadrature.transform_to_points(prior, Some(&noise))?;

        // 2. Propagate through the motion model
        let predicted = quadrature.propagate_points(
            |x, w| model.next_state(x, w, input, dt),
            &states,
            &noise_points,
        )?;
        if predicted.dimension() != model.state_dimension() {
            return Err(FilterError::mismatch(
                "predicted state",
                model.state_dimension(),
                predicted.dimension(),
            ));
        }

        // 3. Recombine
        predicted.to_gaussian()
    }

    /// Additive prediction: only the state is sampled, Q(dt) is added after
    /// recombination.
    pub fn predict_additive<P, Q>(
        &self,
        model: &P,
        quadrature: &Q,
        prior: &Gaussian,
        input: &Vector,
        dt: f64,
    ) -> Result<Gaussian>
    where
        P: AdditiveProcessModel + ?Sized,
        Q: Quadrature,
    {
        let n = model.state_dimension();
        check_prior(prior, n)?;
        if input.len() != model.input_dimension() {
            return Err(FilterError::mismatch("process input", model.input_dimension(), input.len()));
        }

        let (states, noise_points) = quadrature.transform_to_points(prior, None)?;
        let predicted = quadrature.propagate_points(
            |x, _| model.expected_state(x, input, dt),
            &states,
            &noise_points,
        )?;
        if predicted.dimension() != n {
            return Err(FilterError::mismatch("predicted state", n, predicted.dimension()));
        }

        let process_noise = model.noise_covariance(dt);
        if process_noise.shape() != (n, n) {
            return Err(FilterError::mismatch("process noise", n, process_noise.nrows()));
        }

        Gaussian::new(
            predicted.center(),
            symmetrize(&(predicted.covariance() + process_noise)),
        )
    }
}

pub(crate) fn check_prior(prior: &Gaussian, state_dimension: usize) -> Result<()> {
    if prior.dimension() != state_dimension {
        return Err(FilterError::mismatch("prior state", state_dimension, prior.dimension()));
    }
    Ok(())
}
