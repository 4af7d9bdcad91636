use super::ObservationModel;
use crate::error::{FilterError, Result};
use crate::types::linalg::Vector;

/// Distance from a fixed beacon to the position part of the state.
///
/// The first `beacon.len()` state components are the position; anything
/// after that (velocity etc.) is not observed.
#[derive(Clone, Debug)]
pub struct RangeObservationModel {
    beacon: Vector,
    state_dimension: usize,
    noise_std: f64,
}

impl RangeObservationModel {
    pub fn new(beacon: Vector, state_dimension: usize, noise_std: f64) -> Result<Self> {
        if beacon.len() > state_dimension {
            return Err(FilterError::mismatch(
                "range beacon",
                state_dimension,
                beacon.len(),
            ));
        }
        if !(noise_std >= 0.0) {
            return Err(FilterError::InvalidParameters(format!(
                "range noise std must be non-negative, got {noise_std}"
            )));
        }
        Ok(Self {
            beacon,
            state_dimension,
            noise_std,
        })
    }

    pub fn beacon(&self) -> &Vector {
        &self.beacon
    }

    /// Noise-free range
    pub fn range(&self, state: &Vector) -> f64 {
        (state.rows(0, self.beacon.len()) - &self.beacon).norm()
    }
}

impl ObservationModel for RangeObservationModel {
    fn state_dimension(&self) -> usize {
        self.state_dimension
    }

    fn noise_dimension(&self) -> usize {
        1
    }

    fn observation_dimension(&self) -> usize {
        1
    }

    fn observe(&self, state: &Vector, noise: &Vector) -> Vector {
        Vector::from_element(1, self.range(state) + self.noise_std * noise[0])
    }
}
