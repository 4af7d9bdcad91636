use super::{AdditiveObservationModel, AdditiveProcessModel, ObservationModel, ProcessModel};
use crate::error::{FilterError, Result};
use crate::types::linalg::{matrix_sqrt, Matrix, Vector};

const SQRT_TOLERANCE: f64 = 1e-10;

/// y = H x + sqrt(R) w
#[derive(Clone, Debug)]
pub struct LinearObservationModel {
    sensor_matrix: Matrix,
    noise_covariance: Matrix,
    noise_sqrt: Matrix,
}

impl LinearObservationModel {
    pub fn new(sensor_matrix: Matrix, noise_covariance: Matrix) -> Result<Self> {
        let m = sensor_matrix.nrows();
        if noise_covariance.nrows() != m || noise_covariance.ncols() != m {
            return Err(FilterError::mismatch(
                "observation noise covariance",
                m,
                noise_covariance.nrows(),
            ));
        }
        let noise_sqrt = matrix_sqrt(&noise_covariance, SQRT_TOLERANCE)?;
        Ok(Self {
            sensor_matrix,
            noise_covariance,
            noise_sqrt,
        })
    }

    pub fn sensor_matrix(&self) -> &Matrix {
        &self.sensor_matrix
    }
}

impl ObservationModel for LinearObservationModel {
    fn state_dimension(&self) -> usize {
        self.sensor_matrix.ncols()
    }

    fn noise_dimension(&self) -> usize {
        self.noise_sqrt.ncols()
    }

    fn observation_dimension(&self) -> usize {
        self.sensor_matrix.nrows()
    }

    fn observe(&self, state: &Vector, noise: &Vector) -> Vector {
        &self.sensor_matrix * state + &self.noise_sqrt * noise
    }
}

impl AdditiveObservationModel for LinearObservationModel {
    fn state_dimension(&self) -> usize {
        self.sensor_matrix.ncols()
    }

    fn observation_dimension(&self) -> usize {
        self.sensor_matrix.nrows()
    }

    fn expected_observation(&self, state: &Vector) -> Vector {
        &self.sensor_matrix * state
    }

    fn noise_covariance(&self) -> Matrix {
        self.noise_covariance.clone()
    }
}

/// x' = A x + B u + G w
#[derive(Clone, Debug)]
pub struct LinearProcessModel {
    transition: Matrix,
    control: Matrix,
    noise_gain: Matrix,
}

impl LinearProcessModel {
    pub fn new(transition: Matrix, control: Matrix, noise_gain: Matrix) -> Result<Self> {
        let n = transition.nrows();
        if transition.ncols() != n {
            return Err(FilterError::mismatch("transition matrix", n, transition.ncols()));
        }
        if control.nrows() != n {
            return Err(FilterError::mismatch("control matrix rows", n, control.nrows()));
        }
        if noise_gain.nrows() != n {
            return Err(FilterError::mismatch("noise gain rows", n, noise_gain.nrows()));
        }
        Ok(Self {
            transition,
            control,
            noise_gain,
        })
    }
}

impl ProcessModel for LinearProcessModel {
    fn state_dimension(&self) -> usize {
        self.transition.nrows()
    }

    fn noise_dimension(&self) -> usize {
        self.noise_gain.ncols()
    }

    fn input_dimension(&self) -> usize {
        self.control.ncols()
    }

    fn next_state(&self, state: &Vector, noise: &Vector, input: &Vector, _dt: f64) -> Vector {
        &self.transition * state + &self.control * input + &self.noise_gain * noise
    }
}

impl AdditiveProcessModel for LinearProcessModel {
    fn state_dimension(&self) -> usize {
        self.transition.nrows()
    }

    fn input_dimension(&self) -> usize {
        self.control.ncols()
    }

    fn expected_state(&self, state: &Vector, input: &Vector, _dt: f64) -> Vector {
        &self.transition * state + &self.control * input
    }

    fn noise_covariance(&self, _dt: f64) -> Matrix {
        &self.noise_gain * self.noise_gain.transpose()
    }
}
