use super::{AdditiveProcessModel, ProcessModel};
use crate::error::{FilterError, Result};
use crate::types::linalg::{Matrix, Vector};

/// Constant velocity motion driven by white acceleration noise.
///
/// State: [position (axes); velocity (axes)]. Noise: one acceleration
/// component per axis. No control input.
#[derive(Clone, Debug)]
pub struct ConstantVelocityModel {
    axes: usize,
    accel_std: f64,
}

impl ConstantVelocityModel {
    pub fn new(axes: usize, accel_std: f64) -> Result<Self> {
        if axes == 0 {
            return Err(FilterError::InvalidParameters(
                "constant velocity model needs at least one axis".to_string(),
            ));
        }
        if !(accel_std >= 0.0) {
            return Err(FilterError::InvalidParameters(format!(
                "acceleration std must be non-negative, got {accel_std}"
            )));
        }
        Ok(Self { axes, accel_std })
    }

    pub fn axes(&self) -> usize {
        self.axes
    }

    /// G such that x' = F x + G a
    fn noise_gain(&self, dt: f64) -> Matrix {
        let n = self.axes;
        let mut g = Matrix::zeros(2 * n, n);
        for i in 0..n {
            g[(i, i)] = 0.5 * dt * dt * self.accel_std;
            g[(n + i, i)] = dt * self.accel_std;
        }
        g
    }

    fn drift(&self, state: &Vector, dt: f64) -> Vector {
        let n = self.axes;
        let mut next = state.clone();
        for i in 0..n {
            next[i] += state[n + i] * dt;
        }
        next
    }
}

impl ProcessModel for ConstantVelocityModel {
    fn state_dimension(&self) -> usize {
        2 * self.axes
    }

    fn noise_dimension(&self) -> usize {
        self.axes
    }

    fn input_dimension(&self) -> usize {
        0
    }

    fn next_state(&self, state: &Vector, noise: &Vector, _input: &Vector, dt: f64) -> Vector {
        self.drift(state, dt) + self.noise_gain(dt) * noise
    }
}

impl AdditiveProcessModel for ConstantVelocityModel {
    fn state_dimension(&self) -> usize {
        2 * self.axes
    }

    fn input_dimension(&self) -> usize {
        0
    }

    fn expected_state(&self, state: &Vector, _input: &Vector, dt: f64) -> Vector {
        self.drift(state, dt)
    }

    fn noise_covariance(&self, dt: f64) -> Matrix {
        let g = self.noise_gain(dt);
        &g * g.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_moves_position() {
        let model = ConstantVelocityModel::new(2, 0.5).unwrap();
        let x = Vector::from_vec(vec![0.0, 1.0, 2.0, -1.0]);
        let next = model.next_state(&x, &Vector::zeros(2), &Vector::zeros(0), 0.5);
        assert_eq!(next.as_slice(), &[1.0, 0.5, 2.0, -1.0]);
    }

    #[test]
    fn test_noise_covariance() {
        let model = ConstantVelocityModel::new(1, 2.0).unwrap();
        let q = model.noise_covariance(1.0);
        // G = [0.5 * 2; 1 * 2] = [1; 2]
        assert!((q[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((q[(0, 1)] - 2.0).abs() < 1e-12);
        assert!((q[(1, 1)] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ConstantVelocityModel::new(0, 1.0).is_err());
        assert!(ConstantVelocityModel::new(2, -1.0).is_err());
    }
}
