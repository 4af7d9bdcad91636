//! Process and observation model contracts.
//!
//! Non-additive models receive a standard-normal noise vector and map it
//! themselves, so the filters can place noise sigma points without knowing
//! anything about the sensor physics. Additive models expose a deterministic
//! function plus a noise covariance and let the filter skip noise
//! augmentation.

pub mod joint;
pub mod kinematics;
pub mod linear;
pub mod range;

pub use joint::JointObservationModel;
pub use kinematics::ConstantVelocityModel;
pub use linear::{LinearObservationModel, LinearProcessModel};
pub use range::RangeObservationModel;

use crate::types::linalg::{Matrix, Vector};

pub trait ProcessModel {
    fn state_dimension(&self) -> usize;
    fn noise_dimension(&self) -> usize;
    fn input_dimension(&self) -> usize;

    /// x' = f(x, w, u, dt) with w ~ N(0, I)
    fn next_state(&self, state: &Vector, noise: &Vector, input: &Vector, dt: f64) -> Vector;
}

pub trait AdditiveProcessModel {
    fn state_dimension(&self) -> usize;
    fn input_dimension(&self) -> usize;

    /// Deterministic part f(x, u, dt)
    fn expected_state(&self, state: &Vector, input: &Vector, dt: f64) -> Vector;

    /// Q(dt) added to the propagated covariance
    fn noise_covariance(&self, dt: f64) -> Matrix;
}

pub trait ObservationModel {
    fn state_dimension(&self) -> usize;
    fn noise_dimension(&self) -> usize;
    fn observation_dimension(&self) -> usize;

    /// y = h(x, w) with w ~ N(0, I)
    fn observe(&self, state: &Vector, noise: &Vector) -> Vector;
}

pub trait AdditiveObservationModel {
    fn state_dimension(&self) -> usize;
    fn observation_dimension(&self) -> usize;

    /// Deterministic part h(x)
    fn expected_observation(&self, state: &Vector) -> Vector;

    /// R added to the predicted observation covariance
    fn noise_covariance(&self) -> Matrix;
}

/// A local sensor model that can be shared with fusion worker threads
pub type SensorModel = Box<dyn ObservationModel + Send + Sync>;
