pub mod gaussian_filter;
pub mod multi_sensor_update;
pub mod sigma_point_predict;
pub mod sigma_point_update;

pub use gaussian_filter::{GaussianFilter, ObservationStrategy};
pub use multi_sensor_update::MultiSensorSigmaPointUpdate;
pub use sigma_point_predict::SigmaPointPredict;
pub use sigma_point_update::SigmaPointUpdate;
