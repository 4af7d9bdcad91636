//! Sigma-point Gaussian filtering with multi-sensor information-form fusion.
//!
//! The crate is layered bottom-up:
//!
//! - [`types::linalg`]: dynamic nalgebra aliases and the SPD primitives
//! - [`gaussian`]: the belief (mean, covariance)
//! - [`quadrature`]: unscented sigma points and their weighted statistics
//! - [`models`]: process and observation model contracts plus stock models
//! - [`filters`]: predict, single-sensor update, multi-sensor fusion and the
//!   [`GaussianFilter`] orchestrator
//!
//! Every operation returns a fresh [`Gaussian`]; nothing is mutated on error.

pub mod config;
pub mod error;
pub mod filters;
pub mod gaussian;
pub mod models;
pub mod quadrature;
pub mod types;

pub use config::FilterConfig;
pub use error::{CovarianceKind, FilterError, Result};
pub use filters::{
    GaussianFilter, MultiSensorSigmaPointUpdate, ObservationStrategy, SigmaPointPredict,
    SigmaPointUpdate,
};
pub use gaussian::Gaussian;
pub use models::{
    AdditiveObservationModel, AdditiveProcessModel, JointObservationModel, ObservationModel,
    ProcessModel, SensorModel,
};
pub use quadrature::{PointSet, Quadrature, UnscentedQuadrature};
pub use types::linalg::{Matrix, Vector};
