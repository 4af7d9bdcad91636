use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::models::{AdditiveObservationModel, JointObservationModel, ProcessModel, SensorModel};
use crate::quadrature::{Quadrature, UnscentedQuadrature};
use crate::types::linalg::Vector;

use super::{MultiSensorSigmaPointUpdate, SigmaPointPredict, SigmaPointUpdate};

/// How measurements enter the filter
pub enum ObservationStrategy {
    /// One sensor, noise augmented into the sigma points
    Single(SensorModel),
    /// One sensor with additive noise, no augmentation
    SingleAdditive(Box<dyn AdditiveObservationModel + Send + Sync>),
    /// K conditionally independent sensors fused in information form
    MultiSensor(JointObservationModel),
}

impl ObservationStrategy {
    pub fn state_dimension(&self) -> usize {
        match self {
            ObservationStrategy::Single(model) => model.state_dimension(),
            ObservationStrategy::SingleAdditive(model) => model.state_dimension(),
            ObservationStrategy::MultiSensor(joint) => joint.state_dimension(),
        }
    }

    pub fn observation_dimension(&self) -> usize {
        match self {
            ObservationStrategy::Single(model) => model.observation_dimension(),
            ObservationStrategy::SingleAdditive(model) => model.observation_dimension(),
            ObservationStrategy::MultiSensor(joint) => joint.observation_dimension(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObservationStrategy::Single(_) => "single",
            ObservationStrategy::SingleAdditive(_) => "single-additive",
            ObservationStrategy::MultiSensor(_) => "multi-sensor",
        }
    }
}

impl std::fmt::Debug for ObservationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationStrategy")
            .field("kind", &self.name())
            .field("observation_dimension", &self.observation_dimension())
            .finish()
    }
}

/// Sigma-point Gaussian filter.
///
/// Holds the models and policies, never the belief: each call takes the
/// caller's belief and returns a new one, so a failed call leaves the
/// caller's state untouched.
pub struct GaussianFilter<P, Q = UnscentedQuadrature> {
    process: P,
    observation: ObservationStrategy,
    quadrature: Q,
    config: FilterConfig,
    predict_policy: SigmaPointPredict,
    update_policy: SigmaPointUpdate,
    fusion_policy: MultiSensorSigmaPointUpdate,
}

impl<P: ProcessModel> GaussianFilter<P, UnscentedQuadrature> {
    pub fn new(process: P, observation: ObservationStrategy, config: FilterConfig) -> Result<Self> {
        let quadrature = config.quadrature()?;
        Self::with_quadrature(process, observation, quadrature, config)
    }

    /// Filter fusing several sensors that observe the same state.
    ///
    /// Sensors with a different state or noise dimension are rejected here
    /// rather than during an update.
    pub fn multi_sensor(process: P, sensors: Vec<SensorModel>, config: FilterConfig) -> Result<Self> {
        let joint = JointObservationModel::new(process.state_dimension(), sensors)?;
        Self::new(process, ObservationStrategy::MultiSensor(joint), config)
    }
}

impl<P, Q> GaussianFilter<P, Q>
where
    P: ProcessModel,
    Q: Quadrature + Sync,
{
    pub fn with_quadrature(
        process: P,
        observation: ObservationStrategy,
        quadrature: Q,
        config: FilterConfig,
    ) -> Result<Self> {
        config.validate()?;
        if observation.state_dimension() != process.state_dimension() {
            return Err(FilterError::mismatch(
                "observation model state",
                process.state_dimension(),
                observation.state_dimension(),
            ));
        }

        log::debug!(
            "[filter] {} update, state {}, observation {}",
            observation.name(),
            process.state_dimension(),
            observation.observation_dimension()
        );

        Ok(Self {
            predict_policy: SigmaPointPredict,
            update_policy: SigmaPointUpdate::new(config.singularity_tolerance),
            fusion_policy: MultiSensorSigmaPointUpdate::from_config(&config),
            process,
            observation,
            quadrature,
            config,
        })
    }

    /// Time update
    pub fn predict(&self, belief: &Gaussian, input: &Vector, dt: f64) -> Result<Gaussian> {
        self.predict_policy
            .predict(&self.process, &self.quadrature, belief, input, dt)
    }

    /// Measurement update, dispatched on the observation strategy
    pub fn update(&self, belief: &Gaussian, y: &Vector) -> Result<Gaussian> {
        match &self.observation {
            ObservationStrategy::Single(model) => {
                self.update_policy
                    .update(model.as_ref(), &self.quadrature, belief, y)
            }
            ObservationStrategy::SingleAdditive(model) => {
                self.update_policy
                    .update_additive(model.as_ref(), &self.quadrature, belief, y)
            }
            ObservationStrategy::MultiSensor(joint) => {
                self.fusion_policy.update(joint, &self.quadrature, belief, y)
            }
        }
    }

    /// Predict then update. `belief` is replaced only if both succeed.
    pub fn step(&self, belief: &mut Gaussian, input: &Vector, dt: f64, y: &Vector) -> Result<()> {
        let predicted = self.predict(belief, input, dt)?;
        let posterior = self.update(&predicted, y)?;
        *belief = posterior;
        Ok(())
    }

    pub fn observation_dimension(&self) -> usize {
        self.observation.observation_dimension()
    }

    pub fn state_dimension(&self) -> usize {
        self.process.state_dimension()
    }

    pub fn strategy(&self) -> &ObservationStrategy {
        &self.observation
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}
