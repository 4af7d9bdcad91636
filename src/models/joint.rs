use nalgebra::DVectorView;

use super::{ObservationModel, SensorModel};
use crate::error::{FilterError, Result};
use crate::types::linalg::Vector;

/// K local sensor models observing one shared state.
///
/// Local models are independent and side-effect free, so any sensor can be
/// evaluated by index without selecting it first. The joint observation is
/// the concatenation of the local observations in index order.
///
/// All sensors share one noise point set during fusion, so every local model
/// must declare the same noise dimension. Differences in noise magnitude
/// belong inside each model's `observe`.
pub struct JointObservationModel {
    state_dimension: usize,
    sensors: Vec<SensorModel>,
    offsets: Vec<usize>,
    observation_dimension: usize,
}

impl JointObservationModel {
    pub fn new(state_dimension: usize, sensors: Vec<SensorModel>) -> Result<Self> {
        let mut joint = Self {
            state_dimension,
            sensors: Vec::with_capacity(sensors.len()),
            offsets: Vec::with_capacity(sensors.len()),
            observation_dimension: 0,
        };
        for sensor in sensors {
            joint.push(sensor)?;
        }
        Ok(joint)
    }

    pub fn push(&mut self, sensor: SensorModel) -> Result<()> {
        let index = self.sensors.len();
        if sensor.state_dimension() != self.state_dimension {
            return Err(FilterError::InvalidModelShape(format!(
                "sensor {index} observes a {}-dimensional state, joint model has {}",
                sensor.state_dimension(),
                self.state_dimension
            )));
        }
        if let Some(first) = self.sensors.first() {
            if sensor.noise_dimension() != first.noise_dimension() {
                return Err(FilterError::InvalidModelShape(format!(
                    "sensor {index} has noise dimension {}, sensors share one noise prior of dimension {}",
                    sensor.noise_dimension(),
                    first.noise_dimension()
                )));
            }
        }

        self.offsets.push(self.observation_dimension);
        self.observation_dimension += sensor.observation_dimension();
        self.sensors.push(sensor);
        Ok(())
    }

    pub fn count_local_models(&self) -> usize {
        self.sensors.len()
    }

    pub fn local_model(&self, index: usize) -> Option<&(dyn ObservationModel + Send + Sync)> {
        self.sensors.get(index).map(|s| s.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn ObservationModel + Send + Sync)> {
        self.sensors.iter().map(|s| s.as_ref())
    }

    pub fn state_dimension(&self) -> usize {
        self.state_dimension
    }

    /// Shared local noise dimension (0 without sensors)
    pub fn noise_dimension(&self) -> usize {
        self.sensors.first().map_or(0, |s| s.noise_dimension())
    }

    /// Length of the stacked observation, Σ local observation dimensions
    pub fn observation_dimension(&self) -> usize {
        self.observation_dimension
    }

    /// Row where sensor `index` starts in the stacked observation
    pub fn observation_offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Sub-block of a stacked observation belonging to sensor `index`
    pub fn local_observation<'a>(&self, y: &'a Vector, index: usize) -> Result<DVectorView<'a, f64>> {
        if y.len() != self.observation_dimension {
            return Err(FilterError::mismatch(
                "stacked observation",
                self.observation_dimension,
                y.len(),
            ));
        }
        let start = *self.offsets.get(index).ok_or_else(|| {
            FilterError::InvalidModelShape(format!(
                "sensor index {index} out of range for {} sensors",
                self.sensors.len()
            ))
        })?;
        let end = self
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.observation_dimension);
        Ok(y.rows(start, end - start))
    }
}

impl std::fmt::Debug for JointObservationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JointObservationModel")
            .field("state_dimension", &self.state_dimension)
            .field("sensors", &self.sensors.len())
            .field("observation_dimension", &self.observation_dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinearObservationModel, RangeObservationModel};
    use crate::types::linalg::Matrix;

    fn position_sensor(noise: f64) -> SensorModel {
        Box::new(
            LinearObservationModel::new(Matrix::identity(2, 2), Matrix::identity(2, 2) * noise)
                .unwrap(),
        )
    }

    #[test]
    fn test_stacked_dimensions_and_offsets() {
        let joint = JointObservationModel::new(
            2,
            vec![position_sensor(0.1), position_sensor(0.5), position_sensor(1.0)],
        )
        .unwrap();
        assert_eq!(joint.count_local_models(), 3);
        assert_eq!(joint.observation_dimension(), 6);
        assert_eq!(joint.noise_dimension(), 2);
        assert_eq!(joint.observation_offset(2), Some(4));
        assert_eq!(joint.observation_offset(3), None);

        let y = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let block = joint.local_observation(&y, 1).unwrap();
        assert_eq!(block.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_local_observation_checks_length() {
        let joint = JointObservationModel::new(2, vec![position_sensor(0.1)]).unwrap();
        let y = Vector::zeros(3);
        assert_eq!(
            joint.local_observation(&y, 0).unwrap_err(),
            FilterError::mismatch("stacked observation", 2, 3)
        );
    }

    #[test]
    fn test_rejects_state_dimension_mismatch() {
        let err = JointObservationModel::new(3, vec![position_sensor(0.1)]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidModelShape(_)));
    }

    #[test]
    fn test_rejects_heterogeneous_noise_dimension() {
        let range = RangeObservationModel::new(Vector::zeros(2), 2, 0.1).unwrap();
        let err = JointObservationModel::new(2, vec![position_sensor(0.1), Box::new(range)])
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidModelShape(_)));
    }

    #[test]
    fn test_local_observation_out_of_range() {
        let joint = JointObservationModel::new(2, vec![position_sensor(0.1)]).unwrap();
        let err = joint.local_observation(&Vector::zeros(2), 1).unwrap_err();
        assert!(matches!(err, FilterError::InvalidModelShape(_)));
    }

    #[test]
    fn test_push_extends_stacked_observation() {
        let mut joint = JointObservationModel::new(2, vec![position_sensor(0.1)]).unwrap();
        joint.push(position_sensor(0.2)).unwrap();
        assert_eq!(joint.observation_dimension(), 4);
        assert_eq!(joint.observation_offset(1), Some(2));

        // A rejected sensor leaves the stacked layout untouched
        let range = RangeObservationModel::new(Vector::zeros(2), 2, 0.1).unwrap();
        assert!(joint.push(Box::new(range)).is_err());
        assert_eq!(joint.count_local_models(), 2);
        assert_eq!(joint.observation_dimension(), 4);

        let y = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let last = joint.local_observation(&y, 1).unwrap();
        assert_eq!(last.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_empty_joint_model() {
        let joint = JointObservationModel::new(4, Vec::new()).unwrap();
        assert_eq!(joint.count_local_models(), 0);
        assert_eq!(joint.observation_dimension(), 0);
        assert_eq!(joint.noise_dimension(), 0);
    }
}
