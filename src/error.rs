use std::fmt;

use thiserror::Error;

/// Which covariance failed to invert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceKind {
    /// Prior state covariance (Cxx)
    State,
    /// Innovation covariance of a single-sensor update (Cyy)
    Innovation,
    /// Innovation covariance of one sensor conditioned on the state
    ConditionalInnovation,
    /// Accumulated information matrix of a multi-sensor update
    Information,
}

impl fmt::Display for CovarianceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CovarianceKind::State => "state",
            CovarianceKind::Innovation => "innovation",
            CovarianceKind::ConditionalInnovation => "conditional innovation",
            CovarianceKind::Information => "information",
        };
        f.write_str(name)
    }
}

/// Filter error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Singular {kind} covariance{}",
        .sensor.map(|i| format!(" (sensor {i})")).unwrap_or_default()
    )]
    SingularCovariance {
        kind: CovarianceKind,
        sensor: Option<usize>,
    },

    #[error("Invalid model shape: {0}")]
    InvalidModelShape(String),

    #[error("Covariance is not positive semidefinite (eigenvalue {0:e})")]
    NotPositiveSemidefinite(f64),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl FilterError {
    pub(crate) fn mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        FilterError::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }

    pub(crate) fn singular(kind: CovarianceKind, sensor: Option<usize>) -> Self {
        FilterError::SingularCovariance { kind, sensor }
    }

    /// Numerical failures may succeed after the caller regularizes the belief
    /// and resubmits. Shape and dimension errors never will.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            FilterError::SingularCovariance { .. } | FilterError::NotPositiveSemidefinite(_)
        )
    }
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_message_names_sensor() {
        let err = FilterError::singular(CovarianceKind::ConditionalInnovation, Some(3));
        assert_eq!(
            err.to_string(),
            "Singular conditional innovation covariance (sensor 3)"
        );
        assert!(err.is_numerical());
    }

    #[test]
    fn test_singular_message_without_sensor() {
        let err = FilterError::singular(CovarianceKind::State, None);
        assert_eq!(err.to_string(), "Singular state covariance");
    }

    #[test]
    fn test_shape_errors_are_not_numerical() {
        assert!(!FilterError::mismatch("observation", 4, 3).is_numerical());
        assert!(!FilterError::InvalidModelShape("x".into()).is_numerical());
    }
}
