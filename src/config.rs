use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::quadrature::UnscentedQuadrature;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    // ── Unscented transform ──
    pub alpha: f64,
    pub beta: f64,
    pub kappa: f64,

    // ── Numerics ──
    /// Smallest accepted squared Cholesky pivot, relative to the scale of the
    /// covariance being inverted
    pub singularity_tolerance: f64,

    // ── Multi-sensor fusion ──
    pub parallel_fusion: bool,
    pub parallel_min_sensors: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 2.0,
            kappa: 0.0,
            singularity_tolerance: 1e-12,
            parallel_fusion: false,
            parallel_min_sensors: 8,
        }
    }
}

impl FilterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FilterConfig = serde_json::from_str(json)
            .map_err(|e| FilterError::InvalidParameters(format!("filter config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        UnscentedQuadrature::new(self.alpha, self.beta, self.kappa)?;
        if !(self.singularity_tolerance >= 0.0) {
            return Err(FilterError::InvalidParameters(format!(
                "singularity_tolerance must be non-negative, got {}",
                self.singularity_tolerance
            )));
        }
        if self.parallel_min_sensors == 0 {
            return Err(FilterError::InvalidParameters(
                "parallel_min_sensors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn quadrature(&self) -> Result<UnscentedQuadrature> {
        UnscentedQuadrature::new(self.alpha, self.beta, self.kappa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FilterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quadrature().unwrap(), UnscentedQuadrature::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FilterConfig::from_json_str(r#"{ "alpha": 0.5, "parallel_fusion": true }"#)
            .unwrap();
        assert_eq!(config.alpha, 0.5);
        assert!(config.parallel_fusion);
        assert_eq!(config.beta, 2.0);
        assert_eq!(config.parallel_min_sensors, 8);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(FilterConfig::from_json_str(r#"{ "alpha": 0.0 }"#).is_err());
        assert!(FilterConfig::from_json_str(r#"{ "singularity_tolerance": -1.0 }"#).is_err());
        assert!(FilterConfig::from_json_str(r#"{ "parallel_min_sensors": 0 }"#).is_err());
        assert!(FilterConfig::from_json_str("not json").is_err());
    }
}
