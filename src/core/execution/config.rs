//! Configuration for cell simulation runs
//!
//! Holds the knobs that the scenario document does not carry: randomness,
//! how holds are timed, and the fixed recovery constants used by the
//! disruption narratives.

use crate::core::error::{CellError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How cell time is spent during holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockMode {
    /// Holds complete instantly; time is only accounted
    Simulated,
    /// Holds sleep for `duration × time_scale` real seconds
    WallClock { time_scale: f64 },
}

impl Default for ClockMode {
    fn default() -> Self {
        ClockMode::Simulated
    }
}

/// How the inspection deviation is sampled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum QualityPolicy {
    /// Deviation drawn from [0, 0.8 × tolerance): every inspection passes
    Reference,
    /// Deviation drawn from [0, factor × tolerance); factors above 1.0 allow failures
    Widened { factor: f64 },
}

impl QualityPolicy {
    /// Upper bound of the sampled deviation as a multiple of the tolerance
    pub fn deviation_factor(&self) -> f64 {
        match self {
            QualityPolicy::Reference => 0.8,
            QualityPolicy::Widened { factor } => *factor,
        }
    }
}

impl Default for QualityPolicy {
    fn default() -> Self {
        QualityPolicy::Reference
    }
}

/// Configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for sensor, jitter, and inspection sampling. `None` seeds from entropy.
    pub random_seed: Option<u64>,
    pub clock_mode: ClockMode,
    pub quality_policy: QualityPolicy,
    /// How many leading steps of a product are executed per unit
    pub executed_steps_per_unit: usize,
    /// Extra seconds per unit after switching to an alternate robot
    pub equipment_failure_delay_seconds: f64,
    /// Extra seconds to retrieve material from the fallback source
    pub material_shortage_delay_seconds: f64,
    /// Source reported as depleted in material shortage narration
    pub depleted_material_source: String,
    /// Source used for every material shortage
    pub fallback_material_source: String,
    /// Tool reconfiguration time between products
    pub changeover_seconds: f64,
    /// Cycle count at which a robot is due for maintenance
    pub maintenance_threshold_cycles: u64,
}

impl SimulationConfig {
    /// Create a new configuration with reference values
    pub fn new() -> Self {
        Self {
            random_seed: None,
            clock_mode: ClockMode::default(),
            quality_policy: QualityPolicy::default(),
            executed_steps_per_unit: 2,
            equipment_failure_delay_seconds: 5.0,
            material_shortage_delay_seconds: 15.0,
            depleted_material_source: "bin_2".to_string(),
            fallback_material_source: "bin_3".to_string(),
            changeover_seconds: 10.0,
            maintenance_threshold_cycles: 500,
        }
    }

    /// Load overrides from a JSON file; missing keys keep their defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CellError::Configuration(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| CellError::Configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the seed for sensor, jitter and inspection sampling
    ///
    /// # Arguments
    /// * `seed` - Fixed seed, or `None` to seed from entropy
    ///
    /// # Returns
    /// A new configuration with the specified seed
    pub fn with_random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set how safety holds spend time
    ///
    /// # Arguments
    /// * `mode` - `Simulated` for instant holds, `WallClock` to sleep scaled by `time_scale`
    ///
    /// # Returns
    /// A new configuration with the specified clock mode
    pub fn with_clock_mode(mut self, mode: ClockMode) -> Self {
        self.clock_mode = mode;
        self
    }

    /// Set how inspection deviations are sampled
    ///
    /// # Arguments
    /// * `policy` - The deviation sampling policy
    ///
    /// # Returns
    /// A new configuration with the specified quality policy
    ///
    /// # Note
    /// `Widened` factors must be finite and positive; `validate` rejects anything else
    pub fn with_quality_policy(mut self, policy: QualityPolicy) -> Self {
        self.quality_policy = policy;
        self
    }

    /// Set the tool reconfiguration time between products
    ///
    /// # Arguments
    /// * `seconds` - Cell time added for each changeover
    ///
    /// # Returns
    /// A new configuration with the specified changeover time
    pub fn with_changeover_seconds(mut self, seconds: f64) -> Self {
        self.changeover_seconds = seconds;
        self
    }

    /// Set the cycle count at which a robot is due for maintenance
    ///
    /// # Arguments
    /// * `cycles` - Maintenance threshold in completed cycles
    ///
    /// # Returns
    /// A new configuration with the specified threshold
    pub fn with_maintenance_threshold(mut self, cycles: u64) -> Self {
        self.maintenance_threshold_cycles = cycles;
        self
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// `Ok(())` if valid, `CellError::Configuration` naming the first bad setting otherwise
    pub fn validate(&self) -> Result<()> {
        if self.executed_steps_per_unit == 0 {
            return Err(CellError::Configuration(
                "executed_steps_per_unit must be at least 1".to_string(),
            ));
        }

        if self.equipment_failure_delay_seconds < 0.0
            || self.material_shortage_delay_seconds < 0.0
            || self.changeover_seconds < 0.0
        {
            return Err(CellError::Configuration(
                "delays must not be negative".to_string(),
            ));
        }

        if let QualityPolicy::Widened { factor } = self.quality_policy {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(CellError::Configuration(
                    "quality deviation factor must be positive and finite".to_string(),
                ));
            }
        }

        if let ClockMode::WallClock { time_scale } = self.clock_mode {
            if !(time_scale.is_finite() && time_scale >= 0.0) {
                return Err(CellError::Configuration(
                    "time_scale must be finite and not negative".to_string(),
                ));
            }
        }

        if self.fallback_material_source.is_empty() {
            return Err(CellError::Configuration(
                "fallback_material_source must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.clock_mode, ClockMode::Simulated);
        assert_eq!(config.quality_policy, QualityPolicy::Reference);
        assert_eq!(config.executed_steps_per_unit, 2);
        assert_eq!(config.equipment_failure_delay_seconds, 5.0);
        assert_eq!(config.material_shortage_delay_seconds, 15.0);
        assert_eq!(config.fallback_material_source, "bin_3");
        assert_eq!(config.maintenance_threshold_cycles, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SimulationConfig::new()
            .with_random_seed(Some(7))
            .with_clock_mode(ClockMode::WallClock { time_scale: 0.05 })
            .with_quality_policy(QualityPolicy::Widened { factor: 1.5 })
            .with_changeover_seconds(12.0)
            .with_maintenance_threshold(800);

        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.clock_mode, ClockMode::WallClock { time_scale: 0.05 });
        assert_eq!(config.quality_policy.deviation_factor(), 1.5);
        assert_eq!(config.changeover_seconds, 12.0);
        assert_eq!(config.maintenance_threshold_cycles, 800);
    }

    #[test]
    fn test_validation() {
        let mut config = SimulationConfig::default();
        config.executed_steps_per_unit = 0;
        assert!(config.validate().is_err());

        config = SimulationConfig::default().with_quality_policy(QualityPolicy::Widened { factor: 0.0 });
        assert!(config.validate().is_err());

        config = SimulationConfig::default()
            .with_quality_policy(QualityPolicy::Widened { factor: f64::INFINITY });
        assert!(config.validate().is_err());

        config = SimulationConfig::default()
            .with_quality_policy(QualityPolicy::Widened { factor: f64::NAN });
        assert!(config.validate().is_err());

        config = SimulationConfig::default()
            .with_clock_mode(ClockMode::WallClock { time_scale: f64::INFINITY });
        assert!(config.validate().is_err());

        config = SimulationConfig::default();
        config.material_shortage_delay_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"random_seed": 42, "quality_policy": {"policy": "widened", "factor": 1.2}}"#)
                .unwrap();
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.quality_policy, QualityPolicy::Widened { factor: 1.2 });
        assert_eq!(config.changeover_seconds, 10.0);
    }

    #[test]
    fn test_from_path() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"changeover_seconds": 20}}"#).unwrap();
        let config = SimulationConfig::from_path(file.path()).unwrap();
        assert_eq!(config.changeover_seconds, 20.0);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"executed_steps_per_unit": 0}}"#).unwrap();
        assert!(SimulationConfig::from_path(bad.path()).is_err());
    }
}
