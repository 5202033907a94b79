//! Run configuration, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::NEUTRON_LIFETIME;
use crate::error::ConfigError;
use crate::field::GravField;

/// Parameters of a propagation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Label used in logs and summaries
    pub run_name: String,
    /// Total simulated time per particle (s)
    pub run_time: f64,
    /// Upper bound on a single navigation step (s)
    pub max_step_time: f64,
    pub gravity_on: bool,
    pub wall_losses_on: bool,
    pub decay_on: bool,
    /// Mean neutron lifetime (s)
    pub lifetime: f64,
    /// Master seed for the batch
    pub seed: u64,
    pub n_particles: usize,
    /// Propagate the batch on the rayon thread pool
    pub parallel: bool,
    /// Spacing of recorded track points (s); 0 records every step
    pub track_interval: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_name: "ucn".to_string(),
            run_time: 10.0,
            max_step_time: 1.0,
            gravity_on: true,
            wall_losses_on: true,
            decay_on: true,
            lifetime: NEUTRON_LIFETIME,
            seed: 42,
            n_particles: 100,
            parallel: false,
            track_interval: 0.0,
        }
    }
}

impl RunConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("run_time", self.run_time),
            ("max_step_time", self.max_step_time),
            ("lifetime", self.lifetime),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(self.track_interval.is_finite() && self.track_interval >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "track_interval must be non-negative, got {}",
                self.track_interval
            )));
        }
        Ok(())
    }

    /// Gravity as configured
    pub fn field(&self) -> GravField {
        if self.gravity_on {
            GravField::earth()
        } else {
            GravField::off()
        }
    }
}
