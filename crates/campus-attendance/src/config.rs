//! Attendance policy configuration.
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration.
//!
//! ```toml
//! minimum_percentage = 65.0
//! lates_per_half_day = 3
//! grace_lates = 0
//! max_late_minutes = 60
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use campus_contracts::{
    error::{CampusError, CampusResult},
    late_pass::Percentage,
};

use crate::late_pass::DeductionPolicy;

fn default_minimum_percentage() -> f64 {
    65.0
}

fn default_lates_per_half_day() -> u32 {
    3
}

fn default_max_late_minutes() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceConfig {
    /// Students strictly below this percentage are flagged.
    #[serde(default = "default_minimum_percentage")]
    pub minimum_percentage: f64,

    /// Lates that add up to one half-day leave deduction.
    #[serde(default = "default_lates_per_half_day")]
    pub lates_per_half_day: u32,

    /// Lates per month that cost nothing.
    #[serde(default)]
    pub grace_lates: u32,

    /// Upper bound accepted for `late_minutes` on a single mark.
    #[serde(default = "default_max_late_minutes")]
    pub max_late_minutes: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            minimum_percentage: default_minimum_percentage(),
            lates_per_half_day: default_lates_per_half_day(),
            grace_lates: 0,
            max_late_minutes: default_max_late_minutes(),
        }
    }
}

impl AttendanceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> CampusResult<Self> {
        let config: AttendanceConfig = toml::from_str(s).map_err(|e| CampusError::ConfigError {
            reason: format!("failed to parse attendance config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CampusResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CampusError::ConfigError {
            reason: format!("failed to read attendance config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> CampusResult<()> {
        if !self.minimum_percentage.is_finite()
            || !(0.0..=100.0).contains(&self.minimum_percentage)
        {
            return Err(CampusError::ConfigError {
                reason: format!(
                    "minimum_percentage must be within 0..=100, got {}",
                    self.minimum_percentage
                ),
            });
        }
        let tenths = self.minimum_percentage * 10.0;
        if (tenths - tenths.round()).abs() > 1e-6 {
            return Err(CampusError::ConfigError {
                reason: format!(
                    "minimum_percentage allows one decimal place, got {}",
                    self.minimum_percentage
                ),
            });
        }
        if self.lates_per_half_day == 0 {
            return Err(CampusError::ConfigError {
                reason: "lates_per_half_day must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The threshold in tenths. `validate` guarantees this is exact.
    pub fn threshold(&self) -> Percentage {
        Percentage::from_tenths((self.minimum_percentage * 10.0).round() as u32)
    }

    pub fn deduction_policy(&self) -> CampusResult<DeductionPolicy> {
        DeductionPolicy::new(self.lates_per_half_day, self.grace_lates)
    }
}
