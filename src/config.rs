//! # Configuration Management
//!
//! This module handles loading and parsing planner settings from the batch-config.toml file.
//! Every threshold the planner compares against lives here rather than in the algorithm,
//! so the ceiling, density bands and month-wide fallback range can follow the export API
//! without a rebuild.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Default config file name, resolved relative to the working directory
pub const CONFIG_FILE: &str = "batch-config.toml";

/// Day format used for the fallback range
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read or written
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid TOML for [`PlannerConfig`]
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered back to TOML
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values parsed but are inconsistent with each other
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Planner settings loaded from batch-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum expected event count in a single request
    pub ceiling: u64,
    /// Averages strictly inside this band ship every day alone
    pub medium_band: DensityBand,
    /// Averages in `(low, high]` are folded into month-wide requests
    pub low_band: DensityBand,
    /// Day range used for folded low-density requests
    pub fallback_range: DayRange,
    /// Emit the last folded group even if it never overflowed the ceiling
    pub flush_trailing: bool,
    /// Let residual halving try a one-day window instead of stopping at it
    pub single_day_windows: bool,
}

/// Average-per-day band; which ends are inclusive depends on the tier using it
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DensityBand {
    pub low: f64,
    pub high: f64,
}

impl DensityBand {
    /// `low < value < high`
    pub fn contains_exclusive(&self, value: f64) -> bool {
        self.low < value && value < self.high
    }

    /// `low < value <= high`
    pub fn contains_upper_inclusive(&self, value: f64) -> bool {
        self.low < value && value <= self.high
    }
}

/// Inclusive day range written as `%Y-%m-%d` strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DayRange {
    pub from: String,
    pub to: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            ceiling: 100_000,
            medium_band: DensityBand {
                low: 40_000.0,
                high: 60_000.0,
            },
            low_band: DensityBand {
                low: 0.0,
                high: 1_000.0,
            },
            fallback_range: DayRange {
                from: "2024-08-01".to_string(),
                to: "2024-08-31".to_string(),
            },
            flush_trailing: false,
            single_day_windows: false,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from batch-config.toml in the working directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    ///
    /// A missing file falls back to the defaults; a file that exists but does not parse
    /// or validate is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: PlannerConfig = toml::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), ceiling = config.ceiling, "loaded planner config");
        Ok(config)
    }

    /// Save current configuration as pretty TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check that thresholds are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ceiling == 0 {
            return Err(ConfigError::Invalid("ceiling must be positive".into()));
        }
        for (name, band) in [("medium_band", &self.medium_band), ("low_band", &self.low_band)] {
            if !(band.low < band.high) {
                return Err(ConfigError::Invalid(format!(
                    "{name}: low ({}) must be below high ({})",
                    band.low, band.high
                )));
            }
        }

        // An average may fall in at most one band.
        let low = self.medium_band.low.max(self.low_band.low);
        let high = self.medium_band.high.min(self.low_band.high);
        if low < high {
            return Err(ConfigError::Invalid(format!(
                "medium_band ({}, {}) overlaps low_band ({}, {}]",
                self.medium_band.low, self.medium_band.high, self.low_band.low, self.low_band.high
            )));
        }

        let from = parse_day("fallback_range.from", &self.fallback_range.from)?;
        let to = parse_day("fallback_range.to", &self.fallback_range.to)?;
        if from > to {
            return Err(ConfigError::Invalid(format!(
                "fallback_range: {} is after {}",
                self.fallback_range.from, self.fallback_range.to
            )));
        }
        Ok(())
    }
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .map_err(|e| ConfigError::Invalid(format!("{field}: '{value}' is not a {DAY_FORMAT} date ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.ceiling, 100_000);
        assert_eq!(config.medium_band.low, 40_000.0);
        assert_eq!(config.low_band.high, 1_000.0);
        assert_eq!(config.fallback_range.from, "2024-08-01");
        assert_eq!(config.fallback_range.to, "2024-08-31");
        assert!(!config.flush_trailing);
        assert!(!config.single_day_windows);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = PlannerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PlannerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = PlannerConfig::load_from_path("/nonexistent/path").unwrap();
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "ceiling = 50000\nflush_trailing = true\n").unwrap();

        let config = PlannerConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.ceiling, 50_000);
        assert!(config.flush_trailing);
        assert_eq!(config.medium_band, PlannerConfig::default().medium_band);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "ceiling = \"lots\"\n").unwrap();

        let err = PlannerConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = PlannerConfig::default();
        config.fallback_range = DayRange {
            from: "2024-09-01".into(),
            to: "2024-09-30".into(),
        };
        config.save(file.path()).unwrap();

        let loaded = PlannerConfig::load_from_path(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PlannerConfig::default();
        config.ceiling = 0;
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.medium_band = DensityBand {
            low: 60_000.0,
            high: 40_000.0,
        };
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.fallback_range.to = "31/08/2024".into();
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.fallback_range = DayRange {
            from: "2024-08-31".into(),
            to: "2024-08-01".into(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_bands() {
        let mut config = PlannerConfig::default();
        config.low_band = DensityBand {
            low: 0.0,
            high: 50_000.0,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overlaps"), "unexpected error: {err}");

        // Touching bands share no value: the medium band excludes its lower edge.
        let mut config = PlannerConfig::default();
        config.low_band = DensityBand {
            low: 0.0,
            high: 40_000.0,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_band_edges() {
        let config = PlannerConfig::default();
        assert!(!config.medium_band.contains_exclusive(40_000.0));
        assert!(config.medium_band.contains_exclusive(40_000.5));
        assert!(!config.medium_band.contains_exclusive(60_000.0));

        assert!(!config.low_band.contains_upper_inclusive(0.0));
        assert!(config.low_band.contains_upper_inclusive(1_000.0));
        assert!(!config.low_band.contains_upper_inclusive(1_000.1));
    }
}
