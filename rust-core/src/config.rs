//! Analysis defaults loadable from JSON
//!
//! Lets a front end ship sensitivity, Welch and unit presets without
//! recompiling. Every field is optional in the file; missing ones take the
//! documented defaults (sensitivity 10, fs 25 kHz, nperseg 256, Hann, density,
//! linear).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibration::CalibrationParameters;
use crate::error::AnalysisError;
use crate::spectrum::{PowerUnit, WelchParameters};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] AnalysisError),
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub calibration: CalibrationParameters,
    pub welch: WelchParameters,
    pub unit: PowerUnit,
}

impl AnalysisConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = ?path.as_ref(), "loaded analysis configuration");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.calibration.validate()?;
        self.welch.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{Detrend, Scaling, WindowType};

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.calibration.sensitivity, 10.0);
        assert_eq!(config.welch.sample_rate, 25_000.0);
        assert_eq!(config.welch.nperseg, 256);
        assert_eq!(config.welch.noverlap, None);
        assert_eq!(config.welch.window, WindowType::Hann);
        assert_eq!(config.welch.detrend, Detrend::Constant);
        assert_eq!(config.welch.scaling, Scaling::Density);
        assert_eq!(config.unit, PowerUnit::Linear);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "calibration": { "sensitivity": 24000.0 },
            "welch": { "sample_rate": 100.0, "nperseg": 1024, "window": "blackman" },
            "unit": "db_re_sensitivity"
        }"#;
        let config = AnalysisConfig::from_json_str(json).unwrap();
        assert_eq!(config.calibration.sensitivity, 24_000.0);
        assert_eq!(config.welch.nperseg, 1024);
        assert_eq!(config.welch.window, WindowType::Blackman);
        assert_eq!(config.welch.nfft, None);
        assert_eq!(config.unit, PowerUnit::DecibelRelativeToSensitivity);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig::default();
        let json = config.to_json_pretty().unwrap();
        let parsed = AnalysisConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let json = r#"{ "calibration": { "sensitivity": 0.0 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(json),
            Err(ConfigError::Invalid(AnalysisError::InvalidCalibration(_)))
        ));

        let json = r#"{ "welch": { "nperseg": 128, "noverlap": 128 } }"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(json),
            Err(ConfigError::Invalid(AnalysisError::InvalidParameter(_)))
        ));

        assert!(matches!(
            AnalysisConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AnalysisConfig::load_from_file("/nonexistent/analysis.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
