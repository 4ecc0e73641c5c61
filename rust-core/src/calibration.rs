//! Sensor calibration
//!
//! Converts raw sensor readings (volts) into physical units (g) by dividing by
//! the sensor sensitivity. A global sensitivity applies to every channel unless
//! a per-channel override is set.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Sensitivity used when none is configured, in sensor units per g
pub const DEFAULT_SENSITIVITY: f64 = 10.0;

/// Sensitivity settings for a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParameters {
    /// Sensor units per physical unit, applied to all channels
    pub sensitivity: f64,

    /// Per-channel sensitivity, keyed by zero-based channel index
    pub channel_overrides: BTreeMap<usize, f64>,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            channel_overrides: BTreeMap::new(),
        }
    }
}

impl CalibrationParameters {
    pub fn new(sensitivity: f64) -> Result<Self> {
        check_sensitivity(sensitivity)?;
        Ok(Self {
            sensitivity,
            channel_overrides: BTreeMap::new(),
        })
    }

    /// Set the sensitivity of a single channel
    pub fn with_override(mut self, channel: usize, sensitivity: f64) -> Result<Self> {
        check_sensitivity(sensitivity)?;
        self.channel_overrides.insert(channel, sensitivity);
        Ok(self)
    }

    /// Check the global sensitivity and every override
    pub fn validate(&self) -> Result<()> {
        check_sensitivity(self.sensitivity)?;
        for &s in self.channel_overrides.values() {
            check_sensitivity(s)?;
        }
        Ok(())
    }

    /// Effective sensitivity for a channel
    pub fn sensitivity_for(&self, channel: usize) -> Result<f64> {
        let s = self
            .channel_overrides
            .get(&channel)
            .copied()
            .unwrap_or(self.sensitivity);
        check_sensitivity(s)?;
        Ok(s)
    }
}

fn check_sensitivity(sensitivity: f64) -> Result<()> {
    if !sensitivity.is_finite() || sensitivity <= 0.0 {
        return Err(AnalysisError::InvalidCalibration(sensitivity));
    }
    Ok(())
}

/// Divide raw samples by the sensitivity
///
/// # Arguments
/// * `raw` - Raw samples in sensor units
/// * `sensitivity` - Sensor units per physical unit (finite, > 0)
///
/// # Returns
/// New array of calibrated samples; the input is not modified
pub fn calibrate(raw: ArrayView1<'_, f64>, sensitivity: f64) -> Result<Array1<f64>> {
    check_sensitivity(sensitivity)?;
    Ok(raw.mapv(|r| r / sensitivity))
}
