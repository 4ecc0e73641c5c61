//! Spectrum results and unit conversion

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::welch::{Scaling, WelchEstimate, WelchParameters};
use crate::data::range::{FrequencyRange, TimeRange};
use crate::error::{AnalysisError, Result};

/// Floor applied before taking logarithms
pub const DB_FLOOR: f64 = f64::MIN_POSITIVE;

/// Units of the reported power values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerUnit {
    /// Power as estimated
    #[default]
    #[serde(rename = "linear")]
    Linear,

    /// 10·log10(power)
    #[serde(rename = "db")]
    Decibel,

    /// 10·log10(power / sensitivity²), with `power` estimated from raw
    /// (uncalibrated) samples
    #[serde(rename = "db_re_sensitivity")]
    DecibelRelativeToSensitivity,
}

impl PowerUnit {
    pub fn name(&self) -> &'static str {
        match self {
            PowerUnit::Linear => "linear",
            PowerUnit::Decibel => "db",
            PowerUnit::DecibelRelativeToSensitivity => "db_re_sensitivity",
        }
    }
}

impl fmt::Display for PowerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PowerUnit {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(PowerUnit::Linear),
            "db" | "decibel" => Ok(PowerUnit::Decibel),
            "db_re_sensitivity" | "db-re-sensitivity" | "db_rel" => {
                Ok(PowerUnit::DecibelRelativeToSensitivity)
            }
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown power unit '{}'",
                other
            ))),
        }
    }
}

/// Convert linear power values to the requested unit
///
/// `sensitivity` is only used for [`PowerUnit::DecibelRelativeToSensitivity`]
/// and must then be finite and positive.
pub fn convert_power(power: &[f64], unit: PowerUnit, sensitivity: f64) -> Result<Vec<f64>> {
    match unit {
        PowerUnit::Linear => Ok(power.to_vec()),
        PowerUnit::Decibel => Ok(power.iter().map(|&p| 10.0 * p.max(DB_FLOOR).log10()).collect()),
        PowerUnit::DecibelRelativeToSensitivity => {
            if !sensitivity.is_finite() || sensitivity <= 0.0 {
                return Err(AnalysisError::InvalidCalibration(sensitivity));
            }
            let reference = sensitivity * sensitivity;
            Ok(power
                .iter()
                .map(|&p| 10.0 * (p.max(DB_FLOOR) / reference).log10())
                .collect())
        }
    }
}

/// Frequency/power pairs for one channel, tagged with how they were produced
///
/// Value object: holds no reference to the table or session it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumResult {
    /// Zero-based channel index, when produced from a table
    pub channel: Option<usize>,

    /// Channel label, when produced from a table
    pub channel_name: Option<String>,

    /// Bin frequencies in Hz, ascending
    pub frequencies: Vec<f64>,

    /// Power per bin in `unit`
    pub values: Vec<f64>,

    pub unit: PowerUnit,

    /// Sensitivity the channel was calibrated with
    pub sensitivity: f64,

    /// Resolved Welch parameters
    pub welch: WelchParameters,

    /// Time span the estimate was restricted to
    pub time_range: Option<TimeRange>,

    /// Number of averaged segments
    pub segments: usize,
}

impl SpectrumResult {
    pub fn from_estimate(estimate: WelchEstimate, unit: PowerUnit, sensitivity: f64) -> Result<Self> {
        let values = convert_power(&estimate.power, unit, sensitivity)?;
        Ok(Self {
            channel: None,
            channel_name: None,
            frequencies: estimate.frequencies,
            values,
            unit,
            sensitivity,
            welch: estimate.params,
            time_range: None,
            segments: estimate.segments,
        })
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency resolution in Hz
    pub fn bin_width(&self) -> f64 {
        self.welch.bin_width()
    }

    /// Bin with the largest value, as (frequency, value)
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| !v.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(&f, &v)| (f, v))
    }

    /// Bins whose frequency lies inside the band
    pub fn select_frequency(&self, band: &FrequencyRange) -> SpectrumResult {
        let (frequencies, values): (Vec<f64>, Vec<f64>) = self
            .frequencies
            .iter()
            .zip(self.values.iter())
            .filter(|(&f, _)| band.contains(f))
            .map(|(&f, &v)| (f, v))
            .unzip();

        SpectrumResult {
            frequencies,
            values,
            ..self.clone()
        }
    }

    /// RMS level over a band: sqrt(Σ PSD · Δf)
    ///
    /// Only defined for linear density results; for acceleration in g this is
    /// the Grms of the band.
    pub fn band_rms(&self, band: &FrequencyRange) -> Result<f64> {
        if self.unit != PowerUnit::Linear || self.welch.scaling != Scaling::Density {
            return Err(AnalysisError::InvalidParameter(
                "band RMS requires a linear power spectral density".into(),
            ));
        }
        let sum: f64 = self
            .frequencies
            .iter()
            .zip(self.values.iter())
            .filter(|(&f, _)| band.contains(f))
            .map(|(_, &v)| v)
            .sum();
        Ok((sum * self.bin_width()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate() -> WelchEstimate {
        let params = WelchParameters::new(8.0, 8).resolve(8).unwrap();
        WelchEstimate {
            frequencies: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            power: vec![0.0, 0.5, 2.0, 0.5, 0.25],
            params,
            segments: 1,
        }
    }

    #[test]
    fn test_decibel_conversion() {
        let db = convert_power(&[1.0, 10.0, 100.0, 0.0], PowerUnit::Decibel, 1.0).unwrap();
        assert!((db[0]).abs() < 1e-12);
        assert!((db[1] - 10.0).abs() < 1e-12);
        assert!((db[2] - 20.0).abs() < 1e-12);
        assert!(db[3].is_finite());
    }

    #[test]
    fn test_relative_decibel_conversion() {
        let db = convert_power(&[100.0], PowerUnit::DecibelRelativeToSensitivity, 10.0).unwrap();
        assert!(db[0].abs() < 1e-12);
        assert!(matches!(
            convert_power(&[1.0], PowerUnit::DecibelRelativeToSensitivity, 0.0),
            Err(AnalysisError::InvalidCalibration(_))
        ));
    }

    #[test]
    fn test_peak_and_band() {
        let result = SpectrumResult::from_estimate(estimate(), PowerUnit::Linear, 1.0).unwrap();
        assert_eq!(result.peak(), Some((2.0, 2.0)));
        assert_eq!(result.bin_width(), 1.0);

        let band = FrequencyRange::new(1.0, 3.0).unwrap();
        let cropped = result.select_frequency(&band);
        assert_eq!(cropped.frequencies, vec![1.0, 2.0, 3.0]);
        assert_eq!(cropped.values, vec![0.5, 2.0, 0.5]);
        assert_eq!(cropped.welch, result.welch);

        let rms = result.band_rms(&band).unwrap();
        assert!((rms - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_band_rms_requires_linear() {
        let result = SpectrumResult::from_estimate(estimate(), PowerUnit::Decibel, 1.0).unwrap();
        let band = FrequencyRange::new(0.0, 4.0).unwrap();
        assert!(result.band_rms(&band).is_err());
    }

    #[test]
    fn test_unit_names() {
        for unit in [
            PowerUnit::Linear,
            PowerUnit::Decibel,
            PowerUnit::DecibelRelativeToSensitivity,
        ] {
            assert_eq!(unit.name().parse::<PowerUnit>().unwrap(), unit);
            let json = serde_json::to_string(&unit).unwrap();
            assert_eq!(json, format!("\"{}\"", unit.name()));
        }
    }
}
