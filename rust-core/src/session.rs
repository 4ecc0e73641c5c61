//! Analysis session - the object a UI layer drives
//!
//! Owns the loaded table, the current calibration/Welch/unit settings and the
//! most recent spectrum. Lifecycle:
//!
//! ```text
//! Empty --load--> Loaded --compute_spectrum--> Analyzed
//!                   ^                              |
//!                   +------------load--------------+
//! ```
//!
//! Loading always discards the cached spectrum. Operations that need data
//! fail with [`AnalysisError::NotLoaded`] while the session is empty.

use std::io::Read;
use std::sync::Arc;

use ndarray::Array1;
use serde::Serialize;

use crate::calibration::{calibrate, CalibrationParameters};
use crate::config::AnalysisConfig;
use crate::data::range::{select_channel_range, TimeRange};
use crate::data::{read_table, TimeSeriesTable};
use crate::error::{AnalysisError, Result};
use crate::spectrum::{PowerUnit, SpectralEstimator, SpectrumResult, WelchParameters};

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No table loaded
    Empty,
    /// Table present, no spectrum computed since the load
    Loaded,
    /// Table present and a spectrum cached
    Analyzed,
}

enum Pipeline {
    Empty,
    Loaded {
        table: Arc<TimeSeriesTable>,
    },
    Analyzed {
        table: Arc<TimeSeriesTable>,
        spectrum: SpectrumResult,
    },
}

/// Calibrated amplitude-vs-time trace of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibratedSeries {
    pub channel: usize,
    pub channel_name: String,
    pub sensitivity: f64,
    /// Time in seconds
    pub time: Array1<f64>,
    /// Calibrated values (raw / sensitivity)
    pub values: Array1<f64>,
    pub time_range: Option<TimeRange>,
}

impl CalibratedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest absolute calibrated value, if any
    pub fn peak_abs(&self) -> Option<f64> {
        self.values.iter().map(|v| v.abs()).reduce(f64::max)
    }
}

/// Pipeline state for one logical user session
///
/// Not meant to be mutated from several threads; tables and results handed
/// out are immutable and can be shared freely.
pub struct AnalysisSession {
    pipeline: Pipeline,
    calibration: CalibrationParameters,
    welch: WelchParameters,
    unit: PowerUnit,
    estimator: SpectralEstimator,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    /// Empty session with default settings
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Empty session seeded from a configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            pipeline: Pipeline::Empty,
            estimator: SpectralEstimator::new(config.welch.clone()),
            calibration: config.calibration,
            welch: config.welch,
            unit: config.unit,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.pipeline {
            Pipeline::Empty => SessionState::Empty,
            Pipeline::Loaded { .. } => SessionState::Loaded,
            Pipeline::Analyzed { .. } => SessionState::Analyzed,
        }
    }

    /// Replace the current table, discarding any cached spectrum
    pub fn load(&mut self, table: TimeSeriesTable) -> Arc<TimeSeriesTable> {
        let table = Arc::new(table);
        tracing::debug!(
            from = ?self.state(),
            rows = table.len(),
            channels = table.channel_count(),
            "loading table"
        );
        self.pipeline = Pipeline::Loaded {
            table: Arc::clone(&table),
        };
        table
    }

    /// Build a table from parsed rows and load it
    ///
    /// On error the session keeps its previous table.
    pub fn load_rows(
        &mut self,
        rows: &[Vec<f64>],
        names: Option<Vec<String>>,
    ) -> Result<Arc<TimeSeriesTable>> {
        let table = TimeSeriesTable::from_rows(rows, names)?;
        Ok(self.load(table))
    }

    /// Parse CSV text from a reader and load it
    ///
    /// On error the session keeps its previous table.
    pub fn load_csv<R: Read>(&mut self, reader: R) -> Result<Arc<TimeSeriesTable>> {
        let table = read_table(reader)?;
        Ok(self.load(table))
    }

    /// Return to the empty state
    pub fn reset(&mut self) {
        tracing::debug!(from = ?self.state(), "session reset");
        self.pipeline = Pipeline::Empty;
    }

    /// Current table
    pub fn table(&self) -> Result<Arc<TimeSeriesTable>> {
        match &self.pipeline {
            Pipeline::Empty => Err(AnalysisError::NotLoaded),
            Pipeline::Loaded { table } | Pipeline::Analyzed { table, .. } => Ok(Arc::clone(table)),
        }
    }

    fn table_ref(&self) -> Result<&TimeSeriesTable> {
        match &self.pipeline {
            Pipeline::Empty => Err(AnalysisError::NotLoaded),
            Pipeline::Loaded { table } | Pipeline::Analyzed { table, .. } => Ok(&**table),
        }
    }

    pub fn channel_names(&self) -> Result<Vec<String>> {
        Ok(self.table_ref()?.channel_names().to_vec())
    }

    /// Most recent spectrum, if one was computed since the last load
    pub fn last_spectrum(&self) -> Option<&SpectrumResult> {
        match &self.pipeline {
            Pipeline::Analyzed { spectrum, .. } => Some(spectrum),
            _ => None,
        }
    }

    pub fn calibration(&self) -> &CalibrationParameters {
        &self.calibration
    }

    /// Replace the calibration; rejected settings leave the current ones in place
    pub fn set_calibration(&mut self, calibration: CalibrationParameters) -> Result<()> {
        calibration.validate()?;
        self.calibration = calibration;
        Ok(())
    }

    /// Set the sensitivity applied to every channel without an override
    pub fn set_sensitivity(&mut self, sensitivity: f64) -> Result<()> {
        let calibration = CalibrationParameters {
            sensitivity,
            ..self.calibration.clone()
        };
        self.set_calibration(calibration)
    }

    pub fn welch_parameters(&self) -> &WelchParameters {
        &self.welch
    }

    /// Replace the default Welch parameters; rejected settings leave the current ones in place
    pub fn set_welch_parameters(&mut self, welch: WelchParameters) -> Result<()> {
        welch.validate()?;
        self.welch = welch;
        Ok(())
    }

    pub fn unit(&self) -> PowerUnit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: PowerUnit) {
        self.unit = unit;
    }

    /// Calibrated trace of a whole channel
    pub fn calibrated_series(&self, channel: usize) -> Result<CalibratedSeries> {
        self.series(channel, None)
    }

    /// Calibrated trace of a channel restricted to a time span
    ///
    /// A span outside the recording gives an empty series, not an error.
    pub fn calibrated_series_in(&self, channel: usize, range: TimeRange) -> Result<CalibratedSeries> {
        self.series(channel, Some(range))
    }

    /// Time and raw samples of a channel, restricted to `range` when given
    fn raw_slice(
        &self,
        channel: usize,
        range: Option<&TimeRange>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let table = self.table_ref()?;
        match range {
            Some(range) => select_channel_range(table, channel, range),
            None => Ok((
                table.time_column().to_owned(),
                table.channel(channel)?.to_owned(),
            )),
        }
    }

    fn series(&self, channel: usize, range: Option<TimeRange>) -> Result<CalibratedSeries> {
        let (time, raw) = self.raw_slice(channel, range.as_ref())?;
        let sensitivity = self.calibration.sensitivity_for(channel)?;
        let values = calibrate(raw.view(), sensitivity)?;

        Ok(CalibratedSeries {
            channel,
            channel_name: self.table_ref()?.channel_name(channel)?.to_string(),
            sensitivity,
            time,
            values,
            time_range: range,
        })
    }

    /// Estimate the spectrum of one calibrated channel and cache it
    ///
    /// # Arguments
    /// * `channel` - Zero-based channel index
    /// * `range` - Optional time span to restrict the estimate to
    /// * `welch` - Estimator parameters; they become the session's current ones
    pub fn compute_spectrum(
        &mut self,
        channel: usize,
        range: Option<TimeRange>,
        welch: &WelchParameters,
    ) -> Result<SpectrumResult> {
        let result = self.estimate_channel(channel, range, welch)?;
        self.welch = welch.clone();
        self.cache(result.clone())?;
        Ok(result)
    }

    /// Estimate with the session's current Welch parameters
    pub fn compute_spectrum_default(
        &mut self,
        channel: usize,
        range: Option<TimeRange>,
    ) -> Result<SpectrumResult> {
        let welch = self.welch.clone();
        self.compute_spectrum(channel, range, &welch)
    }

    /// Repeat the cached spectrum's channel and span with new parameters
    pub fn reestimate(&mut self, welch: &WelchParameters) -> Result<SpectrumResult> {
        let (channel, range) = match &self.pipeline {
            Pipeline::Empty => return Err(AnalysisError::NotLoaded),
            Pipeline::Loaded { .. } => {
                return Err(AnalysisError::InvalidParameter(
                    "no spectrum has been computed to re-estimate".into(),
                ))
            }
            Pipeline::Analyzed { spectrum, .. } => {
                (spectrum.channel.unwrap_or(0), spectrum.time_range)
            }
        };
        self.compute_spectrum(channel, range, welch)
    }

    /// Estimate every channel with the same parameters
    ///
    /// The last channel's result becomes the cached spectrum.
    pub fn compute_all_spectra(
        &mut self,
        range: Option<TimeRange>,
        welch: &WelchParameters,
    ) -> Result<Vec<SpectrumResult>> {
        let count = self.table_ref()?.channel_count();
        let results = (0..count)
            .map(|channel| self.estimate_channel(channel, range, welch))
            .collect::<Result<Vec<_>>>()?;

        self.welch = welch.clone();
        if let Some(last) = results.last() {
            self.cache(last.clone())?;
        }
        Ok(results)
    }

    fn estimate_channel(
        &mut self,
        channel: usize,
        range: Option<TimeRange>,
        welch: &WelchParameters,
    ) -> Result<SpectrumResult> {
        welch.validate()?;
        let (_, raw) = self.raw_slice(channel, range.as_ref())?;
        let sensitivity = self.calibration.sensitivity_for(channel)?;

        // dB re sensitivity² is referenced to the raw-sample PSD
        let input = match self.unit {
            PowerUnit::DecibelRelativeToSensitivity => raw,
            PowerUnit::Linear | PowerUnit::Decibel => calibrate(raw.view(), sensitivity)?,
        };

        self.estimator.update_params(welch.clone());
        let estimate = self.estimator.estimate(input.view())?;

        let mut result = SpectrumResult::from_estimate(estimate, self.unit, sensitivity)?;
        result.channel = Some(channel);
        result.channel_name = Some(self.table_ref()?.channel_name(channel)?.to_string());
        result.time_range = range;
        Ok(result)
    }

    fn cache(&mut self, spectrum: SpectrumResult) -> Result<()> {
        let table = self.table()?;
        tracing::debug!(
            from = ?self.state(),
            channel = ?spectrum.channel,
            bins = spectrum.len(),
            "spectrum cached"
        );
        self.pipeline = Pipeline::Analyzed { table, spectrum };
        Ok(())
    }
}
