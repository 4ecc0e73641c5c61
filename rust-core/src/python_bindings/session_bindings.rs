//! Python bindings for the analysis session

use std::fs::File;

use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use super::window_bindings::{PyPowerUnit, PyWindowType};
use crate::config::AnalysisConfig;
use crate::data::{FrequencyRange, TimeRange, TimeSeriesTable};
use crate::session::{AnalysisSession, SessionState};
use crate::spectrum::{SpectrumResult, WelchParameters};

/// Open-ended bounds become infinite; both absent means the whole recording
fn time_range(start: Option<f64>, end: Option<f64>) -> PyResult<Option<TimeRange>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    let range = TimeRange::new(
        start.unwrap_or(f64::NEG_INFINITY),
        end.unwrap_or(f64::INFINITY),
    )?;
    Ok(Some(range))
}

fn spectrum_arrays<'py>(
    py: Python<'py>,
    result: SpectrumResult,
) -> (&'py PyArray1<f64>, &'py PyArray1<f64>) {
    (
        PyArray1::from_vec(py, result.frequencies),
        PyArray1::from_vec(py, result.values),
    )
}

/// Analysis session exposed to Python
///
/// One instance per open document; not shared between threads.
#[pyclass(name = "AnalysisSession", unsendable)]
pub struct PyAnalysisSession {
    session: AnalysisSession,
}

#[pymethods]
impl PyAnalysisSession {
    /// Create a new, empty session
    ///
    /// Args:
    ///     config_path: Optional JSON file with sensitivity/Welch/unit defaults
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<&str>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => AnalysisConfig::load_from_file(path)
                .map_err(|e| PyValueError::new_err(e.to_string()))?,
            None => AnalysisConfig::default(),
        };
        Ok(Self {
            session: AnalysisSession::with_config(config),
        })
    }

    /// Load a CSV recording (time column followed by channel columns)
    ///
    /// Returns:
    ///     Number of channels loaded
    fn load_csv(&mut self, path: &str) -> PyResult<usize> {
        let file = File::open(path).map_err(|e| PyIOError::new_err(e.to_string()))?;
        let table = self.session.load_csv(file)?;
        Ok(table.channel_count())
    }

    /// Load a recording from numpy columns
    ///
    /// Args:
    ///     time: Time column in seconds
    ///     channels: List of raw channel arrays, each as long as `time`
    ///     names: Optional channel names
    #[pyo3(signature = (time, channels, names=None))]
    fn load_columns(
        &mut self,
        time: PyReadonlyArray1<f64>,
        channels: Vec<PyReadonlyArray1<f64>>,
        names: Option<Vec<String>>,
    ) -> PyResult<usize> {
        let time = time.as_array().to_vec();
        let channels: Vec<Vec<f64>> = channels.iter().map(|c| c.as_array().to_vec()).collect();
        let names = names.map(|names| {
            let mut all = vec!["Time".to_string()];
            all.extend(names);
            all
        });
        let table = TimeSeriesTable::from_columns(time, channels, names)?;
        Ok(self.session.load(table).channel_count())
    }

    /// Current lifecycle state: "empty", "loaded" or "analyzed"
    fn state(&self) -> &'static str {
        match self.session.state() {
            SessionState::Empty => "empty",
            SessionState::Loaded => "loaded",
            SessionState::Analyzed => "analyzed",
        }
    }

    /// Return to the empty state
    fn reset(&mut self) {
        self.session.reset();
    }

    fn channel_names(&self) -> PyResult<Vec<String>> {
        Ok(self.session.channel_names()?)
    }

    fn set_sensitivity(&mut self, sensitivity: f64) -> PyResult<()> {
        Ok(self.session.set_sensitivity(sensitivity)?)
    }

    /// Override the sensitivity of one channel
    fn set_channel_sensitivity(&mut self, channel: usize, sensitivity: f64) -> PyResult<()> {
        let calibration = self
            .session
            .calibration()
            .clone()
            .with_override(channel, sensitivity)?;
        Ok(self.session.set_calibration(calibration)?)
    }

    fn get_sensitivity(&self) -> f64 {
        self.session.calibration().sensitivity
    }

    fn set_unit(&mut self, unit: PyPowerUnit) {
        self.session.set_unit(unit.into());
    }

    /// Calibrated trace of a channel
    ///
    /// Returns:
    ///     Tuple of (time, g-level) numpy arrays
    #[pyo3(signature = (channel, start=None, end=None))]
    fn calibrated_series<'py>(
        &self,
        py: Python<'py>,
        channel: usize,
        start: Option<f64>,
        end: Option<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let series = match time_range(start, end)? {
            Some(range) => self.session.calibrated_series_in(channel, range)?,
            None => self.session.calibrated_series(channel)?,
        };
        Ok((series.time.into_pyarray(py), series.values.into_pyarray(py)))
    }

    /// Welch PSD of a calibrated channel
    ///
    /// Args:
    ///     channel: Zero-based channel index
    ///     sample_rate: Sampling frequency in Hz
    ///     nperseg: Segment length
    ///     noverlap: Overlap (default: nperseg // 2)
    ///     nfft: FFT length (default: nperseg)
    ///     window: Window type
    ///     start, end: Optional time span in seconds
    ///
    /// Returns:
    ///     Tuple of (frequencies, power) numpy arrays
    #[pyo3(signature = (channel, sample_rate, nperseg=256, noverlap=None, nfft=None, window=PyWindowType::Hann, start=None, end=None))]
    #[allow(clippy::too_many_arguments)]
    fn compute_spectrum<'py>(
        &mut self,
        py: Python<'py>,
        channel: usize,
        sample_rate: f64,
        nperseg: usize,
        noverlap: Option<usize>,
        nfft: Option<usize>,
        window: PyWindowType,
        start: Option<f64>,
        end: Option<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let params = WelchParameters {
            sample_rate,
            nperseg,
            noverlap,
            nfft,
            window: window.into(),
            ..self.session.welch_parameters().clone()
        };
        let range = time_range(start, end)?;
        let result = self.session.compute_spectrum(channel, range, &params)?;
        Ok(spectrum_arrays(py, result))
    }

    /// Recompute the last spectrum's channel and span with a new segment setup
    #[pyo3(signature = (nperseg, noverlap=None, nfft=None))]
    fn reestimate<'py>(
        &mut self,
        py: Python<'py>,
        nperseg: usize,
        noverlap: Option<usize>,
        nfft: Option<usize>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let params = WelchParameters {
            nperseg,
            noverlap,
            nfft,
            ..self.session.welch_parameters().clone()
        };
        let result = self.session.reestimate(&params)?;
        Ok(spectrum_arrays(py, result))
    }

    /// Peak of the last spectrum as (frequency, value), or None
    fn last_peak(&self) -> Option<(f64, f64)> {
        self.session.last_spectrum().and_then(|s| s.peak())
    }

    /// RMS of the last spectrum over a frequency band (linear density only)
    fn band_rms(&self, f_start: f64, f_end: f64) -> PyResult<f64> {
        let spectrum = self
            .session
            .last_spectrum()
            .ok_or_else(|| PyRuntimeError::new_err("no spectrum has been computed"))?;
        let band = FrequencyRange::new(f_start, f_end)?;
        Ok(spectrum.band_rms(&band)?)
    }
}
