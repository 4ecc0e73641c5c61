//! Vibration PSD - Accelerometer Recording Analysis Core
//!
//! Loads multi-channel vibration recordings, calibrates raw voltages to
//! g-levels and estimates power spectral density with Welch's method, over
//! the whole recording or a selected time span. UI-independent; optional
//! Python bindings behind the `python` feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use calibration::{calibrate, CalibrationParameters};
pub use config::AnalysisConfig;
pub use data::{FrequencyRange, TimeRange, TimeSeriesTable};
pub use error::{AnalysisError, ErrorKind, Result};
pub use session::{AnalysisSession, CalibratedSeries, SessionState};
pub use spectrum::{PowerUnit, SpectralEstimator, SpectrumResult, WelchParameters, WindowType};
