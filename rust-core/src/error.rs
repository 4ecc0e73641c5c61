//! Error taxonomy for the analysis pipeline
//!
//! Every fallible operation in the crate returns [`AnalysisError`]. Callers
//! that need to branch on the failure (a UI picking a message, the Python
//! bindings picking an exception type) should match on [`AnalysisError::kind`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid sensitivity {0}: must be finite and greater than zero")]
    InvalidCalibration(f64),

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("Insufficient data: {available} sample(s) available, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    #[error("Channel index {index} out of range ({count} channel(s) available)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("No table loaded")]
    NotLoaded,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("FFT processing failed: {0}")]
    Fft(String),
}

/// Fieldless discriminant of [`AnalysisError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedInput,
    InvalidCalibration,
    InvalidRange,
    InsufficientData,
    IndexOutOfRange,
    NotLoaded,
    InvalidParameter,
    Fft,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MalformedInput(_) => ErrorKind::MalformedInput,
            AnalysisError::InvalidCalibration(_) => ErrorKind::InvalidCalibration,
            AnalysisError::InvalidRange { .. } => ErrorKind::InvalidRange,
            AnalysisError::InsufficientData { .. } => ErrorKind::InsufficientData,
            AnalysisError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            AnalysisError::NotLoaded => ErrorKind::NotLoaded,
            AnalysisError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            AnalysisError::Fft(_) => ErrorKind::Fft,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
