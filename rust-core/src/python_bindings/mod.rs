//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::{AnalysisError, ErrorKind};

mod session_bindings;
mod window_bindings;

impl From<AnalysisError> for PyErr {
    fn from(err: AnalysisError) -> PyErr {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::IndexOutOfRange => PyIndexError::new_err(msg),
            ErrorKind::NotLoaded | ErrorKind::Fft => PyRuntimeError::new_err(msg),
            ErrorKind::MalformedInput
            | ErrorKind::InvalidCalibration
            | ErrorKind::InvalidRange
            | ErrorKind::InsufficientData
            | ErrorKind::InvalidParameter => PyValueError::new_err(msg),
        }
    }
}

/// Python module definition
#[pymodule]
fn vibration_psd(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<session_bindings::PyAnalysisSession>()?;

    m.add_class::<window_bindings::PyWindowType>()?;
    m.add_class::<window_bindings::PyPowerUnit>()?;

    Ok(())
}
