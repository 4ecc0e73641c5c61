//! Python enums for window kinds and power units

use pyo3::prelude::*;

use crate::spectrum::{PowerUnit, WindowType};

/// Window type enum exposed to Python
#[pyclass(name = "WindowType")]
#[derive(Clone)]
pub enum PyWindowType {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    FlatTop,
}

impl From<PyWindowType> for WindowType {
    fn from(py_win: PyWindowType) -> Self {
        match py_win {
            PyWindowType::Rectangular => WindowType::Rectangular,
            PyWindowType::Hann => WindowType::Hann,
            PyWindowType::Hamming => WindowType::Hamming,
            PyWindowType::Blackman => WindowType::Blackman,
            PyWindowType::Bartlett => WindowType::Bartlett,
            PyWindowType::FlatTop => WindowType::FlatTop,
        }
    }
}

/// Power unit enum exposed to Python
#[pyclass(name = "PowerUnit")]
#[derive(Clone)]
pub enum PyPowerUnit {
    Linear,
    Decibel,
    DecibelRelativeToSensitivity,
}

impl From<PyPowerUnit> for PowerUnit {
    fn from(py_unit: PyPowerUnit) -> Self {
        match py_unit {
            PyPowerUnit::Linear => PowerUnit::Linear,
            PyPowerUnit::Decibel => PowerUnit::Decibel,
            PyPowerUnit::DecibelRelativeToSensitivity => PowerUnit::DecibelRelativeToSensitivity,
        }
    }
}
