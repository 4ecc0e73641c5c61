//! Spectral analysis with FFT

pub mod fft;
pub mod result;
pub mod welch;
pub mod window;
pub mod windowing;

pub use fft::FftEngine;
pub use result::{convert_power, PowerUnit, SpectrumResult};
pub use welch::{welch, Scaling, SpectralEstimator, WelchEstimate, WelchParameters};
pub use window::{generate_window, WindowType};
pub use windowing::Detrend;
