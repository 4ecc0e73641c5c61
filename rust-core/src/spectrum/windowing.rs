//! Segment preparation for spectral estimation
//!
//! Detrending, window application and the normalization factors that make
//! windowed periodograms comparable across window kinds.

use serde::{Deserialize, Serialize};

/// Per-segment trend removal applied before windowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detrend {
    /// Subtract the segment mean
    #[default]
    Constant,

    /// Use the segment as-is
    None,
}

/// Remove the trend from a segment in-place
pub fn detrend_inplace(segment: &mut [f64], detrend: Detrend) {
    match detrend {
        Detrend::Constant => {
            if segment.is_empty() {
                return;
            }
            let mean = segment.iter().sum::<f64>() / segment.len() as f64;
            for s in segment.iter_mut() {
                *s -= mean;
            }
        }
        Detrend::None => {}
    }
}

/// Apply window in-place
///
/// Extra samples on either side beyond the shorter length are left untouched.
pub fn apply_window_inplace(signal: &mut [f64], window: &[f64]) {
    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}

/// Sum of window coefficients (coherent gain × length)
pub fn window_sum(window: &[f64]) -> f64 {
    window.iter().sum()
}

/// Sum of squared window coefficients (window energy)
pub fn window_power_sum(window: &[f64]) -> f64 {
    window.iter().map(|&w| w * w).sum()
}

/// Scale factor for power spectral density: 1 / (fs · Σw²)
///
/// Result units are signal² / Hz.
pub fn density_scale(window: &[f64], sample_rate: f64) -> f64 {
    1.0 / (sample_rate * window_power_sum(window))
}

/// Scale factor for power spectrum: 1 / (Σw)²
///
/// Result units are signal², so a sinusoid of amplitude A reads A²/2 at its bin.
pub fn spectrum_scale(window: &[f64]) -> f64 {
    let sum = window_sum(window);
    1.0 / (sum * sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::window::{generate_window, WindowType};

    #[test]
    fn test_constant_detrend() {
        let mut segment = vec![1.0, 2.0, 3.0, 4.0];
        detrend_inplace(&mut segment, Detrend::Constant);
        assert_eq!(segment, vec![-1.5, -0.5, 0.5, 1.5]);

        let mut untouched = vec![1.0, 2.0];
        detrend_inplace(&mut untouched, Detrend::None);
        assert_eq!(untouched, vec![1.0, 2.0]);
    }

    #[test]
    fn test_apply_window() {
        let mut signal = vec![1.0; 100];
        let window = generate_window(WindowType::Hamming, 100);
        apply_window_inplace(&mut signal, &window);

        assert!((signal[50] - 1.0).abs() < 0.01);
        assert!(signal[0] < 0.1);
    }

    #[test]
    fn test_scales() {
        let rect = generate_window(WindowType::Rectangular, 100);
        assert!((density_scale(&rect, 10.0) - 1.0 / 1000.0).abs() < 1e-15);
        assert!((spectrum_scale(&rect) - 1.0 / 10_000.0).abs() < 1e-15);

        let hann = generate_window(WindowType::Hann, 100);
        // Σw² = 3N/8 for a periodic Hann window
        assert!((density_scale(&hann, 1.0) - 1.0 / 37.5).abs() < 1e-12);
    }
}
