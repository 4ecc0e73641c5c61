//! Window functions for spectral estimation
//!
//! Coefficients are generated in the periodic (DFT-even) form used for
//! segment-averaged spectra: a length-M window is the symmetric length-(M+1)
//! window with its last sample dropped.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Rectangular window (no windowing), also known as boxcar
    #[serde(alias = "boxcar")]
    Rectangular,

    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/M)
    /// Sidelobe attenuation: ~31 dB, the usual default for Welch averaging
    #[serde(alias = "hanning")]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/M)
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/M) + 0.08*cos(4πn/M)
    Blackman,

    /// Bartlett (triangular) window with zero endpoints
    Bartlett,

    /// Flat-top window, for accurate amplitude of narrowband peaks
    #[serde(alias = "flat_top")]
    FlatTop,
}

impl WindowType {
    pub const ALL: [WindowType; 6] = [
        WindowType::Rectangular,
        WindowType::Hann,
        WindowType::Hamming,
        WindowType::Blackman,
        WindowType::Bartlett,
        WindowType::FlatTop,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Rectangular => "rectangular",
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Bartlett => "bartlett",
            WindowType::FlatTop => "flattop",
        }
    }

    /// Cosine-sum coefficients a_k, for windows of that family
    fn cosine_terms(&self) -> Option<&'static [f64]> {
        match self {
            WindowType::Hann => Some(&[0.5, 0.5]),
            WindowType::Hamming => Some(&[0.54, 0.46]),
            WindowType::Blackman => Some(&[0.42, 0.50, 0.08]),
            WindowType::FlatTop => Some(&[
                0.215_578_95,
                0.416_631_58,
                0.277_263_158,
                0.083_578_947,
                0.006_947_368,
            ]),
            WindowType::Rectangular | WindowType::Bartlett => None,
        }
    }
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::Hann
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangular" | "boxcar" | "rect" => Ok(WindowType::Rectangular),
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "bartlett" | "triangular" => Ok(WindowType::Bartlett),
            "flattop" | "flat_top" | "flat-top" => Ok(WindowType::FlatTop),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown window type '{}'",
                other
            ))),
        }
    }
}

/// Generate periodic window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    if length <= 1 {
        return vec![1.0; length];
    }

    let m = length as f64;

    if let Some(terms) = window_type.cosine_terms() {
        // w[n] = Σ (-1)^k a_k cos(2πkn/M)
        return (0..length)
            .map(|n| {
                let theta = 2.0 * PI * n as f64 / m;
                terms
                    .iter()
                    .enumerate()
                    .map(|(k, &a)| {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * a * (k as f64 * theta).cos()
                    })
                    .sum()
            })
            .collect();
    }

    match window_type {
        WindowType::Bartlett => (0..length)
            .map(|n| {
                let n = n as f64;
                if n <= m / 2.0 {
                    2.0 * n / m
                } else {
                    2.0 - 2.0 * n / m
                }
            })
            .collect(),
        _ => vec![1.0; length],
    }
}
