//! Welch power spectral density estimation
//!
//! The series is cut into overlapping segments of `nperseg` samples stepping
//! by `nperseg - noverlap`; each segment is detrended, windowed and
//! transformed, and the one-sided periodograms are averaged. A trailing
//! partial segment is dropped.

use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};

use super::fft::FftEngine;
use super::window::{generate_window, WindowType};
use super::windowing::{apply_window_inplace, density_scale, detrend_inplace, spectrum_scale, Detrend};
use crate::error::{AnalysisError, Result};

/// Smallest series a spectrum can be estimated from
pub const MIN_SERIES_LEN: usize = 2;

/// Normalization of the averaged periodogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Power spectral density, units²/Hz: divide by fs · Σw²
    #[default]
    Density,

    /// Power spectrum, units²: divide by (Σw)²
    Spectrum,
}

/// Welch estimator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchParameters {
    /// Sampling frequency in Hz
    pub sample_rate: f64,

    /// Segment length in samples
    pub nperseg: usize,

    /// Samples shared by consecutive segments (defaults to nperseg / 2)
    pub noverlap: Option<usize>,

    /// FFT length, zero-padding each segment (defaults to nperseg)
    pub nfft: Option<usize>,

    /// Window applied to each segment
    pub window: WindowType,

    /// Per-segment trend removal
    pub detrend: Detrend,

    /// Density or power-spectrum normalization
    pub scaling: Scaling,
}

impl Default for WelchParameters {
    fn default() -> Self {
        Self {
            sample_rate: 25_000.0,
            nperseg: 256,
            noverlap: None,
            nfft: None,
            window: WindowType::Hann,
            detrend: Detrend::Constant,
            scaling: Scaling::Density,
        }
    }
}

impl WelchParameters {
    pub fn new(sample_rate: f64, nperseg: usize) -> Self {
        Self {
            sample_rate,
            nperseg,
            ..Default::default()
        }
    }

    pub fn with_noverlap(mut self, noverlap: usize) -> Self {
        self.noverlap = Some(noverlap);
        self
    }

    pub fn with_nfft(mut self, nfft: usize) -> Self {
        self.nfft = Some(nfft);
        self
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Check the parameters independent of any series
    ///
    /// `nfft` is checked in [`resolve`](Self::resolve), against the segment
    /// length actually used.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "sample rate must be finite and positive, got {}",
                self.sample_rate
            )));
        }
        if self.nperseg == 0 {
            return Err(AnalysisError::InvalidParameter(
                "nperseg must be positive".into(),
            ));
        }
        if let Some(noverlap) = self.noverlap {
            if noverlap >= self.nperseg {
                return Err(AnalysisError::InvalidParameter(format!(
                    "noverlap ({}) must be less than nperseg ({})",
                    noverlap, self.nperseg
                )));
            }
        }
        Ok(())
    }

    /// Concrete parameters for a series of `len` samples
    ///
    /// A segment longer than the series is shortened to the series length;
    /// an unset overlap then follows the shortened segment, and explicit
    /// overlap and FFT length are checked against it. The returned
    /// parameters have every optional field filled in.
    pub fn resolve(&self, len: usize) -> Result<WelchParameters> {
        self.validate()?;

        if len < MIN_SERIES_LEN {
            return Err(AnalysisError::InsufficientData {
                available: len,
                required: MIN_SERIES_LEN,
            });
        }

        let nperseg = self.nperseg.min(len);
        if nperseg < self.nperseg {
            tracing::debug!(
                requested = self.nperseg,
                clamped = nperseg,
                "nperseg exceeds series length, clamping"
            );
        }

        let noverlap = match self.noverlap {
            Some(noverlap) if noverlap >= nperseg => {
                return Err(AnalysisError::InvalidParameter(format!(
                    "noverlap ({}) must be less than the clamped nperseg ({})",
                    noverlap, nperseg
                )));
            }
            Some(noverlap) => noverlap,
            None => nperseg / 2,
        };

        let nfft = match self.nfft {
            Some(nfft) if nfft < nperseg => {
                return Err(AnalysisError::InvalidParameter(format!(
                    "nfft ({}) must be at least nperseg ({})",
                    nfft, nperseg
                )));
            }
            Some(nfft) => nfft,
            None => nperseg,
        };

        Ok(WelchParameters {
            nperseg,
            noverlap: Some(noverlap),
            nfft: Some(nfft),
            ..self.clone()
        })
    }

    /// Number of one-sided frequency bins, once resolved
    pub fn num_bins(&self) -> usize {
        self.nfft.unwrap_or(self.nperseg) / 2 + 1
    }

    /// Spacing between frequency bins in Hz, once resolved
    pub fn bin_width(&self) -> f64 {
        self.sample_rate / self.nfft.unwrap_or(self.nperseg) as f64
    }
}

/// Linear one-sided estimate for a single series
#[derive(Debug, Clone, PartialEq)]
pub struct WelchEstimate {
    /// Bin frequencies in Hz, 0..=fs/2
    pub frequencies: Vec<f64>,

    /// Averaged power per bin
    pub power: Vec<f64>,

    /// Resolved parameters used for the estimate
    pub params: WelchParameters,

    /// Number of segments averaged
    pub segments: usize,
}

/// Welch spectral estimator
///
/// Keeps the planned FFT between calls; it is re-planned only when the FFT
/// length changes.
pub struct SpectralEstimator {
    params: WelchParameters,
    fft_engine: Option<FftEngine>,
}

impl SpectralEstimator {
    pub fn new(params: WelchParameters) -> Self {
        Self {
            params,
            fft_engine: None,
        }
    }

    pub fn params(&self) -> &WelchParameters {
        &self.params
    }

    /// Replace parameters, keeping the FFT plan if its length still fits
    pub fn update_params(&mut self, params: WelchParameters) {
        self.params = params;
    }

    fn engine(&mut self, nfft: usize) -> &mut FftEngine {
        let stale = self
            .fft_engine
            .as_ref()
            .map_or(false, |engine| engine.fft_size() != nfft);
        if stale {
            self.fft_engine = None;
        }
        self.fft_engine.get_or_insert_with(|| FftEngine::new(nfft))
    }

    /// Estimate the one-sided spectrum of `x`
    pub fn estimate(&mut self, x: ArrayView1<'_, f64>) -> Result<WelchEstimate> {
        let params = self.params.resolve(x.len())?;

        let nperseg = params.nperseg;
        let noverlap = params.noverlap.unwrap_or(nperseg / 2);
        let nfft = params.nfft.unwrap_or(nperseg);
        let step = nperseg - noverlap;
        let segments = (x.len() - noverlap) / step;

        let window = generate_window(params.window, nperseg);
        let scale = match params.scaling {
            Scaling::Density => density_scale(&window, params.sample_rate),
            Scaling::Spectrum => spectrum_scale(&window),
        };

        let engine = self.engine(nfft);
        let num_bins = engine.num_bins();
        let mut power = vec![0.0; num_bins];
        let mut segment = vec![0.0; nperseg];

        for seg in 0..segments {
            let start = seg * step;
            for (dst, &src) in segment
                .iter_mut()
                .zip(x.slice(s![start..start + nperseg]).iter())
            {
                *dst = src;
            }
            detrend_inplace(&mut segment, params.detrend);
            apply_window_inplace(&mut segment, &window);
            engine.accumulate_power(&segment, &mut power)?;
        }

        let norm = scale / segments as f64;
        for p in power.iter_mut() {
            *p *= norm;
        }

        // Fold negative frequencies in; DC and (for even nfft) Nyquist are unpaired
        let last = if nfft % 2 == 0 { num_bins - 1 } else { num_bins };
        for p in power.iter_mut().take(last).skip(1) {
            *p *= 2.0;
        }

        let frequencies = engine.frequency_axis_hz(params.sample_rate);

        tracing::debug!(
            samples = x.len(),
            nperseg,
            noverlap,
            nfft,
            segments,
            window = %params.window,
            "welch estimate computed"
        );

        Ok(WelchEstimate {
            frequencies,
            power,
            params,
            segments,
        })
    }
}

/// One-shot Welch estimate
pub fn welch(x: ArrayView1<'_, f64>, params: &WelchParameters) -> Result<WelchEstimate> {
    SpectralEstimator::new(params.clone()).estimate(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize, amplitude: f64) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin()))
    }

    #[test]
    fn test_output_length() {
        let x = sine(5.0, 100.0, 1000, 1.0);
        for &nfft in &[256, 257, 300, 512] {
            let params = WelchParameters::new(100.0, 256).with_nfft(nfft);
            let est = welch(x.view(), &params).unwrap();
            assert_eq!(est.power.len(), nfft / 2 + 1);
            assert_eq!(est.frequencies.len(), nfft / 2 + 1);
        }
    }

    #[test]
    fn test_matches_reference_hann_density() {
        // scipy.signal.welch(x, fs=1.0, nperseg=8, noverlap=4): periodic Hann,
        // constant detrend, density scaling, one-sided
        let x = Array1::from(vec![
            1.0, -0.5, 2.25, 0.75, -1.5, 3.0, 0.0, -2.0, 1.25, 0.5, -0.75, 2.5, -1.0, 0.25, 1.75,
            -0.25,
        ]);
        let expected = [
            0.24321113121915702,
            0.5376989194473131,
            5.446970447171768,
            10.339522701888567,
            2.271241431833844,
        ];
        let params = WelchParameters::new(1.0, 8).with_noverlap(4);
        let est = welch(x.view(), &params).unwrap();

        assert_eq!(est.segments, 3);
        assert_eq!(est.frequencies, vec![0.0, 0.125, 0.25, 0.375, 0.5]);
        for (k, (p, e)) in est.power.iter().zip(expected.iter()).enumerate() {
            assert!((p - e).abs() < 1e-12, "bin {}: {} vs {}", k, p, e);
        }
    }

    #[test]
    fn test_segment_count() {
        let x = sine(5.0, 100.0, 1000, 1.0);
        let params = WelchParameters::new(100.0, 256).with_noverlap(128);
        let est = welch(x.view(), &params).unwrap();
        // (1000 - 128) / 128 = 6 full segments, remainder dropped
        assert_eq!(est.segments, 6);
    }

    #[test]
    fn test_sine_peak_bin() {
        let fs = 1000.0;
        let f0 = 123.0;
        let x = sine(f0, fs, 8192, 2.0);
        let params = WelchParameters::new(fs, 512);
        let est = welch(x.view(), &params).unwrap();

        let (peak, _) = est
            .power
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        let bin_width = fs / 512.0;
        assert!((est.frequencies[peak] - f0).abs() <= bin_width);
    }

    #[test]
    fn test_white_noise_level() {
        // Deterministic pseudo-random sequence, uniform in [-0.5, 0.5)
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let x = Array1::from_iter((0..65_536).map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        }));
        let fs = 200.0;
        let params = WelchParameters::new(fs, 256);
        let est = welch(x.view(), &params).unwrap();

        // Variance 1/12 spread over 0..fs/2 gives a density of 2σ²/fs
        let expected = 2.0 * (1.0 / 12.0) / fs;
        let inner = &est.power[10..118];
        let mean = inner.iter().sum::<f64>() / inner.len() as f64;
        assert!((mean / expected - 1.0).abs() < 0.1, "mean {mean}, expected {expected}");
    }

    #[test]
    fn test_parseval_rectangular() {
        // Integrated density equals signal power for a rectangular window
        let fs = 64.0;
        let x = sine(8.0, fs, 64, 1.0);
        let params = WelchParameters::new(fs, 64)
            .with_window(WindowType::Rectangular)
            .with_detrend(Detrend::None);
        let est = welch(x.view(), &params).unwrap();
        let total: f64 = est.power.iter().sum::<f64>() * fs / 64.0;
        assert!((total - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_spectrum_scaling_amplitude() {
        let fs = 1024.0;
        let x = sine(64.0, fs, 4096, 3.0);
        let params = WelchParameters::new(fs, 1024)
            .with_window(WindowType::Rectangular)
            .with_scaling(Scaling::Spectrum);
        let est = welch(x.view(), &params).unwrap();
        // A²/2 at the bin centre
        assert!((est.power[64] - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_constant_detrend_removes_dc() {
        let x = Array1::from_elem(512, 5.0);
        let params = WelchParameters::new(100.0, 128);
        let est = welch(x.view(), &params).unwrap();
        assert!(est.power.iter().all(|&p| p.abs() < 1e-20));

        let raw = params.clone().with_detrend(Detrend::None);
        let est = welch(x.view(), &raw).unwrap();
        assert!(est.power[0] > 1.0);
    }

    #[test]
    fn test_clamps_nperseg() {
        let x = sine(5.0, 100.0, 100, 1.0);
        let params = WelchParameters::new(100.0, 256);
        let est = welch(x.view(), &params).unwrap();
        assert_eq!(est.params.nperseg, 100);
        assert_eq!(est.params.noverlap, Some(50));
        assert_eq!(est.params.nfft, Some(100));
        assert_eq!(est.segments, 1);
        assert_eq!(est.power.len(), 51);
    }

    #[test]
    fn test_clamp_keeps_explicit_nfft() {
        let x = sine(5.0, 100.0, 100, 1.0);
        let params = WelchParameters::new(100.0, 256).with_nfft(512);
        let est = welch(x.view(), &params).unwrap();
        assert_eq!(est.params.nperseg, 100);
        assert_eq!(est.power.len(), 257);
    }

    #[test]
    fn test_clamp_accepts_nfft_between_clamped_and_requested() {
        let x = sine(5.0, 100.0, 100, 1.0);
        let params = WelchParameters::new(100.0, 256).with_nfft(200);
        let est = welch(x.view(), &params).unwrap();
        assert_eq!(est.params.nperseg, 100);
        assert_eq!(est.params.nfft, Some(200));
        assert_eq!(est.power.len(), 101);

        let short = WelchParameters::new(100.0, 256).with_nfft(64);
        assert!(matches!(
            welch(x.view(), &short),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_clamp_rejects_explicit_overlap_too_large() {
        let x = sine(5.0, 100.0, 100, 1.0);
        let params = WelchParameters::new(100.0, 256).with_noverlap(200);
        assert!(matches!(
            welch(x.view(), &params),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_insufficient_data() {
        let params = WelchParameters::new(100.0, 256);
        for n in 0..2 {
            let x = Array1::<f64>::zeros(n);
            let err = welch(x.view(), &params).unwrap_err();
            assert_eq!(
                err,
                AnalysisError::InsufficientData {
                    available: n,
                    required: 2
                }
            );
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let x = sine(5.0, 100.0, 1000, 1.0);
        let cases = [
            WelchParameters::new(0.0, 256),
            WelchParameters::new(f64::NAN, 256),
            WelchParameters::new(100.0, 0),
            WelchParameters::new(100.0, 256).with_noverlap(256),
            WelchParameters::new(100.0, 256).with_nfft(128),
        ];
        for params in cases.iter() {
            assert!(matches!(
                welch(x.view(), params),
                Err(AnalysisError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_estimator_reuse_is_deterministic() {
        let x = sine(12.5, 100.0, 1000, 1.0);
        let mut estimator = SpectralEstimator::new(WelchParameters::new(100.0, 256));
        let a = estimator.estimate(x.view()).unwrap();
        let b = estimator.estimate(x.view()).unwrap();
        assert_eq!(a, b);

        estimator.update_params(WelchParameters::new(100.0, 128));
        let c = estimator.estimate(x.view()).unwrap();
        assert_eq!(c.power.len(), 65);

        estimator.update_params(WelchParameters::new(100.0, 256));
        assert_eq!(estimator.estimate(x.view()).unwrap(), a);
    }

    #[test]
    fn test_odd_nfft_doubles_last_bin() {
        let x = sine(5.0, 100.0, 301, 1.0);
        let params = WelchParameters::new(100.0, 101)
            .with_window(WindowType::Rectangular)
            .with_detrend(Detrend::None);
        let est = welch(x.view(), &params).unwrap();
        assert_eq!(est.power.len(), 51);
        // Parseval over the one-sided spectrum of odd length
        let total: f64 = est.power.iter().sum::<f64>() * 100.0 / 101.0;
        let power: f64 = x.iter().take(101).map(|v| v * v).sum::<f64>() / 101.0;
        // Segment powers differ slightly; the sine is not periodic in 101 samples
        assert!(total > 0.0 && (total - power).abs() < 0.1);
    }
}
