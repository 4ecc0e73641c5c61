//! FFT engine using realfft for real-valued signals
//!
//! Planned once per FFT length and reused across all segments of an estimate

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::error::{AnalysisError, Result};

/// FFT engine for real-valued signals
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples)
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
        }
    }

    /// Load a segment into the input buffer, zero-padding or truncating to fft_size
    fn load(&mut self, signal: &[f64]) {
        let copy_len = signal.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&signal[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);
    }

    fn transform(&mut self) -> Result<()> {
        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)
            .map_err(|e| AnalysisError::Fft(e.to_string()))
    }

    /// Compute |X[k]|² for k = 0..fft_size/2
    pub fn compute_power(&mut self, signal: &[f64]) -> Result<Vec<f64>> {
        self.load(signal);
        self.transform()?;
        Ok(self.output_buffer.iter().map(|c| c.norm_sqr()).collect())
    }

    /// Add |X[k]|² into `acc` without allocating
    ///
    /// `acc` must hold `num_bins()` values.
    pub fn accumulate_power(&mut self, signal: &[f64], acc: &mut [f64]) -> Result<()> {
        if acc.len() != self.num_bins() {
            return Err(AnalysisError::Fft(format!(
                "accumulator holds {} bins, expected {}",
                acc.len(),
                self.num_bins()
            )));
        }
        self.load(signal);
        self.transform()?;
        for (a, c) in acc.iter_mut().zip(self.output_buffer.iter()) {
            *a += c.norm_sqr();
        }
        Ok(())
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency of bin `k` in Hz: k · fs / nfft
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }

    /// Frequency axis in Hz, from DC to Nyquist
    pub fn frequency_axis_hz(&self, sample_rate: f64) -> Vec<f64> {
        (0..self.num_bins())
            .map(|bin| self.bin_to_hz(bin, sample_rate))
            .collect()
    }
}
