//! Immutable multi-channel time series
//!
//! A loaded recording: one time column in seconds and N raw channel columns in
//! sensor-native units. Channels are stored row-major by channel so each
//! channel is a contiguous view.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// Loaded recording: a time column plus one or more raw channels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesTable {
    time_name: String,
    channel_names: Vec<String>,
    time: Array1<f64>,
    /// Shape (channels, samples)
    samples: Array2<f64>,
}

/// Default channel label for a zero-based index
pub fn default_channel_name(index: usize) -> String {
    format!("Channel_{}", index + 1)
}

impl TimeSeriesTable {
    /// Build a table from rows of `[time, ch0, ch1, ...]`
    ///
    /// # Arguments
    /// * `rows` - Sample rows; every row must have the same width (at least 2)
    /// * `names` - Optional header (time column name followed by channel names)
    pub fn from_rows(rows: &[Vec<f64>], names: Option<Vec<String>>) -> Result<Self> {
        let width = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| AnalysisError::MalformedInput("table has no data rows".into()))?;

        if width < 2 {
            return Err(AnalysisError::MalformedInput(format!(
                "need a time column and at least one channel, found {} column(s)",
                width
            )));
        }

        let num_channels = width - 1;
        let mut time = Vec::with_capacity(rows.len());
        let mut samples = Array2::<f64>::zeros((num_channels, rows.len()));

        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(AnalysisError::MalformedInput(format!(
                    "row {} has {} column(s), expected {}",
                    i + 1,
                    row.len(),
                    width
                )));
            }
            time.push(row[0]);
            for (ch, &value) in row[1..].iter().enumerate() {
                samples[[ch, i]] = value;
            }
        }

        Self::assemble(Array1::from(time), samples, names)
    }

    /// Build a table from a time column and per-channel columns
    pub fn from_columns(
        time: Vec<f64>,
        channels: Vec<Vec<f64>>,
        names: Option<Vec<String>>,
    ) -> Result<Self> {
        if channels.is_empty() {
            return Err(AnalysisError::MalformedInput(
                "need a time column and at least one channel, found 1 column(s)".into(),
            ));
        }
        if time.is_empty() {
            return Err(AnalysisError::MalformedInput("table has no data rows".into()));
        }

        let len = time.len();
        let mut samples = Array2::<f64>::zeros((channels.len(), len));
        for (ch, column) in channels.iter().enumerate() {
            if column.len() != len {
                return Err(AnalysisError::MalformedInput(format!(
                    "channel {} has {} sample(s), time column has {}",
                    ch,
                    column.len(),
                    len
                )));
            }
            samples.row_mut(ch).assign(&ArrayView1::from(column.as_slice()));
        }

        Self::assemble(Array1::from(time), samples, names)
    }

    fn assemble(
        time: Array1<f64>,
        samples: Array2<f64>,
        names: Option<Vec<String>>,
    ) -> Result<Self> {
        if let Some(i) = time.iter().position(|t| !t.is_finite()) {
            return Err(AnalysisError::MalformedInput(format!(
                "time value in row {} is not a finite number",
                i + 1
            )));
        }

        let num_channels = samples.nrows();
        let (time_name, channel_names) = match names {
            Some(mut names) => {
                if names.len() != num_channels + 1 {
                    return Err(AnalysisError::MalformedInput(format!(
                        "header has {} name(s), table has {} column(s)",
                        names.len(),
                        num_channels + 1
                    )));
                }
                let time_name = names.remove(0);
                (time_name, names)
            }
            None => (
                "Time".to_string(),
                (0..num_channels).map(default_channel_name).collect(),
            ),
        };

        tracing::debug!(
            rows = time.len(),
            channels = num_channels,
            "time series table assembled"
        );

        Ok(Self {
            time_name,
            channel_names,
            time,
            samples,
        })
    }

    /// Raw samples of a channel
    pub fn channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_channel(index)?;
        Ok(self.samples.row(index))
    }

    /// Time column in seconds
    pub fn time_column(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    /// All raw samples, shape (channels, samples)
    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    pub fn check_channel(&self, index: usize) -> Result<()> {
        if index >= self.channel_count() {
            return Err(AnalysisError::IndexOutOfRange {
                index,
                count: self.channel_count(),
            });
        }
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of sample rows
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time_name(&self) -> &str {
        &self.time_name
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn channel_name(&self, index: usize) -> Result<&str> {
        self.check_channel(index)?;
        Ok(&self.channel_names[index])
    }

    /// Time span covered (first, last)
    pub fn time_span(&self) -> (f64, f64) {
        let first = self.time.first().copied().unwrap_or(0.0);
        let last = self.time.last().copied().unwrap_or(0.0);
        (first, last)
    }

    /// Mean sampling rate implied by the time column, if it advances
    pub fn estimated_sample_rate(&self) -> Option<f64> {
        let (first, last) = self.time_span();
        let elapsed = last - first;
        if self.len() < 2 || elapsed <= 0.0 {
            return None;
        }
        Some((self.len() - 1) as f64 / elapsed)
    }
}
