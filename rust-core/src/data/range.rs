//! Time and frequency span selection
//!
//! Ranges are closed intervals `[start, end]`. An inverted range cannot be
//! constructed; a valid range that matches no samples yields an empty
//! selection rather than an error.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;

use super::table::TimeSeriesTable;
use crate::error::{AnalysisError, Result};

fn check_bounds(start: f64, end: f64) -> Result<()> {
    // NaN bounds fail this comparison too
    if !(start <= end) {
        return Err(AnalysisError::InvalidRange { start, end });
    }
    Ok(())
}

/// Closed time interval in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        check_bounds(start, end)?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Closed frequency interval in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyRange {
    start: f64,
    end: f64,
}

impl FrequencyRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        check_bounds(start, end)?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, f: f64) -> bool {
        f >= self.start && f <= self.end
    }
}

/// Indices of `values` accepted by `contains`, in ascending order
pub fn matching_indices<F>(values: ArrayView1<'_, f64>, contains: F) -> Vec<usize>
where
    F: Fn(f64) -> bool,
{
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| contains(v))
        .map(|(i, _)| i)
        .collect()
}

/// Rows of a table whose time lies inside a [`TimeRange`]
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSelection {
    /// Row indices into the source table
    pub indices: Vec<usize>,
    /// Time values at those rows
    pub time: Array1<f64>,
    /// Raw samples at those rows, shape (channels, selected)
    pub samples: Array2<f64>,
}

impl TimeSelection {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Selected raw samples of one channel
    pub fn channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        if index >= self.samples.nrows() {
            return Err(AnalysisError::IndexOutOfRange {
                index,
                count: self.samples.nrows(),
            });
        }
        Ok(self.samples.row(index))
    }
}

/// Select rows by time, failing on an inverted interval
pub fn select_by_time(table: &TimeSeriesTable, start: f64, end: f64) -> Result<TimeSelection> {
    let range = TimeRange::new(start, end)?;
    Ok(select_range(table, &range))
}

fn range_indices(table: &TimeSeriesTable, range: &TimeRange) -> Vec<usize> {
    let indices = matching_indices(table.time_column(), |t| range.contains(t));
    tracing::trace!(
        start = range.start(),
        end = range.end(),
        selected = indices.len(),
        "time range selected"
    );
    indices
}

/// Select rows by a validated time range
pub fn select_range(table: &TimeSeriesTable, range: &TimeRange) -> TimeSelection {
    let indices = range_indices(table, range);
    let time = table.time_column().select(Axis(0), &indices);
    let samples = table.samples().select(Axis(1), &indices);

    TimeSelection {
        indices,
        time,
        samples,
    }
}

/// Time and raw samples of a single channel inside a range
///
/// Uses the same row indices as [`select_range`], without copying the other
/// channels.
pub fn select_channel_range(
    table: &TimeSeriesTable,
    channel: usize,
    range: &TimeRange,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let raw = table.channel(channel)?;
    let indices = range_indices(table, range);
    Ok((
        table.time_column().select(Axis(0), &indices),
        raw.select(Axis(0), &indices),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TimeSeriesTable {
        let time: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..10).map(|i| -(i as f64)).collect();
        TimeSeriesTable::from_columns(time, vec![a, b], None).unwrap()
    }

    #[test]
    fn test_inclusive_bounds() {
        let sel = select_by_time(&table(), 1.0, 2.5).unwrap();
        assert_eq!(sel.indices, vec![2, 3, 4, 5]);
        assert_eq!(sel.time.to_vec(), vec![1.0, 1.5, 2.0, 2.5]);
        assert_eq!(sel.channel(0).unwrap().to_vec(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sel.channel(1).unwrap().to_vec(), vec![-2.0, -3.0, -4.0, -5.0]);
    }

    #[test]
    fn test_selection_is_sound_and_complete() {
        let t = table();
        let (a, b) = (0.7, 3.2);
        let sel = select_by_time(&t, a, b).unwrap();
        let time = t.time_column();
        for i in 0..t.len() {
            let inside = time[i] >= a && time[i] <= b;
            assert_eq!(sel.indices.contains(&i), inside);
        }
    }

    #[test]
    fn test_inverted_range_fails() {
        let err = select_by_time(&table(), 3.0, 1.0).unwrap_err();
        assert_eq!(err, AnalysisError::InvalidRange { start: 3.0, end: 1.0 });
        assert!(FrequencyRange::new(10.0, 5.0).is_err());
        assert!(TimeRange::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_out_of_span_is_empty() {
        let sel = select_by_time(&table(), 100.0, 200.0).unwrap();
        assert!(sel.is_empty());
        assert_eq!(sel.samples.dim(), (2, 0));
    }

    #[test]
    fn test_point_range() {
        let sel = select_by_time(&table(), 2.0, 2.0).unwrap();
        assert_eq!(sel.indices, vec![4]);
    }

    #[test]
    fn test_single_channel_matches_full_selection() {
        let t = table();
        let range = TimeRange::new(0.7, 3.2).unwrap();
        let full = select_range(&t, &range);
        let (time, raw) = select_channel_range(&t, 1, &range).unwrap();
        assert_eq!(time, full.time);
        assert_eq!(raw.view(), full.channel(1).unwrap());
        assert!(select_channel_range(&t, 2, &range).is_err());
    }

    #[test]
    fn test_channel_out_of_range() {
        let sel = select_by_time(&table(), 0.0, 1.0).unwrap();
        assert!(matches!(
            sel.channel(5),
            Err(AnalysisError::IndexOutOfRange { index: 5, count: 2 })
        ));
    }
}
