use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ExtremePoint – one surviving extremum
// ---------------------------------------------------------------------------

/// A detected extremum that lies on the outward side of the mean envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremePoint {
    /// Sample index into the original trace.
    pub index: usize,
    pub time_ms: f64,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Filtering against the mean envelope
// ---------------------------------------------------------------------------

/// Keep the peaks whose value is strictly above the mean envelope.
pub fn filter_peaks(
    peaks: &[usize],
    times: &[f64],
    values: &[f64],
    mean: &[f64],
) -> Vec<ExtremePoint> {
    retain_extrema(peaks, times, values, |i| values[i] > mean[i])
}

/// Keep the troughs whose value is strictly below the mean envelope.
pub fn filter_troughs(
    troughs: &[usize],
    times: &[f64],
    values: &[f64],
    mean: &[f64],
) -> Vec<ExtremePoint> {
    retain_extrema(troughs, times, values, |i| values[i] < mean[i])
}

/// `indices` must be ascending; the output keeps that order.
fn retain_extrema(
    indices: &[usize],
    times: &[f64],
    values: &[f64],
    keep: impl Fn(usize) -> bool,
) -> Vec<ExtremePoint> {
    indices
        .iter()
        .copied()
        .filter(|&i| keep(i))
        .map(|i| ExtremePoint {
            index: i,
            time_ms: times[i],
            value: values[i],
        })
        .collect()
}
