use serde::{Deserialize, Serialize};

use super::extrema::{find_peaks, find_troughs, PlateauPolicy};
use super::filter::{filter_peaks, filter_troughs, ExtremePoint};
use super::pchip::MonotoneCubic;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Knobs for a single envelope analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Minimum index separation between accepted extrema of one polarity.
    pub min_peak_distance: usize,
    pub plateaus: PlateauPolicy,
    /// Build the upper and lower envelopes on separate rayon tasks.
    pub parallel: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            min_peak_distance: 50,
            plateaus: PlateauPolicy::Strict,
            parallel: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope – upper, lower and mean sampled at the trace times
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub mean: Vec<f64>,
}

impl Envelope {
    /// Evaluate both interpolants at every time and average them.
    pub fn combine(times: &[f64], upper: &MonotoneCubic, lower: &MonotoneCubic) -> Self {
        Self::from_bounds(upper.evaluate_many(times), lower.evaluate_many(times))
    }

    /// [`Envelope::combine`] with the two evaluations on separate rayon tasks.
    pub fn combine_par(times: &[f64], upper: &MonotoneCubic, lower: &MonotoneCubic) -> Self {
        let (upper, lower) = rayon::join(|| upper.evaluate_many(times), || lower.evaluate_many(times));
        Self::from_bounds(upper, lower)
    }

    fn from_bounds(upper: Vec<f64>, lower: Vec<f64>) -> Self {
        let mean = upper
            .iter()
            .zip(&lower)
            .map(|(u, l)| (u + l) / 2.0)
            .collect();
        Self { upper, lower, mean }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EnvelopeAnalysis – everything handed to the exporters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeAnalysis {
    /// Accepted local maxima (ascending sample indices).
    pub peaks: Vec<usize>,
    /// Accepted local minima (ascending sample indices).
    pub troughs: Vec<usize>,
    pub envelope: Envelope,
    pub filtered_peaks: Vec<ExtremePoint>,
    pub filtered_troughs: Vec<ExtremePoint>,
}

impl EnvelopeAnalysis {
    pub fn mean_envelope(&self) -> &[f64] {
        &self.envelope.mean
    }
}

// ---------------------------------------------------------------------------
// Entry-point
// ---------------------------------------------------------------------------

/// Detect extrema, interpolate both envelopes, average them and keep the
/// extrema that still lie outside the mean.
///
/// Fails with [`AnalysisError::InsufficientExtrema`] when either polarity has
/// fewer than two accepted extrema; nothing else is produced in that case.
pub fn analyze_envelope(
    times: &[f64],
    values: &[f64],
    config: &EnvelopeConfig,
) -> Result<EnvelopeAnalysis, AnalysisError> {
    validate(times, values, config)?;

    let distance = config.min_peak_distance;
    let peaks = find_peaks(values, distance, config.plateaus);
    let troughs = find_troughs(values, distance, config.plateaus);

    if peaks.len() < 2 || troughs.len() < 2 {
        return Err(AnalysisError::InsufficientExtrema {
            peaks: peaks.len(),
            troughs: troughs.len(),
        });
    }

    let (upper, lower) = if config.parallel {
        rayon::join(
            || interpolant(times, values, &peaks),
            || interpolant(times, values, &troughs),
        )
    } else {
        (
            interpolant(times, values, &peaks),
            interpolant(times, values, &troughs),
        )
    };
    let (upper, lower) = (upper?, lower?);
    let envelope = if config.parallel {
        Envelope::combine_par(times, &upper, &lower)
    } else {
        Envelope::combine(times, &upper, &lower)
    };

    let filtered_peaks = filter_peaks(&peaks, times, values, &envelope.mean);
    let filtered_troughs = filter_troughs(&troughs, times, values, &envelope.mean);

    log::info!(
        "envelope analysis: {} samples, {}/{} peaks and {}/{} troughs kept",
        times.len(),
        filtered_peaks.len(),
        peaks.len(),
        filtered_troughs.len(),
        troughs.len()
    );

    Ok(EnvelopeAnalysis {
        peaks,
        troughs,
        envelope,
        filtered_peaks,
        filtered_troughs,
    })
}

/// PCHIP through the samples at `indices`.
fn interpolant(times: &[f64], values: &[f64], indices: &[usize]) -> Result<MonotoneCubic, AnalysisError> {
    let x: Vec<f64> = indices.iter().map(|&i| times[i]).collect();
    let y: Vec<f64> = indices.iter().map(|&i| values[i]).collect();
    MonotoneCubic::new(&x, &y)
}

fn validate(times: &[f64], values: &[f64], config: &EnvelopeConfig) -> Result<(), AnalysisError> {
    if config.min_peak_distance < 1 {
        return Err(AnalysisError::InvalidDistance(config.min_peak_distance));
    }
    if times.len() != values.len() {
        return Err(AnalysisError::LengthMismatch {
            what: "torque values",
            expected: times.len(),
            actual: values.len(),
        });
    }
    if let Some(i) = times.iter().position(|t| !t.is_finite()) {
        return Err(AnalysisError::NotStrictlyIncreasing {
            what: "sample times",
            index: i,
        });
    }
    if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(AnalysisError::NotStrictlyIncreasing {
            what: "sample times",
            index: i + 1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sawtooth(n: usize, period: usize) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * 2.0).collect();
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let phase = (i % period) as f64 / period as f64;
                if phase < 0.5 {
                    phase
                } else {
                    1.0 - phase
                }
            })
            .collect();
        (times, values)
    }

    #[test]
    fn test_mean_is_exact_average() {
        let (times, values) = sawtooth(200, 20);
        let config = EnvelopeConfig {
            min_peak_distance: 5,
            ..Default::default()
        };
        let result = analyze_envelope(&times, &values, &config).unwrap();
        let env = &result.envelope;
        assert_eq!(env.len(), times.len());
        for i in 0..env.len() {
            assert_eq!(env.mean[i], (env.upper[i] + env.lower[i]) / 2.0);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (times, values) = sawtooth(300, 16);
        let parallel = EnvelopeConfig {
            min_peak_distance: 4,
            ..Default::default()
        };
        let sequential = EnvelopeConfig {
            parallel: false,
            ..parallel.clone()
        };
        assert_eq!(
            analyze_envelope(&times, &values, &parallel).unwrap(),
            analyze_envelope(&times, &values, &sequential).unwrap()
        );
    }

    #[test]
    fn test_combine_uses_both_interpolants() {
        let upper = MonotoneCubic::new(&[0.0, 10.0], &[2.0, 2.0]).unwrap();
        let lower = MonotoneCubic::new(&[0.0, 10.0], &[-1.0, 0.0]).unwrap();
        let env = Envelope::combine(&[0.0, 5.0, 10.0], &upper, &lower);
        assert_eq!(env.upper, vec![2.0, 2.0, 2.0]);
        assert_eq!(env.lower, vec![-1.0, -0.5, 0.0]);
        assert_eq!(env.mean, vec![0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_envelope_is_combined_from_detected_extrema() {
        let (times, values) = sawtooth(240, 24);
        for parallel in [true, false] {
            let config = EnvelopeConfig {
                min_peak_distance: 6,
                parallel,
                ..Default::default()
            };
            let result = analyze_envelope(&times, &values, &config).unwrap();
            let upper = interpolant(&times, &values, &result.peaks).unwrap();
            let lower = interpolant(&times, &values, &result.troughs).unwrap();
            assert_eq!(result.envelope, Envelope::combine(&times, &upper, &lower));
            assert_eq!(result.envelope, Envelope::combine_par(&times, &upper, &lower));
        }
    }

    #[test]
    fn test_insufficient_extrema() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let values = [0.0, 1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let err = analyze_envelope(&times, &values, &EnvelopeConfig::default()).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientExtrema { peaks: 1, troughs: 1 });
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let config = EnvelopeConfig::default();
        assert!(matches!(
            analyze_envelope(&[0.0, 1.0], &[0.0], &config),
            Err(AnalysisError::LengthMismatch { .. })
        ));
        assert_eq!(
            analyze_envelope(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], &config),
            Err(AnalysisError::NotStrictlyIncreasing {
                what: "sample times",
                index: 2
            })
        );
        let zero = EnvelopeConfig {
            min_peak_distance: 0,
            ..Default::default()
        };
        assert_eq!(
            analyze_envelope(&[0.0], &[0.0], &zero),
            Err(AnalysisError::InvalidDistance(0))
        );
    }
}
