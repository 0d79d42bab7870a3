use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Plateau handling
// ---------------------------------------------------------------------------

/// How flat runs of equal samples are treated during candidate generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateauPolicy {
    /// Only strict local maxima (`v[i-1] < v[i] > v[i+1]`) are candidates.
    #[default]
    Strict,
    /// A flat top bounded by lower samples on both sides yields one
    /// candidate at the middle of the run (rounded down).
    Midpoint,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Indices of local maxima that are at least `min_distance` samples apart.
///
/// Candidates are ranked by value (ties: lower index first) and accepted
/// greedily; a candidate closer than `min_distance` to an accepted index is
/// dropped for good. The result is sorted ascending.
pub fn find_peaks(values: &[f64], min_distance: usize, plateaus: PlateauPolicy) -> Vec<usize> {
    let candidates = local_maxima(values, plateaus);
    let accepted = suppress_by_distance(&candidates, values, min_distance);
    log::debug!(
        "peak detection: {} candidates, {} accepted (distance {min_distance})",
        candidates.len(),
        accepted.len()
    );
    accepted
}

/// Indices of local minima; the peak search run on the negated signal.
pub fn find_troughs(values: &[f64], min_distance: usize, plateaus: PlateauPolicy) -> Vec<usize> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, min_distance, plateaus)
}

// ---------------------------------------------------------------------------
// Candidate generation
// ---------------------------------------------------------------------------

fn local_maxima(values: &[f64], plateaus: PlateauPolicy) -> Vec<usize> {
    let n = values.len();
    if n < 3 {
        return Vec::new();
    }

    match plateaus {
        PlateauPolicy::Strict => (1..n - 1)
            .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
            .collect(),
        PlateauPolicy::Midpoint => {
            let mut found = Vec::new();
            let mut i = 1;
            while i < n - 1 {
                if values[i - 1] < values[i] {
                    // Walk to the end of a possible plateau.
                    let mut ahead = i + 1;
                    while ahead < n - 1 && values[ahead] == values[i] {
                        ahead += 1;
                    }
                    if values[ahead] < values[i] {
                        found.push((i + ahead - 1) / 2);
                        i = ahead;
                    }
                }
                i += 1;
            }
            found
        }
    }
}

// ---------------------------------------------------------------------------
// Distance suppression
// ---------------------------------------------------------------------------

/// Greedy suppression over `candidates` (ascending indices into `values`).
fn suppress_by_distance(candidates: &[usize], values: &[f64], min_distance: usize) -> Vec<usize> {
    if candidates.is_empty() || min_distance <= 1 {
        // Distinct candidates are always at least one sample apart.
        return candidates.to_vec();
    }

    // Positions into `candidates`, highest priority first.
    let mut priority: Vec<usize> = (0..candidates.len()).collect();
    priority.sort_by(|&a, &b| {
        values[candidates[b]]
            .partial_cmp(&values[candidates[a]])
            .unwrap_or(Ordering::Equal)
            .then(candidates[a].cmp(&candidates[b]))
    });

    let mut keep = vec![true; candidates.len()];
    for &pos in &priority {
        if !keep[pos] {
            continue;
        }
        let here = candidates[pos];

        // `candidates` is sorted, so neighbours within range are contiguous.
        let mut left = pos;
        while left > 0 && here - candidates[left - 1] < min_distance {
            left -= 1;
            keep[left] = false;
        }
        let mut right = pos + 1;
        while right < candidates.len() && candidates[right] - here < min_distance {
            keep[right] = false;
            right += 1;
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&idx, kept)| kept.then_some(idx))
        .collect()
}
