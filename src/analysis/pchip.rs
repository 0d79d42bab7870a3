//! Shape-preserving piecewise cubic Hermite interpolation (PCHIP).
//!
//! Derivatives at the knots follow Fritsch–Carlson: zero where the data turns
//! (or is flat), a weighted harmonic mean of the neighbouring secants
//! elsewhere, and a clamped one-sided three-point estimate at both ends.
//! Each interval is then the cubic Hermite polynomial
//!
//! ```text
//! p(x) = h00(t)*y0 + h10(t)*h*d0 + h01(t)*y1 + h11(t)*h*d1,   t = (x - x0) / h
//! ```
//!
//! which never leaves `[min(y0, y1), max(y0, y1)]` on an interval where the
//! data is monotone.

use crate::error::AnalysisError;

/// A PCHIP interpolant over strictly increasing knots.
#[derive(Debug, Clone)]
pub struct MonotoneCubic {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl MonotoneCubic {
    /// Build the interpolant through `(x[j], y[j])`.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, AnalysisError> {
        if x.len() != y.len() {
            return Err(AnalysisError::LengthMismatch {
                what: "control values",
                expected: x.len(),
                actual: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(AnalysisError::InsufficientPoints {
                required: 2,
                actual: x.len(),
            });
        }
        if let Some(index) = first_non_increasing(x) {
            return Err(AnalysisError::NotStrictlyIncreasing {
                what: "control points",
                index,
            });
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes: knot_slopes(x, y),
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.x
    }

    pub fn values(&self) -> &[f64] {
        &self.y
    }

    /// Derivative assigned to each knot.
    pub fn slopes(&self) -> &[f64] {
        &self.slopes
    }

    /// Evaluate at `xi`; outside the knot range the boundary cubic is extended.
    pub fn evaluate(&self, xi: f64) -> f64 {
        let j = self.interval(xi);
        let h = self.x[j + 1] - self.x[j];
        let t = (xi - self.x[j]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.y[j] + h10 * h * self.slopes[j] + h01 * self.y[j + 1] + h11 * h * self.slopes[j + 1]
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&xi| self.evaluate(xi)).collect()
    }

    /// First derivative at `xi`, extrapolated like [`MonotoneCubic::evaluate`].
    pub fn derivative(&self, xi: f64) -> f64 {
        let j = self.interval(xi);
        let h = self.x[j + 1] - self.x[j];
        let t = (xi - self.x[j]) / h;
        let t2 = t * t;

        let dh00 = (6.0 * t2 - 6.0 * t) / h;
        let dh10 = 3.0 * t2 - 4.0 * t + 1.0;
        let dh01 = (-6.0 * t2 + 6.0 * t) / h;
        let dh11 = 3.0 * t2 - 2.0 * t;

        dh00 * self.y[j] + dh10 * self.slopes[j] + dh01 * self.y[j + 1] + dh11 * self.slopes[j + 1]
    }

    /// Index `j` of the interval `[x[j], x[j+1]]` used for `xi`, clamped to
    /// the first/last interval outside the domain.
    fn interval(&self, xi: f64) -> usize {
        let last = self.x.len() - 2;
        self.x.partition_point(|&k| k <= xi).saturating_sub(1).min(last)
    }
}

fn first_non_increasing(x: &[f64]) -> Option<usize> {
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Some(i);
    }
    x.windows(2).position(|w| w[1] <= w[0]).map(|i| i + 1)
}

/// Sign as -1, 0 or 1 (zero stays zero, unlike `f64::signum`).
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn knot_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let m = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let secants: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, &hj)| (w[1] - w[0]) / hj)
        .collect();

    if m == 2 {
        return vec![secants[0]; 2];
    }

    let mut d = vec![0.0; m];
    for j in 1..m - 1 {
        let (s0, s1) = (secants[j - 1], secants[j]);
        if sign(s0) * sign(s1) <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[j] + h[j - 1];
        let w2 = h[j] + 2.0 * h[j - 1];
        d[j] = (w1 + w2) / (w1 / s0 + w2 / s1);
    }

    d[0] = endpoint_slope(h[0], h[1], secants[0], secants[1]);
    d[m - 1] = endpoint_slope(h[m - 2], h[m - 3], secants[m - 2], secants[m - 3]);
    d
}

/// One-sided three-point derivative at a boundary knot. `h0`/`s0` belong to
/// the interval touching the boundary, `h1`/`s1` to its neighbour.
fn endpoint_slope(h0: f64, h1: f64, s0: f64, s1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * s0 - h0 * s1) / (h0 + h1);
    if sign(d) != sign(s0) {
        0.0
    } else if d.abs() > 3.0 * s0.abs() {
        3.0 * s0
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol * b.abs().max(1.0), "{a} vs {b}");
    }

    #[test]
    fn test_rejects_single_point() {
        let err = MonotoneCubic::new(&[1.0], &[2.0]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientPoints {
                required: 2,
                actual: 1
            }
        );
        assert!(matches!(
            MonotoneCubic::new(&[], &[]),
            Err(AnalysisError::InsufficientPoints { actual: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_knots() {
        let err = MonotoneCubic::new(&[0.0, 2.0, 2.0], &[0.0, 1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NotStrictlyIncreasing {
                what: "control points",
                index: 2
            }
        );
        assert!(MonotoneCubic::new(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(matches!(
            MonotoneCubic::new(&[0.0, 1.0, 2.0], &[0.0, 1.0]),
            Err(AnalysisError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_two_points_is_linear() {
        let f = MonotoneCubic::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert_eq!(f.knots(), &[0.0, 2.0]);
        assert_eq!(f.values(), &[1.0, 5.0]);
        assert_eq!(f.slopes(), &[2.0, 2.0]);
        assert_close(f.evaluate(0.5), 2.0, 1e-12);
        assert_close(f.evaluate(3.0), 7.0, 1e-12);
    }

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 0.3, 1.1, 2.0, 2.2, 4.7, 5.0];
        let y = [1.0, -2.0, 0.5, 0.5, 3.0, -1.0, 10.0];
        let f = MonotoneCubic::new(&x, &y).unwrap();
        for (&xj, &yj) in x.iter().zip(&y) {
            assert_close(f.evaluate(xj), yj, 1e-9);
        }
    }

    #[test]
    fn test_no_overshoot_between_knots() {
        let x = [0.0, 1.0, 1.5, 4.0, 4.2, 7.0, 9.0, 9.1];
        let y = [0.0, 3.0, 3.2, -1.0, 5.0, 5.0, 4.0, 100.0];
        let f = MonotoneCubic::new(&x, &y).unwrap();
        for j in 0..x.len() - 1 {
            let lo = y[j].min(y[j + 1]);
            let hi = y[j].max(y[j + 1]);
            for k in 0..=100 {
                let xi = x[j] + (x[j + 1] - x[j]) * k as f64 / 100.0;
                let v = f.evaluate(xi);
                assert!(v >= lo - 1e-12 && v <= hi + 1e-12, "interval {j}: f({xi}) = {v}");
            }
        }
    }

    #[test]
    fn test_plateau_forces_zero_interior_slopes() {
        let f = MonotoneCubic::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(f.slopes()[1], 0.0);
        assert_eq!(f.slopes()[2], 0.0);
        let mid = f.evaluate(1.5);
        assert!((0.0..=1.0).contains(&mid));
        assert_close(mid, 1.0, 1e-12);
    }

    #[test]
    fn test_harmonic_mean_slope() {
        // Equal spacing: d = 2 / (1/s0 + 1/s1).
        let f = MonotoneCubic::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
        assert_close(f.slopes()[1], 2.0 / (1.0 / 1.0 + 1.0 / 3.0), 1e-12);
    }

    #[test]
    fn test_endpoint_slope_sign_and_clamp() {
        // Estimate (3*1 - 1*5)/2 = -1 has the wrong sign: zeroed.
        assert_eq!(endpoint_slope(1.0, 1.0, 1.0, 5.0), 0.0);
        // Estimate (3*1 - 1*(-5))/2 = 4 exceeds 3*|s0|: clamped.
        assert_eq!(endpoint_slope(1.0, 1.0, 1.0, -5.0), 3.0);
        // Ordinary case.
        assert_close(endpoint_slope(1.0, 1.0, 2.0, 1.0), 2.5, 1e-12);
    }

    #[test]
    fn test_extrapolation_continues_boundary_cubic() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 2.0, 3.0, 3.5];
        let f = MonotoneCubic::new(&x, &y).unwrap();
        let beyond = f.evaluate(3.5);
        assert!(beyond.is_finite());

        // Continuity at the last knot from both sides.
        let eps = 1e-7;
        assert_close(f.evaluate(3.0 + eps), f.evaluate(3.0 - eps), 1e-5);
        assert_close(f.derivative(3.0 + eps), f.derivative(3.0 - eps), 1e-4);
        assert!(f.evaluate(-0.5).is_finite());
    }

    #[test]
    fn test_derivative_matches_slopes_at_knots() {
        let x = [0.0, 1.0, 3.0, 4.0];
        let y = [1.0, 2.0, 2.5, 5.0];
        let f = MonotoneCubic::new(&x, &y).unwrap();
        for (j, &xj) in x.iter().enumerate() {
            assert_close(f.derivative(xj), f.slopes()[j], 1e-9);
        }
    }
}
