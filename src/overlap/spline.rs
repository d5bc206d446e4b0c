//! Akima spline interpolation.

use crate::error::{OverlapError, Result};

/// Piecewise-cubic Akima interpolant through `(x_i, y_i)` with strictly
/// increasing `x`. Robust against overshoot near outliers, which makes it a
/// good fit for noisy overlap averages. Needs at least five points.
#[derive(Clone, Debug)]
pub struct AkimaSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Slope at each knot.
    t: Vec<f64>,
}

impl AkimaSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if y.len() != n {
            return Err(OverlapError::DimensionMismatch {
                expected: n,
                found: y.len(),
                context: "spline input",
            });
        }
        if n < 5 {
            return Err(OverlapError::InvalidParameter(format!(
                "Akima spline needs at least 5 points, got {}",
                n
            )));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(OverlapError::InvalidParameter("spline abscissae must increase".into()));
        }

        // segment slopes with two extrapolated slopes on either end:
        // m[k + 2] is the slope of segment k
        let mut m = vec![0.0; n + 3];
        for k in 0..n - 1 {
            m[k + 2] = (y[k + 1] - y[k]) / (x[k + 1] - x[k]);
        }
        m[1] = 2.0 * m[2] - m[3];
        m[0] = 2.0 * m[1] - m[2];
        m[n + 1] = 2.0 * m[n] - m[n - 1];
        m[n + 2] = 2.0 * m[n + 1] - m[n];

        let t = (0..n)
            .map(|i| {
                let w1 = (m[i + 3] - m[i + 2]).abs();
                let w2 = (m[i + 1] - m[i]).abs();
                if w1 + w2 == 0.0 {
                    0.5 * (m[i + 1] + m[i + 2])
                } else {
                    (w1 * m[i + 1] + w2 * m[i + 2]) / (w1 + w2)
                }
            })
            .collect();

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            t,
        })
    }

    /// Evaluate at `xv`; outside the knots the end segments are extended.
    pub fn interpolate(&self, xv: f64) -> f64 {
        let n = self.x.len();
        let k = match self.x.iter().position(|&xi| xi > xv) {
            Some(0) => 0,
            Some(p) => p - 1,
            None => n - 2,
        }
        .min(n - 2);
        let h = self.x[k + 1] - self.x[k];
        let m = (self.y[k + 1] - self.y[k]) / h;
        let (t0, t1) = (self.t[k], self.t[k + 1]);
        let c2 = (3.0 * m - 2.0 * t0 - t1) / h;
        let c3 = (t0 + t1 - 2.0 * m) / (h * h);
        let dx = xv - self.x[k];
        self.y[k] + dx * (t0 + dx * (c2 + dx * c3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 1.0, 2.5, 3.0, 4.0, 6.0];
        let y = [1.0, -2.0, 0.5, 0.7, 3.0, 2.0];
        let s = AkimaSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(s.interpolate(*xi), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reproduces_lines() {
        let x: Vec<f64> = (0..7).map(|i| -3.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.5 - 2.0 * v).collect();
        let s = AkimaSpline::new(&x, &y).unwrap();
        for v in [-2.7, -0.1, 0.0, 1.3, 2.99, 3.5] {
            assert_relative_eq!(s.interpolate(v), 0.5 - 2.0 * v, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_no_overshoot_at_step() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let s = AkimaSpline::new(&x, &y).unwrap();
        for k in 0..50 {
            let v = s.interpolate(k as f64 * 0.1);
            assert!(v >= -1e-12 && v <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(AkimaSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(AkimaSpline::new(&[0.0, 1.0, 1.0, 2.0, 3.0], &[0.0; 5]).is_err());
        assert!(AkimaSpline::new(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0.0; 4]).is_err());
    }
}
