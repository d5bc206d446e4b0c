//! Combines the reference and target accumulators into the ratio estimate.

use serde::Serialize;
use tracing::debug;

use super::accumulator::OverlapAccumulator;
use super::spline::AkimaSpline;
use crate::error::{OverlapError, Result};

/// Averages and errors of the two systems at one overlap parameter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct FullResult {
    pub ref_avg: f64,
    pub ref_err: f64,
    pub target_avg: f64,
    pub target_err: f64,
}

/// Read-only view over both accumulators.
///
/// With `r(α_i) = ⟨o_i⟩_ref / ⟨o_i⟩_tar` (an estimate of `Z_tar/Z_ref` at any
/// α), the optimal overlap parameter is the fixed point `r(α) = α`.
#[derive(Clone, Copy, Debug)]
pub struct RatioEstimator<'a> {
    reference: &'a OverlapAccumulator,
    target: &'a OverlapAccumulator,
    ignore_reference_average: bool,
}

impl<'a> RatioEstimator<'a> {
    pub fn new(reference: &'a OverlapAccumulator, target: &'a OverlapAccumulator) -> Result<Self> {
        if reference.candidates() != target.candidates() {
            return Err(OverlapError::InvalidParameter(
                "reference and target use different overlap candidates".into(),
            ));
        }
        Ok(Self {
            reference,
            target,
            ignore_reference_average: false,
        })
    }

    /// Leave the reference value out of the effort balance; useful when the
    /// reference average is known to high precision anyway.
    pub fn ignoring_reference_average(mut self, ignore: bool) -> Self {
        self.ignore_reference_average = ignore;
        self
    }

    pub fn reference(&self) -> &'a OverlapAccumulator {
        self.reference
    }

    pub fn target(&self) -> &'a OverlapAccumulator {
        self.target
    }

    pub fn num_alpha(&self) -> usize {
        self.reference.num_alpha()
    }

    fn alpha(&self, i: usize) -> f64 {
        self.reference.candidates().alpha(i)
    }

    /// `r(α_i)`.
    pub fn overlap_average_at(&self, i: usize) -> f64 {
        self.reference.overlap_average(i) / self.target.overlap_average(i)
    }

    /// Index of the candidate whose measured overlap ratio is closest to the
    /// candidate itself, `argmin_i |ln r(α_i) − ln α_i|`.
    pub fn min_diff_location(&self) -> usize {
        let mut best = 0;
        let mut min_diff = f64::INFINITY;
        for i in 0..self.num_alpha() {
            let ratio = self.overlap_average_at(i);
            let bias = self.alpha(i);
            // ratio/bias + bias/ratio - 2 is monotonic in |ln(ratio/bias)|
            let diff = ratio / bias + bias / ratio - 2.0;
            if diff < min_diff {
                min_diff = diff;
                best = i;
            }
        }
        best
    }

    /// Whether the best candidate sits on the edge of the grid, meaning the
    /// grid should be re-centered.
    pub fn is_at_boundary(&self) -> bool {
        self.reference.candidates().is_boundary(self.min_diff_location())
    }

    /// Interpolated optimal overlap parameter α*.
    ///
    /// Solves `ln r(α) − ln α = 0` in `ln α`: Akima spline plus bisection for
    /// more than four candidates, linear interpolation otherwise. When the root
    /// lies outside the grid the nearest end candidate is returned.
    pub fn overlap_average(&self) -> f64 {
        let n = self.num_alpha();
        if n == 1 {
            return self.overlap_average_at(0);
        }
        let ln_alpha: Vec<f64> = (0..n).map(|i| self.alpha(i).ln()).collect();
        let diff: Vec<f64> = (0..n)
            .map(|i| self.overlap_average_at(i).ln() - ln_alpha[i])
            .collect();

        if diff[0] < 0.0 {
            return self.alpha(0);
        }
        if diff[n - 1] > 0.0 {
            return self.alpha(n - 1);
        }
        if diff.iter().any(|d| d.is_nan()) {
            return f64::NAN;
        }

        if n > 4 {
            if let Ok(spline) = AkimaSpline::new(&ln_alpha, &diff) {
                return bisect_root(&spline, ln_alpha[0], ln_alpha[n - 1], diff[0]).exp();
            }
        }
        for i in 0..n - 1 {
            if diff[i] == 0.0 {
                return self.alpha(i);
            }
            if diff[i] > 0.0 && diff[i + 1] <= 0.0 {
                let x = ln_alpha[i] + (ln_alpha[i + 1] - ln_alpha[i]) / (diff[i + 1] - diff[i]) * -diff[i];
                return x.exp();
            }
        }
        self.alpha(n - 1)
    }

    /// Overlap averages and errors of both systems, interpolated to `alpha`.
    pub fn full_overlap_result_for_alpha(&self, alpha: f64) -> FullResult {
        let n = self.num_alpha();
        let ref_avg: Vec<f64> = (0..n).map(|i| self.reference.overlap_average(i)).collect();
        let ref_err: Vec<f64> = (0..n).map(|i| self.reference.overlap_error(i)).collect();
        let target_avg: Vec<f64> = (0..n).map(|i| self.target.overlap_average(i)).collect();
        let target_err: Vec<f64> = (0..n).map(|i| self.target.overlap_error(i)).collect();
        self.interpolate_result(alpha, [&ref_avg, &ref_err, &target_avg, &target_err])
    }

    /// Value-to-overlap ratios (and their covariance-aware errors) of both
    /// systems at `alpha`. `target_index` picks the target value (0 is the
    /// primary value, 1.. the extras).
    pub fn full_ratio_result_for_alpha(&self, alpha: f64, target_index: usize) -> FullResult {
        let n = self.num_alpha();
        let ref_avg: Vec<f64> = (0..n).map(|i| self.reference.value_over_overlap(0, i)).collect();
        let ref_err: Vec<f64> = (0..n).map(|i| self.reference.value_over_overlap_error(0, i)).collect();
        let target_avg: Vec<f64> = (0..n)
            .map(|i| self.target.value_over_overlap(target_index, i))
            .collect();
        let target_err: Vec<f64> = (0..n)
            .map(|i| self.target.value_over_overlap_error(target_index, i))
            .collect();
        self.interpolate_result(alpha, [&ref_avg, &ref_err, &target_avg, &target_err])
    }

    fn interpolate_result(&self, alpha: f64, series: [&[f64]; 4]) -> FullResult {
        let n = self.num_alpha();
        let values = if n == 1 {
            series.map(|s| s[0])
        } else {
            let ln_alpha: Vec<f64> = (0..n).map(|i| self.alpha(i).ln()).collect();
            let x = alpha.ln();
            series.map(|s| interpolate_series(&ln_alpha, s, x))
        };
        FullResult {
            ref_avg: values[0],
            ref_err: values[1],
            target_avg: values[2],
            target_err: values[3],
        }
    }

    /// `r(α)` and its error at an arbitrary `alpha`.
    pub fn overlap_average_and_error_for_alpha(&self, alpha: f64) -> (f64, f64) {
        let r = self.full_overlap_result_for_alpha(alpha);
        let avg = r.ref_avg / r.target_avg;
        let ref_rel = r.ref_err / r.ref_avg;
        let target_rel = r.target_err / r.target_avg;
        (avg, avg.abs() * (ref_rel * ref_rel + target_rel * target_rel).sqrt())
    }

    /// Target-to-reference integral ratio and its error at α*.
    ///
    /// The reference and target chains are independent, so their relative
    /// errors add in quadrature; each one already carries the covariance
    /// between value and overlap channels of its own system.
    pub fn average_and_error(&self, target_index: usize) -> Result<(f64, f64)> {
        if target_index >= self.target.num_values() {
            return Err(OverlapError::DimensionMismatch {
                expected: self.target.num_values(),
                found: target_index + 1,
                context: "target value index",
            });
        }
        let alpha = self.overlap_average();
        let r = self.full_ratio_result_for_alpha(alpha, target_index);
        let avg = r.target_avg / r.ref_avg;
        let ref_rel = r.ref_err / r.ref_avg;
        let target_rel = r.target_err / r.target_avg;
        Ok((avg, avg.abs() * (ref_rel * ref_rel + target_rel * target_rel).sqrt()))
    }

    /// Reference share of effort that balances both systems' contributions to
    /// the final variance, given that `old_fraction` produced the current
    /// errors. Relative errors are capped at 1.
    pub fn ideal_ref_fraction(&self, old_fraction: f64) -> f64 {
        let alpha = self.overlap_average();
        let ratio = self.full_ratio_result_for_alpha(alpha, 0);

        let mut ref_rel = if self.ignore_reference_average {
            let overlap = self.full_overlap_result_for_alpha(alpha);
            (overlap.ref_err / overlap.ref_avg).abs()
        } else {
            (ratio.ref_err / ratio.ref_avg).abs()
        };
        if ref_rel.is_nan() || ref_rel > 1.0 {
            ref_rel = 1.0;
        }
        let mut target_rel = (ratio.target_err / ratio.target_avg).abs();
        if target_rel.is_nan() || target_rel > 1.0 {
            target_rel = 1.0;
        }
        let fraction = 1.0 / (1.0 + target_rel / ref_rel * ((1.0 - old_fraction) / old_fraction).sqrt());
        debug!(ref_rel, target_rel, fraction, "ideal reference fraction");
        if fraction.is_finite() && fraction > 0.0 && fraction < 1.0 {
            fraction
        } else {
            old_fraction
        }
    }
}

fn interpolate_series(x: &[f64], y: &[f64], xv: f64) -> f64 {
    let n = x.len();
    if n > 4 {
        if let Ok(spline) = AkimaSpline::new(x, y) {
            return spline.interpolate(xv);
        }
    }
    let k = match x.iter().position(|&xi| xi > xv) {
        Some(0) => 0,
        Some(p) => p - 1,
        None => n - 2,
    }
    .min(n - 2);
    let fac = (xv - x[k]) / (x[k + 1] - x[k]);
    y[k] + (y[k + 1] - y[k]) * fac
}

/// Root of a function that is positive at `lo` and non-positive at `hi`.
fn bisect_root(spline: &AkimaSpline, mut lo: f64, mut hi: f64, mut y_lo: f64) -> f64 {
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let y = spline.interpolate(mid);
        if y == 0.0 || hi - lo < 1e-14 * (1.0 + mid.abs()) {
            return mid;
        }
        if y * y_lo > 0.0 {
            lo = mid;
            y_lo = y;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::{OverlapCandidates, SystemRole};
    use approx::assert_relative_eq;

    /// Feed both accumulators constant weights: reference w = 1, target w = c
    /// on the same configuration space, values equal to the weights.
    fn constant_pair(c: f64, candidates: OverlapCandidates, samples: usize) -> (OverlapAccumulator, OverlapAccumulator) {
        let mut reference = OverlapAccumulator::new(SystemRole::Reference, 0, candidates.clone(), 10).unwrap();
        let mut target = OverlapAccumulator::new(SystemRole::Target, 0, candidates, 10).unwrap();
        for _ in 0..samples {
            reference.add_sample(1.0, &[], c).unwrap();
            target.add_sample(1.0, &[], 1.0 / c).unwrap();
        }
        (reference, target)
    }

    #[test]
    fn test_constant_ratio_is_exact() {
        let c = 3.7;
        let (reference, target) = constant_pair(c, OverlapCandidates::new(1.0, 3.0, 21).unwrap(), 100);
        let est = RatioEstimator::new(&reference, &target).unwrap();
        for i in 0..est.num_alpha() {
            assert_relative_eq!(est.overlap_average_at(i), c, epsilon = 1e-12);
        }
        assert_relative_eq!(est.overlap_average(), c, epsilon = 1e-9);
        let (ratio, err) = est.average_and_error(0).unwrap();
        assert_relative_eq!(ratio, c, epsilon = 1e-9);
        // zero variance up to rounding
        assert!(err.abs() < 1e-6);
    }

    #[test]
    fn test_min_diff_location_picks_closest_candidate() {
        let candidates = OverlapCandidates::new(1.0, 2.0, 11).unwrap();
        let (reference, target) = constant_pair(1.0, candidates.clone(), 50);
        let est = RatioEstimator::new(&reference, &target).unwrap();
        assert_eq!(est.min_diff_location(), 5);
        assert!(!est.is_at_boundary());

        let (reference, target) = constant_pair(100.0, candidates, 50);
        let est = RatioEstimator::new(&reference, &target).unwrap();
        assert_eq!(est.min_diff_location(), 10);
        assert!(est.is_at_boundary());
        // root beyond the grid: clamp to the last candidate
        assert_relative_eq!(est.overlap_average(), 2.0f64.exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_linear_interpolation_for_small_grids() {
        let c = 1.3;
        let (reference, target) = constant_pair(c, OverlapCandidates::new(1.0, 1.0, 3).unwrap(), 40);
        let est = RatioEstimator::new(&reference, &target).unwrap();
        assert_relative_eq!(est.overlap_average(), c, epsilon = 1e-9);
    }

    #[test]
    fn test_mismatched_grids_rejected() {
        let reference =
            OverlapAccumulator::new(SystemRole::Reference, 0, OverlapCandidates::single(1.0).unwrap(), 10).unwrap();
        let target =
            OverlapAccumulator::new(SystemRole::Target, 0, OverlapCandidates::single(2.0).unwrap(), 10).unwrap();
        assert!(RatioEstimator::new(&reference, &target).is_err());
    }

    #[test]
    fn test_bad_target_index() {
        let (reference, target) = constant_pair(2.0, OverlapCandidates::single(2.0).unwrap(), 20);
        let est = RatioEstimator::new(&reference, &target).unwrap();
        assert!(est.average_and_error(1).is_err());
    }

    #[test]
    fn test_ideal_fraction_without_data_keeps_old() {
        let candidates = OverlapCandidates::single(1.0).unwrap();
        let reference = OverlapAccumulator::new(SystemRole::Reference, 0, candidates.clone(), 10).unwrap();
        let target = OverlapAccumulator::new(SystemRole::Target, 0, candidates, 10).unwrap();
        let est = RatioEstimator::new(&reference, &target).unwrap();
        // both errors unknown: capped at 100% each, i.e. equal errors at the old fraction
        assert_relative_eq!(est.ideal_ref_fraction(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(est.ideal_ref_fraction(0.2), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ideal_fraction_favors_noisier_system() {
        use crate::sampling::RandomStream;
        let mut rng = RandomStream::from_seed(17);
        let candidates = OverlapCandidates::single(1.0).unwrap();
        let mut reference = OverlapAccumulator::new(SystemRole::Reference, 0, candidates.clone(), 10).unwrap();
        let mut target = OverlapAccumulator::new(SystemRole::Target, 0, candidates, 10).unwrap();
        for _ in 0..10_000 {
            // noisy reference values, quiet target values
            reference.add_sample(1.0 + rng.symmetric(), &[], 1.0 + 0.001 * rng.symmetric()).unwrap();
            target.add_sample(1.0 + 0.01 * rng.symmetric(), &[], 1.0).unwrap();
        }
        let est = RatioEstimator::new(&reference, &target).unwrap();
        let f = est.ideal_ref_fraction(0.5);
        assert!(f > 0.9, "fraction {}", f);
        // ignoring the reference value leaves only the quiet reference overlap
        let f = est.ignoring_reference_average(true).ideal_ref_fraction(0.5);
        assert!(f < 0.5, "fraction {}", f);
    }
}
