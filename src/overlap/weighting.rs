//! Overlap weighting functions.

use std::fmt::Debug;

/// Maps an overlap parameter and the partner-to-self weight ratio of the
/// current configuration to the overlap channel value `γ/|w_self|`.
///
/// The reference and target forms must be built from the same overlap
/// density `γ` so that `⟨o⟩_ref / ⟨o⟩_tar` estimates `Z_tar / Z_ref`.
pub trait OverlapWeighting: Debug {
    /// `ratio = |w_tar| / |w_ref|` evaluated on a reference configuration.
    fn reference(&self, alpha: f64, ratio: f64) -> f64;
    /// `ratio = |w_ref| / |w_tar|` evaluated on a target configuration.
    fn target(&self, alpha: f64, ratio: f64) -> f64;
}

/// Bennett's overlap density `γ = |w_ref||w_tar| / (α|w_ref| + |w_tar|)`,
/// optimal when `α = Z_tar / Z_ref`.
#[derive(Copy, Clone, Debug, Default)]
pub struct BennettWeighting;

impl OverlapWeighting for BennettWeighting {
    #[inline]
    fn reference(&self, alpha: f64, ratio: f64) -> f64 {
        1.0 / (1.0 + alpha / ratio)
    }

    #[inline]
    fn target(&self, alpha: f64, ratio: f64) -> f64 {
        1.0 / (alpha + 1.0 / ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bennett_matches_overlap_density() {
        let w = BennettWeighting;
        let (w_ref, w_tar, alpha) = (0.7, 2.3, 1.9);
        let gamma = w_ref * w_tar / (alpha * w_ref + w_tar);
        assert_relative_eq!(w.reference(alpha, w_tar / w_ref), gamma / w_ref, epsilon = 1e-14);
        assert_relative_eq!(w.target(alpha, w_ref / w_tar), gamma / w_tar, epsilon = 1e-14);
    }

    #[test]
    fn test_bennett_limits() {
        let w = BennettWeighting;
        assert_eq!(w.reference(1.0, 0.0), 0.0);
        assert_eq!(w.target(1.0, 0.0), 0.0);
        assert_relative_eq!(w.reference(1.0, f64::INFINITY), 1.0);
        assert_relative_eq!(w.target(2.0, f64::INFINITY), 0.5);
    }
}
