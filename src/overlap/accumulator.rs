//! Per-system accumulator of value and overlap channels.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::block::BlockAccumulator;
use super::candidates::OverlapCandidates;
use super::weighting::{BennettWeighting, OverlapWeighting};
use crate::error::{OverlapError, Result};

/// Which side of the overlap pair a system samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemRole {
    Reference,
    Target,
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemRole::Reference => write!(f, "reference"),
            SystemRole::Target => write!(f, "target"),
        }
    }
}

/// Block statistics for one sampler.
///
/// Each sample is laid out as
/// `[v_0/|w|, v_1/|w|, …, v_{m-1}/|w|, o_0, …, o_{N-1}]`
/// where `v_0` is the primary value, `v_1..` are extra values and `o_i` is the
/// overlap channel for candidate `α_i`.
pub struct OverlapAccumulator {
    role: SystemRole,
    num_values: usize,
    candidates: OverlapCandidates,
    weighting: Rc<dyn OverlapWeighting>,
    block: BlockAccumulator,
    scratch: Vec<f64>,
}

impl OverlapAccumulator {
    /// Accumulator for a primary value plus `num_extra` extra values.
    pub fn new(role: SystemRole, num_extra: usize, candidates: OverlapCandidates, block_size: u64) -> Result<Self> {
        let num_values = num_extra + 1;
        let dim = num_values + candidates.len();
        Ok(Self {
            role,
            num_values,
            candidates,
            weighting: Rc::new(BennettWeighting),
            block: BlockAccumulator::new(dim, block_size)?,
            scratch: Vec::with_capacity(dim),
        })
    }

    pub fn role(&self) -> SystemRole {
        self.role
    }

    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn num_extra(&self) -> usize {
        self.num_values - 1
    }

    pub fn num_alpha(&self) -> usize {
        self.candidates.len()
    }

    pub fn dim(&self) -> usize {
        self.block.dim()
    }

    pub fn candidates(&self) -> &OverlapCandidates {
        &self.candidates
    }

    pub fn weighting(&self) -> &Rc<dyn OverlapWeighting> {
        &self.weighting
    }

    /// Swap the overlap weighting; drops collected data.
    pub fn set_weighting(&mut self, weighting: Rc<dyn OverlapWeighting>) {
        self.weighting = weighting;
        self.block.reset();
    }

    /// Install a new candidate grid; drops collected data.
    pub fn set_candidates(&mut self, candidates: OverlapCandidates) {
        self.block.set_dim(self.num_values + candidates.len());
        self.candidates = candidates;
    }

    /// Change the number of extra values; drops collected data.
    pub fn set_num_extra(&mut self, num_extra: usize) {
        self.num_values = num_extra + 1;
        self.block.set_dim(self.num_values + self.candidates.len());
    }

    pub fn block_size(&self) -> u64 {
        self.block.block_size()
    }

    pub fn set_block_size(&mut self, block_size: u64) -> Result<()> {
        self.block.set_block_size(block_size)
    }

    /// Drop all statistics; keeps block size and candidates.
    pub fn reset(&mut self) {
        self.block.reset();
    }

    /// Record one sample. `value` and `extra_values` are already divided by
    /// the sampling weight; `partner_ratio` is `|w_partner| / |w_self|`.
    pub fn add_sample(&mut self, value: f64, extra_values: &[f64], partner_ratio: f64) -> Result<()> {
        if extra_values.len() + 1 != self.num_values {
            return Err(OverlapError::DimensionMismatch {
                expected: self.num_values - 1,
                found: extra_values.len(),
                context: "extra values",
            });
        }
        self.scratch.clear();
        self.scratch.push(value);
        self.scratch.extend_from_slice(extra_values);
        for &alpha in self.candidates.alphas() {
            let o = match self.role {
                SystemRole::Reference => self.weighting.reference(alpha, partner_ratio),
                SystemRole::Target => self.weighting.target(alpha, partner_ratio),
            };
            self.scratch.push(o);
        }
        self.block.add_sample(&self.scratch)
    }

    /// Raw access to the underlying block statistics.
    pub fn block(&self) -> &BlockAccumulator {
        &self.block
    }

    pub fn sample_count(&self) -> u64 {
        self.block.sample_count()
    }

    pub fn block_count(&self) -> u64 {
        self.block.block_count()
    }

    /// Data index of the `k`-th value (0 is the primary value).
    pub fn value_index(&self, k: usize) -> usize {
        k
    }

    /// Data index of the overlap channel for candidate `i`.
    pub fn overlap_index(&self, i: usize) -> usize {
        self.num_values + i
    }

    pub fn average(&self, index: usize) -> f64 {
        self.block.average(index)
    }

    pub fn error(&self, index: usize) -> f64 {
        self.block.error(index)
    }

    pub fn standard_deviation(&self, index: usize) -> f64 {
        self.block.standard_deviation(index)
    }

    pub fn covariance(&self, i: usize, j: usize) -> f64 {
        self.block.covariance(i, j)
    }

    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        self.block.correlation(i, j)
    }

    pub fn block_correlation(&self, index: usize) -> f64 {
        self.block.block_correlation(index)
    }

    /// Average of the overlap channel for candidate `i`.
    pub fn overlap_average(&self, i: usize) -> f64 {
        self.block.average(self.overlap_index(i))
    }

    pub fn overlap_error(&self, i: usize) -> f64 {
        self.block.error(self.overlap_index(i))
    }

    /// `⟨v_k/|w|⟩ / ⟨o_i⟩`: the system's integral in units of the overlap integral.
    pub fn value_over_overlap(&self, k: usize, i: usize) -> f64 {
        self.block.ratio(self.value_index(k), self.overlap_index(i))
    }

    pub fn value_over_overlap_error(&self, k: usize, i: usize) -> f64 {
        self.block.ratio_error(self.value_index(k), self.overlap_index(i))
    }
}

impl fmt::Debug for OverlapAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlapAccumulator")
            .field("role", &self.role)
            .field("num_values", &self.num_values)
            .field("candidates", &self.candidates)
            .field("weighting", &self.weighting)
            .field("block", &self.block)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> OverlapCandidates {
        OverlapCandidates::new(1.0, 1.0, 3).unwrap()
    }

    #[test]
    fn test_layout() {
        let mut acc = OverlapAccumulator::new(SystemRole::Target, 2, grid(), 1).unwrap();
        assert_eq!(acc.dim(), 6);
        acc.add_sample(1.0, &[2.0, 3.0], 0.5).unwrap();
        assert_relative_eq!(acc.average(0), 1.0);
        assert_relative_eq!(acc.average(1), 2.0);
        assert_relative_eq!(acc.average(2), 3.0);
        for i in 0..3 {
            let alpha = acc.candidates().alpha(i);
            assert_relative_eq!(acc.overlap_average(i), 1.0 / (alpha + 2.0), epsilon = 1e-14);
        }
    }

    #[test]
    fn test_reference_overlap_channel() {
        let mut acc = OverlapAccumulator::new(SystemRole::Reference, 0, grid(), 1).unwrap();
        acc.add_sample(1.0, &[], 3.0).unwrap();
        let alpha = acc.candidates().alpha(2);
        assert_relative_eq!(acc.overlap_average(2), 3.0 / (alpha + 3.0), epsilon = 1e-14);
        assert_relative_eq!(acc.value_over_overlap(0, 2), (alpha + 3.0) / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_extra_length_checked() {
        let mut acc = OverlapAccumulator::new(SystemRole::Target, 1, grid(), 10).unwrap();
        assert!(matches!(
            acc.add_sample(1.0, &[], 1.0),
            Err(OverlapError::DimensionMismatch { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_reset_twice_equals_once() {
        let mut acc = OverlapAccumulator::new(SystemRole::Reference, 0, grid(), 4).unwrap();
        for k in 0..37 {
            acc.add_sample(k as f64, &[], 1.0 + k as f64).unwrap();
        }
        acc.reset();
        let once = format!("{:?}", acc);
        acc.reset();
        assert_eq!(format!("{:?}", acc), once);
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.block_count(), 0);
        assert_eq!(acc.block_size(), 4);
        assert_eq!(acc.num_alpha(), 3);
    }

    #[test]
    fn test_new_candidates_resize() {
        let mut acc = OverlapAccumulator::new(SystemRole::Reference, 0, grid(), 2).unwrap();
        acc.add_sample(1.0, &[], 1.0).unwrap();
        acc.add_sample(1.0, &[], 1.0).unwrap();
        acc.set_candidates(OverlapCandidates::single(2.0).unwrap());
        assert_eq!(acc.dim(), 2);
        assert_eq!(acc.block_count(), 0);
        assert_eq!(acc.block_size(), 2);
    }
}
