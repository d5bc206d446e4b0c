//! Block-averaging accumulator for vector-valued samples.
//!
//! Samples are summed into a block of fixed length; a full block is reduced to
//! its average, and the statistics (mean, covariance, lag-one correlation)
//! are taken over the series of block averages. Using block averages instead
//! of raw samples makes the error estimate honest for correlated Markov-chain
//! data as long as blocks are longer than the correlation time.

use nalgebra::{DMatrix, DVector};

use crate::error::{OverlapError, Result};

#[derive(Clone, Debug)]
pub struct BlockAccumulator {
    dim: usize,
    block_size: u64,

    block_fill: u64,
    block_sum: DVector<f64>,

    sample_count: u64,
    sample_sum: DVector<f64>,
    sample_sum_sq: DVector<f64>,

    block_count: u64,
    block_avg_sum: DVector<f64>,
    block_avg_outer: DMatrix<f64>,
    lag_sum: DVector<f64>,
    first_block: DVector<f64>,
    last_block: DVector<f64>,
}

impl BlockAccumulator {
    pub fn new(dim: usize, block_size: u64) -> Result<Self> {
        if block_size == 0 {
            return Err(OverlapError::InvalidParameter("block size must be positive".into()));
        }
        Ok(Self {
            dim,
            block_size,
            block_fill: 0,
            block_sum: DVector::zeros(dim),
            sample_count: 0,
            sample_sum: DVector::zeros(dim),
            sample_sum_sq: DVector::zeros(dim),
            block_count: 0,
            block_avg_sum: DVector::zeros(dim),
            block_avg_outer: DMatrix::zeros(dim, dim),
            lag_sum: DVector::zeros(dim),
            first_block: DVector::zeros(dim),
            last_block: DVector::zeros(dim),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Change the block length. All collected data is dropped.
    pub fn set_block_size(&mut self, block_size: u64) -> Result<()> {
        if block_size == 0 {
            return Err(OverlapError::InvalidParameter("block size must be positive".into()));
        }
        self.block_size = block_size;
        self.reset();
        Ok(())
    }

    /// Change the sample dimension. All collected data is dropped.
    pub fn set_dim(&mut self, dim: usize) {
        *self = Self {
            dim,
            block_size: self.block_size,
            block_fill: 0,
            block_sum: DVector::zeros(dim),
            sample_count: 0,
            sample_sum: DVector::zeros(dim),
            sample_sum_sq: DVector::zeros(dim),
            block_count: 0,
            block_avg_sum: DVector::zeros(dim),
            block_avg_outer: DMatrix::zeros(dim, dim),
            lag_sum: DVector::zeros(dim),
            first_block: DVector::zeros(dim),
            last_block: DVector::zeros(dim),
        };
    }

    /// Drop all statistics; keeps dimension and block size.
    pub fn reset(&mut self) {
        self.block_fill = 0;
        self.block_sum.fill(0.0);
        self.sample_count = 0;
        self.sample_sum.fill(0.0);
        self.sample_sum_sq.fill(0.0);
        self.block_count = 0;
        self.block_avg_sum.fill(0.0);
        self.block_avg_outer.fill(0.0);
        self.lag_sum.fill(0.0);
        self.first_block.fill(0.0);
        self.last_block.fill(0.0);
    }

    pub fn add_sample(&mut self, x: &[f64]) -> Result<()> {
        if x.len() != self.dim {
            return Err(OverlapError::DimensionMismatch {
                expected: self.dim,
                found: x.len(),
                context: "block accumulator sample",
            });
        }
        for (i, &v) in x.iter().enumerate() {
            self.block_sum[i] += v;
            self.sample_sum[i] += v;
            self.sample_sum_sq[i] += v * v;
        }
        self.sample_count += 1;
        self.block_fill += 1;
        if self.block_fill == self.block_size {
            self.flush_block();
        }
        Ok(())
    }

    fn flush_block(&mut self) {
        let avg = &self.block_sum / self.block_size as f64;
        if self.block_count == 0 {
            self.first_block.copy_from(&avg);
        } else {
            self.lag_sum += self.last_block.component_mul(&avg);
        }
        self.block_avg_sum += &avg;
        self.block_avg_outer.ger(1.0, &avg, &avg, 1.0);
        self.last_block = avg;
        self.block_count += 1;
        self.block_sum.fill(0.0);
        self.block_fill = 0;
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Number of completed blocks.
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Mean over completed blocks; NaN before the first block completes.
    pub fn average(&self, i: usize) -> f64 {
        if self.block_count == 0 {
            return f64::NAN;
        }
        self.block_avg_sum[i] / self.block_count as f64
    }

    /// Covariance of block averages of components `i` and `j`.
    pub fn covariance(&self, i: usize, j: usize) -> f64 {
        if self.block_count == 0 {
            return f64::NAN;
        }
        let n = self.block_count as f64;
        self.block_avg_outer[(i, j)] / n - self.average(i) * self.average(j)
    }

    /// Variance of block averages, clipped at zero.
    pub fn block_variance(&self, i: usize) -> f64 {
        self.covariance(i, i).max(0.0)
    }

    /// Standard error of the mean; NaN with fewer than two blocks.
    pub fn error(&self, i: usize) -> f64 {
        if self.block_count < 2 {
            return f64::NAN;
        }
        (self.block_variance(i) / (self.block_count - 1) as f64).sqrt()
    }

    /// Standard deviation of the raw samples.
    pub fn standard_deviation(&self, i: usize) -> f64 {
        if self.sample_count == 0 {
            return f64::NAN;
        }
        let n = self.sample_count as f64;
        let mean = self.sample_sum[i] / n;
        (self.sample_sum_sq[i] / n - mean * mean).max(0.0).sqrt()
    }

    /// Lag-one autocorrelation of successive block averages, 0 when undefined.
    pub fn block_correlation(&self, i: usize) -> f64 {
        if self.block_count < 3 {
            return 0.0;
        }
        let var = self.block_variance(i);
        if var <= 0.0 {
            return 0.0;
        }
        let n = self.block_count as f64;
        let mu = self.average(i);
        let ends = 2.0 * self.block_avg_sum[i] - self.first_block[i] - self.last_block[i];
        let lag_cov = (self.lag_sum[i] - mu * ends + (n - 1.0) * mu * mu) / (n - 1.0);
        sanitize(lag_cov / var)
    }

    /// Correlation coefficient of block averages, 0 when undefined.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denom = (self.covariance(i, i) * self.covariance(j, j)).sqrt();
        sanitize(self.covariance(i, j) / denom)
    }

    pub fn ratio(&self, i: usize, j: usize) -> f64 {
        self.average(i) / self.average(j)
    }

    /// First-order (delta-method) error of `average(i) / average(j)` including
    /// the covariance between the two components.
    pub fn ratio_error(&self, i: usize, j: usize) -> f64 {
        if self.block_count < 2 {
            return f64::NAN;
        }
        let (ai, aj) = (self.average(i), self.average(j));
        let rel = (self.block_variance(i) / (ai * ai) + self.block_variance(j) / (aj * aj)
            - 2.0 * self.covariance(i, j) / (ai * aj))
            / (self.block_count - 1) as f64;
        (ai / aj).abs() * rel.max(0.0).sqrt()
    }
}

/// Replace NaN/∞ by 0.
#[inline]
pub(crate) fn sanitize(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
