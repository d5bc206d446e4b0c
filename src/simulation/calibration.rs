//! Bootstrap of the overlap parameter α* and equilibration before production.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::OverlapSimulation;
use crate::error::{OverlapError, Result};
use crate::io::{read_ref_pref, write_ref_pref};
use crate::overlap::{check_ref_pref, OverlapCandidates, Phase, RefPrefState};

/// Grid shapes, step counts and block sizing used before production.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Macro-steps per search round.
    pub steps: u64,
    /// Macro-steps of equilibration.
    pub equilibration_steps: u64,
    /// Half-width in `ln α` of the search grid.
    pub initial_span: f64,
    pub search_num_alpha: usize,
    pub refine_span: f64,
    pub refine_num_alpha: usize,
    pub production_span: f64,
    pub production_num_alpha: usize,
    /// Blocks aimed for during calibration runs.
    pub target_blocks: u64,
    pub min_block_size: u64,
    pub max_block_size: u64,
    /// Search rounds allowed before giving up on a grid-edge α*.
    pub max_rounds: usize,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            steps: 100,
            equilibration_steps: 100,
            initial_span: 30.0,
            search_num_alpha: 21,
            refine_span: 4.0,
            refine_num_alpha: 15,
            production_span: 1.0,
            production_num_alpha: 1,
            target_blocks: 1000,
            min_block_size: 1000,
            max_block_size: 1_000_000,
            max_rounds: 20,
        }
    }
}

impl CalibrationSettings {
    /// Block size for a calibration run of `steps` macro-steps.
    pub fn block_size_for(&self, steps: u64, num_sub_steps: u64) -> u64 {
        let block_size = steps.saturating_mul(num_sub_steps) / self.target_blocks.max(1);
        block_size.clamp(self.min_block_size.max(1), self.max_block_size.max(self.min_block_size.max(1)))
    }

    /// Grid around a confirmed α* used for production, whether α* was
    /// searched or read back from a file.
    pub fn production_candidates(&self, ref_pref: f64) -> Result<OverlapCandidates> {
        OverlapCandidates::new(ref_pref, self.production_span, self.production_num_alpha)
    }
}

/// Where the α* adopted by [`OverlapSimulation::init_ref_pref`] came from.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub enum RefPrefSource {
    /// Read from the persisted file; no search was run.
    Loaded(f64),
    /// Found by searching; `rounds` grids were tried.
    Searched { value: f64, rounds: usize },
}

impl RefPrefSource {
    pub fn value(&self) -> f64 {
        match *self {
            RefPrefSource::Loaded(v) | RefPrefSource::Searched { value: v, .. } => v,
        }
    }
}

impl<C> OverlapSimulation<C> {
    /// Determine a first α*.
    ///
    /// A well-formed value stored at `path` is adopted directly. Otherwise
    /// both systems run `steps` macro-steps on a wide grid centered on the
    /// previous guess; when the estimate lands on the edge of the grid the grid
    /// is re-centered and the round repeated. The result is provisional until
    /// [`equilibrate`](Self::equilibrate) refines it.
    pub fn init_ref_pref(&mut self, path: Option<&Path>, steps: u64) -> Result<RefPrefSource> {
        self.allocator.enter(Phase::Calibrating)?;

        if let Some(value) = path.and_then(read_ref_pref) {
            info!(ref_pref = value, "using stored reference preference");
            self.allocator.set_candidates(self.calibration.production_candidates(value)?);
            self.allocator.set_ref_pref(RefPrefState::Confirmed(value))?;
            return Ok(RefPrefSource::Loaded(value));
        }
        if steps == 0 {
            return Err(OverlapError::InvalidParameter("calibration needs at least one step".into()));
        }

        let settings = self.calibration.clone();
        let old_block_size = self.allocator.block_size();
        self.allocator.set_equilibrating(true);
        let block_size = settings.block_size_for(steps, self.allocator.num_sub_steps());
        self.allocator.set_block_size(block_size)?;

        let mut center = self.allocator.ref_pref().value().unwrap_or(1.0);
        let span = settings.initial_span;
        for round in 1..=settings.max_rounds {
            self.allocator
                .set_candidates(OverlapCandidates::new(center, span, settings.search_num_alpha)?);
            self.run_balanced(steps)?;

            let value = check_ref_pref(self.allocator.estimator()?.overlap_average())?;
            info!(round, ref_pref = value, center, "reference preference search");
            let edge = (span - 0.01).exp();
            if value > center * edge || value < center / edge {
                warn!(ref_pref = value, "reference preference at the edge of the grid, re-centering");
                center = value;
                continue;
            }

            self.allocator.set_block_size(old_block_size)?;
            self.allocator.set_candidates(OverlapCandidates::new(
                value,
                settings.refine_span,
                settings.refine_num_alpha,
            )?);
            self.allocator.set_ref_pref(RefPrefState::Provisional(value))?;
            return Ok(RefPrefSource::Searched { value, rounds: round });
        }
        Err(OverlapError::RefPrefOutOfRange {
            rounds: settings.max_rounds,
        })
    }

    /// Equilibrate both systems with move-step adaptation on.
    ///
    /// A provisional α* is refined on the narrower grid, confirmed, written to
    /// `path` and installed as the production grid. With a confirmed or no α*
    /// the accumulators are simply cleared. Either way production starts from
    /// empty statistics with move steps frozen.
    pub fn equilibrate(&mut self, path: Option<&Path>, steps: u64) -> Result<()> {
        self.allocator.enter(Phase::Equilibrating)?;
        let settings = self.calibration.clone();
        let old_block_size = self.allocator.block_size();
        let block_size = settings.block_size_for(steps, self.allocator.num_sub_steps());
        self.allocator.set_block_size(block_size)?;
        self.allocator.set_equilibrating(true);

        self.run_balanced(steps)?;

        match self.allocator.ref_pref() {
            RefPrefState::Provisional(_) => {
                let value = check_ref_pref(self.allocator.estimator()?.overlap_average())?;
                info!(ref_pref = value, "refined reference preference");
                self.allocator.set_candidates(settings.production_candidates(value)?);
                self.allocator.set_ref_pref(RefPrefState::Confirmed(value))?;
                if let Some(path) = path {
                    write_ref_pref(path, value)?;
                }
            }
            RefPrefState::Confirmed(_) | RefPrefState::Undetermined => self.allocator.reset_accumulators(),
        }

        self.allocator.set_block_size(old_block_size)?;
        self.allocator.set_equilibrating(false);
        Ok(())
    }

    /// Run with the reference fraction forced to one half when it is allowed
    /// to adapt; a pinned fraction is left alone.
    fn run_balanced(&mut self, steps: u64) -> Result<()> {
        let adjustable = self.allocator.is_adjust_step_fraction();
        if adjustable {
            self.allocator.set_ref_step_fraction(0.5)?;
            self.allocator.set_adjust_step_fraction(false);
        }
        let result = self.allocator.run_steps(steps);
        if adjustable {
            self.allocator.set_adjust_step_fraction(true);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_clamped() {
        let settings = CalibrationSettings::default();
        // 100 * 1000 / 1000 = 100, raised to the minimum
        assert_eq!(settings.block_size_for(100, 1000), 1000);
        assert_eq!(settings.block_size_for(10_000, 1000), 10_000);
        assert_eq!(settings.block_size_for(u64::MAX, 1000), 1_000_000);

        let small = CalibrationSettings {
            min_block_size: 10,
            ..CalibrationSettings::default()
        };
        assert_eq!(small.block_size_for(20, 1000), 20);
        assert_eq!(small.block_size_for(1, 1), 10);
    }

    #[test]
    fn test_source_value() {
        assert_eq!(RefPrefSource::Loaded(2.0).value(), 2.0);
        assert_eq!(RefPrefSource::Searched { value: 3.0, rounds: 2 }.value(), 3.0);
    }

    #[test]
    fn test_production_candidates() {
        let settings = CalibrationSettings::default();
        let single = settings.production_candidates(2.0).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.alpha(0), 2.0);

        let wide = CalibrationSettings {
            production_num_alpha: 5,
            ..CalibrationSettings::default()
        };
        let grid = wide.production_candidates(2.0).unwrap();
        assert_eq!(grid.len(), 5);
        assert!((grid.alpha(2) - 2.0).abs() < 1e-12);
        assert!((grid.alpha(4) - 2.0 * 1.0_f64.exp()).abs() < 1e-12);
        assert!(wide.production_candidates(f64::NAN).is_err());
    }
}
