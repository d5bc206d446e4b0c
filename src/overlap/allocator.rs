//! Drives the reference and target systems and splits effort between them.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use super::candidates::{OverlapCandidates, RefPrefState};
use super::estimator::RatioEstimator;
use super::system::OverlapSystem;
use super::weighting::OverlapWeighting;
use crate::error::{OverlapError, Result};
use crate::sampling::RandomStream;

/// Blocks both accumulators need before the step fraction may adapt.
const MIN_ADJUST_BLOCKS: u64 = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Calibrating,
    Equilibrating,
    Production,
    Done,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Calibrating => "calibrating",
            Phase::Equilibrating => "equilibrating",
            Phase::Production => "production",
            Phase::Done => "done",
        }
    }

    fn can_enter(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Calibrating)
                | (Calibrating, Calibrating)
                | (Calibrating, Equilibrating)
                | (Idle, Equilibrating)
                | (Equilibrating, Production)
                | (Idle, Production)
                | (Done, Production)
                | (Production, Done)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level controller for one overlap calculation.
///
/// Each macro-step hands `num_sub_steps` trials to the two systems, the
/// reference share given by the reference step fraction. Reference trials
/// run first, then target trials. When adaptation is on, the fraction is
/// re-balanced after every macro-step so both systems contribute equally to
/// the variance of the final ratio.
pub struct StepAllocator<C> {
    reference: OverlapSystem<C>,
    target: OverlapSystem<C>,
    rng: RandomStream,
    phase: Phase,
    num_sub_steps: u64,
    ref_step_fraction: f64,
    adjust_step_fraction: bool,
    aggressive: bool,
    ignore_reference_average: bool,
    total_ref_steps: u64,
    total_target_steps: u64,
    ref_pref: RefPrefState,
}

impl<C> StepAllocator<C> {
    pub fn new(reference: OverlapSystem<C>, target: OverlapSystem<C>, rng: RandomStream) -> Result<Self> {
        if reference.sampler().num_moves() == 0 || target.sampler().num_moves() == 0 {
            return Err(OverlapError::NoTrialMoves);
        }
        let mut allocator = Self {
            reference,
            target,
            rng,
            phase: Phase::Idle,
            num_sub_steps: 1000,
            ref_step_fraction: 0.5,
            adjust_step_fraction: true,
            aggressive: true,
            ignore_reference_average: false,
            total_ref_steps: 0,
            total_target_steps: 0,
            ref_pref: RefPrefState::Undetermined,
        };
        // both sides always share block size and candidate grid
        let block_size = allocator.reference.accumulator().block_size();
        allocator.set_block_size(block_size)?;
        allocator.set_candidates(OverlapCandidates::default());
        Ok(allocator)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move the state machine to `next`, rejecting illegal transitions.
    pub fn enter(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_enter(next) {
            return Err(OverlapError::InvalidTransition {
                from: self.phase.name(),
                to: next.name(),
            });
        }
        if self.phase != next {
            debug!(from = %self.phase, to = %next, "phase change");
        }
        self.phase = next;
        Ok(())
    }

    pub fn reference(&self) -> &OverlapSystem<C> {
        &self.reference
    }

    pub fn reference_mut(&mut self) -> &mut OverlapSystem<C> {
        &mut self.reference
    }

    pub fn target(&self) -> &OverlapSystem<C> {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut OverlapSystem<C> {
        &mut self.target
    }

    pub fn rng(&self) -> &RandomStream {
        &self.rng
    }

    pub fn estimator(&self) -> Result<RatioEstimator<'_>> {
        Ok(RatioEstimator::new(self.reference.accumulator(), self.target.accumulator())?
            .ignoring_reference_average(self.ignore_reference_average))
    }

    pub fn candidates(&self) -> &OverlapCandidates {
        self.reference.accumulator().candidates()
    }

    /// Install a candidate grid on both accumulators; drops their data.
    pub fn set_candidates(&mut self, candidates: OverlapCandidates) {
        self.reference.accumulator_mut().set_candidates(candidates.clone());
        self.target.accumulator_mut().set_candidates(candidates);
        self.reset_step_counts();
    }

    /// Install one overlap weighting on both accumulators; drops their data.
    pub fn set_weighting(&mut self, weighting: Rc<dyn OverlapWeighting>) {
        self.reference.accumulator_mut().set_weighting(Rc::clone(&weighting));
        self.target.accumulator_mut().set_weighting(weighting);
        self.reset_step_counts();
    }

    pub fn block_size(&self) -> u64 {
        self.reference.accumulator().block_size()
    }

    /// Set the block size of both accumulators. Drops their data and the
    /// per-system step counts.
    pub fn set_block_size(&mut self, block_size: u64) -> Result<()> {
        self.reference.accumulator_mut().set_block_size(block_size)?;
        self.target.accumulator_mut().set_block_size(block_size)?;
        self.reset_step_counts();
        Ok(())
    }

    /// Drop accumulated statistics on both sides.
    pub fn reset_accumulators(&mut self) {
        self.reference.accumulator_mut().reset();
        self.target.accumulator_mut().reset();
        self.reset_step_counts();
    }

    fn reset_step_counts(&mut self) {
        self.total_ref_steps = 0;
        self.total_target_steps = 0;
    }

    pub fn num_sub_steps(&self) -> u64 {
        self.num_sub_steps
    }

    pub fn set_num_sub_steps(&mut self, num_sub_steps: u64) -> Result<()> {
        if num_sub_steps == 0 {
            return Err(OverlapError::InvalidParameter("number of sub-steps must be positive".into()));
        }
        self.num_sub_steps = num_sub_steps;
        Ok(())
    }

    pub fn ref_step_fraction(&self) -> f64 {
        self.ref_step_fraction
    }

    pub fn set_ref_step_fraction(&mut self, fraction: f64) -> Result<()> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(OverlapError::InvalidParameter(format!(
                "reference step fraction {} not in (0, 1)",
                fraction
            )));
        }
        self.ref_step_fraction = fraction;
        Ok(())
    }

    pub fn is_adjust_step_fraction(&self) -> bool {
        self.adjust_step_fraction
    }

    pub fn set_adjust_step_fraction(&mut self, adjust: bool) {
        self.adjust_step_fraction = adjust;
    }

    /// With aggressive allocation the reference share of each macro-step is
    /// chosen so the running totals catch up with the fraction as fast as
    /// possible, instead of applying it to the macro-step alone.
    pub fn set_aggressive(&mut self, aggressive: bool) {
        self.aggressive = aggressive;
    }

    pub fn set_ignore_reference_average(&mut self, ignore: bool) {
        self.ignore_reference_average = ignore;
    }

    pub fn total_ref_steps(&self) -> u64 {
        self.total_ref_steps
    }

    pub fn total_target_steps(&self) -> u64 {
        self.total_target_steps
    }

    /// Turn move-step adaptation on or off for both samplers.
    pub fn set_equilibrating(&mut self, equilibrating: bool) {
        self.reference.sampler_mut().set_equilibrating(equilibrating);
        self.target.sampler_mut().set_equilibrating(equilibrating);
    }

    pub fn ref_pref(&self) -> RefPrefState {
        self.ref_pref
    }

    /// Record α*. NaN, infinite and non-positive values are fatal.
    pub fn set_ref_pref(&mut self, state: RefPrefState) -> Result<()> {
        state.validate()?;
        self.ref_pref = state;
        Ok(())
    }

    fn ref_steps_for_macro_step(&self) -> u64 {
        let n = self.num_sub_steps;
        if self.aggressive {
            let total = (self.total_ref_steps + self.total_target_steps + n) as f64;
            let desired = self.ref_step_fraction * total - self.total_ref_steps as f64;
            desired.round().clamp(0.0, n as f64) as u64
        } else {
            ((self.ref_step_fraction * n as f64).round() as u64).min(n)
        }
    }

    /// One macro-step: `num_sub_steps` trials split between the systems.
    pub fn do_step(&mut self) -> Result<()> {
        let n_ref = self.ref_steps_for_macro_step();
        let n_target = self.num_sub_steps - n_ref;
        for _ in 0..n_ref {
            self.reference.step(&mut self.rng)?;
        }
        for _ in 0..n_target {
            self.target.step(&mut self.rng)?;
        }
        self.total_ref_steps += n_ref;
        self.total_target_steps += n_target;

        if self.adjust_step_fraction
            && self.reference.accumulator().block_count() >= MIN_ADJUST_BLOCKS
            && self.target.accumulator().block_count() >= MIN_ADJUST_BLOCKS
        {
            let fraction = self.estimator()?.ideal_ref_fraction(self.ref_step_fraction);
            if fraction != self.ref_step_fraction {
                debug!(old = self.ref_step_fraction, new = fraction, "reference step fraction");
            }
            self.ref_step_fraction = fraction;
        }
        Ok(())
    }

    /// Run `steps` macro-steps in the current phase.
    pub fn run_steps(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.do_step()?;
        }
        Ok(())
    }

    /// Production run of `max_steps` macro-steps, ending in [`Phase::Done`].
    /// Step sizes stay frozen throughout.
    pub fn run(&mut self, max_steps: u64) -> Result<()> {
        self.ref_pref.validate()?;
        self.enter(Phase::Production)?;
        self.set_equilibrating(false);
        self.run_steps(max_steps)?;
        self.enter(Phase::Done)
    }
}

impl<C> fmt::Debug for StepAllocator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepAllocator")
            .field("phase", &self.phase)
            .field("num_sub_steps", &self.num_sub_steps)
            .field("ref_step_fraction", &self.ref_step_fraction)
            .field("adjust_step_fraction", &self.adjust_step_fraction)
            .field("ref_pref", &self.ref_pref)
            .finish()
    }
}
