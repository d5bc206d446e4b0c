//! Simulation module - the driver API for a complete overlap calculation.
//!
//! The usual sequence is [`OverlapSimulation::init_ref_pref`],
//! [`OverlapSimulation::equilibrate`], [`OverlapSimulation::run`] and
//! [`OverlapSimulation::print_results`].

mod calibration;
mod report;

pub use calibration::{CalibrationSettings, RefPrefSource};
pub use report::{ChannelStats, ExtraReport, OverlapReport, SystemReport};

use tracing::info;

use crate::error::Result;
use crate::io::SimulationConfig;
use crate::overlap::{OverlapSystem, RefPrefState, StepAllocator};
use crate::sampling::RandomStream;

/// Reference and target systems plus the calibration recipe.
pub struct OverlapSimulation<C> {
    allocator: StepAllocator<C>,
    calibration: CalibrationSettings,
}

impl<C> OverlapSimulation<C> {
    pub fn new(reference: OverlapSystem<C>, target: OverlapSystem<C>, rng: RandomStream) -> Result<Self> {
        Ok(Self {
            allocator: StepAllocator::new(reference, target, rng)?,
            calibration: CalibrationSettings::default(),
        })
    }

    /// Build a simulation and apply the sampling parameters of `config`.
    /// The random stream is seeded from `config.seed` or from entropy.
    pub fn from_config(
        reference: OverlapSystem<C>,
        target: OverlapSystem<C>,
        config: &SimulationConfig,
    ) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => RandomStream::from_seed(seed),
            None => RandomStream::from_entropy(),
        };
        info!(seed = rng.seed(), "random stream");
        let mut sim = Self::new(reference, target, rng)?;
        sim.set_num_sub_steps(config.num_sub_steps)?;
        sim.set_accumulator_block_size(config.block_size)?;
        sim.allocator.set_aggressive(config.aggressive_adjust_step_fraction);
        sim.allocator.set_ignore_reference_average(config.ignore_reference_average);
        sim.set_adjust_step_fraction(config.adjust_step_fraction);
        if let Some(fraction) = config.ref_step_fraction {
            sim.set_ref_step_fraction(fraction)?;
            sim.set_adjust_step_fraction(false);
        }
        sim.calibration = config.calibration.clone();
        Ok(sim)
    }

    pub fn allocator(&self) -> &StepAllocator<C> {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut StepAllocator<C> {
        &mut self.allocator
    }

    pub fn calibration(&self) -> &CalibrationSettings {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: CalibrationSettings) {
        self.calibration = calibration;
    }

    pub fn ref_pref(&self) -> RefPrefState {
        self.allocator.ref_pref()
    }

    pub fn set_ref_step_fraction(&mut self, fraction: f64) -> Result<()> {
        self.allocator.set_ref_step_fraction(fraction)
    }

    pub fn set_adjust_step_fraction(&mut self, adjust: bool) {
        self.allocator.set_adjust_step_fraction(adjust);
    }

    /// Block size of both accumulators; drops their data.
    pub fn set_accumulator_block_size(&mut self, block_size: u64) -> Result<()> {
        self.allocator.set_block_size(block_size)
    }

    pub fn set_num_sub_steps(&mut self, num_sub_steps: u64) -> Result<()> {
        self.allocator.set_num_sub_steps(num_sub_steps)
    }

    /// Production run of `max_steps` macro-steps.
    pub fn run(&mut self, max_steps: u64) -> Result<()> {
        info!(steps = max_steps, ref_pref = ?self.allocator.ref_pref(), "production");
        self.allocator.run(max_steps)?;
        info!(
            ref_steps = self.allocator.total_ref_steps(),
            target_steps = self.allocator.total_target_steps(),
            ref_step_fraction = self.allocator.ref_step_fraction(),
            "production finished"
        );
        Ok(())
    }

    /// Target-to-reference ratio of the integrals and its error.
    pub fn overlap_average_and_error(&self) -> Result<(f64, f64)> {
        self.allocator.estimator()?.average_and_error(0)
    }
}
