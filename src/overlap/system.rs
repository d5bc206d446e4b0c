//! A sampler bundled with the value functions it measures.

use super::accumulator::{OverlapAccumulator, SystemRole};
use super::candidates::OverlapCandidates;
use crate::error::Result;
use crate::sampling::{RandomStream, Sampler, SamplingWeight, ValueFunction};

/// One side of an overlap calculation.
///
/// After every trial the primary and extra values of the current
/// configuration are divided by its sampling weight and pushed, together with
/// the partner system's weight ratio, into the accumulator.
pub struct OverlapSystem<C> {
    sampler: Sampler<C>,
    primary: Box<dyn ValueFunction<C>>,
    extras: Vec<Box<dyn ValueFunction<C>>>,
    partner_weight: Box<dyn SamplingWeight<C>>,
    accumulator: OverlapAccumulator,
    skipped: u64,
    scratch: Vec<f64>,
}

impl<C> OverlapSystem<C> {
    /// `partner_weight` is the other system's sampling weight, evaluated on
    /// this system's configurations.
    pub fn new(
        role: SystemRole,
        sampler: Sampler<C>,
        primary: impl ValueFunction<C> + 'static,
        partner_weight: impl SamplingWeight<C> + 'static,
    ) -> Result<Self> {
        let accumulator = OverlapAccumulator::new(role, 0, OverlapCandidates::default(), 1000)?;
        Ok(Self {
            sampler,
            primary: Box::new(primary),
            extras: Vec::new(),
            partner_weight: Box::new(partner_weight),
            accumulator,
            skipped: 0,
            scratch: Vec::new(),
        })
    }

    /// Track another value alongside the primary one. Drops collected data.
    pub fn with_extra_value(mut self, value: impl ValueFunction<C> + 'static) -> Self {
        self.extras.push(Box::new(value));
        self.accumulator.set_num_extra(self.extras.len());
        self
    }

    pub fn role(&self) -> SystemRole {
        self.accumulator.role()
    }

    pub fn sampler(&self) -> &Sampler<C> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut Sampler<C> {
        &mut self.sampler
    }

    pub fn accumulator(&self) -> &OverlapAccumulator {
        &self.accumulator
    }

    pub fn accumulator_mut(&mut self) -> &mut OverlapAccumulator {
        &mut self.accumulator
    }

    /// Trials whose configuration had zero weight and so could not be measured.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped
    }

    /// One trial followed by one measurement.
    pub fn step(&mut self, rng: &mut RandomStream) -> Result<bool> {
        let accepted = self.sampler.trial(rng);
        let weight = self.sampler.weight().abs();
        if weight == 0.0 {
            self.skipped += 1;
            return Ok(accepted);
        }
        let config = self.sampler.config();
        let value = self.primary.evaluate(config) / weight;
        self.scratch.clear();
        self.scratch
            .extend(self.extras.iter().map(|extra| extra.evaluate(config) / weight));
        let partner_ratio = self.partner_weight.weight(config).abs() / weight;
        self.accumulator.add_sample(value, &self.scratch, partner_ratio)?;
        Ok(accepted)
    }
}
