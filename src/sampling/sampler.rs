//! Metropolis sampler owning one configuration.

use serde::Serialize;

use super::random::RandomStream;
use super::step::{MoveStepAdapter, MoveStepSettings};
use super::traits::{SamplingWeight, TrialMove, TrialObserver};
use crate::error::Result;

struct MoveSlot<C> {
    trial_move: Box<dyn TrialMove<C>>,
    frequency: f64,
    adapter: MoveStepAdapter,
}

/// Step size and acceptance of one registered move.
#[derive(Clone, Debug, Serialize)]
pub struct MoveDiagnostics {
    pub name: String,
    pub step_size: f64,
    pub acceptance: f64,
    pub attempted: u64,
    pub reversals: u64,
}

/// Markov-chain sampler: one configuration, one sampling weight, a set of
/// trial moves chosen by relative frequency.
pub struct Sampler<C> {
    config: C,
    weight_fn: Box<dyn SamplingWeight<C>>,
    weight: f64,
    moves: Vec<MoveSlot<C>>,
    total_frequency: f64,
    observers: Vec<Box<dyn TrialObserver<C>>>,
    trials: u64,
    accepted: u64,
}

impl<C> Sampler<C> {
    pub fn new(config: C, weight_fn: impl SamplingWeight<C> + 'static) -> Self {
        let weight = weight_fn.weight(&config);
        Self {
            config,
            weight_fn: Box::new(weight_fn),
            weight,
            moves: Vec::new(),
            total_frequency: 0.0,
            observers: Vec::new(),
            trials: 0,
            accepted: 0,
        }
    }

    /// Register a move with the given relative frequency. Returns its index,
    /// or an error when the step settings are unusable.
    pub fn add_move(
        &mut self,
        trial_move: impl TrialMove<C> + 'static,
        frequency: f64,
        settings: MoveStepSettings,
    ) -> Result<usize> {
        let adapter = MoveStepAdapter::new(settings)?;
        let frequency = if frequency.is_finite() && frequency > 0.0 { frequency } else { 1.0 };
        self.total_frequency += frequency;
        self.moves.push(MoveSlot {
            trial_move: Box::new(trial_move),
            frequency,
            adapter,
        });
        Ok(self.moves.len() - 1)
    }

    pub fn add_observer(&mut self, observer: impl TrialObserver<C> + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Replace the configuration (e.g. from a restart) and re-evaluate its weight.
    pub fn set_config(&mut self, config: C) {
        self.weight = self.weight_fn.weight(&config);
        self.config = config;
    }

    /// Weight of the current configuration.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn acceptance_ratio(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepted as f64 / self.trials as f64
        }
    }

    pub fn step_adapter(&self, index: usize) -> Option<&MoveStepAdapter> {
        self.moves.get(index).map(|slot| &slot.adapter)
    }

    pub fn step_adapter_mut(&mut self, index: usize) -> Option<&mut MoveStepAdapter> {
        self.moves.get_mut(index).map(|slot| &mut slot.adapter)
    }

    /// Switch step-size adaptation on (equilibration) or off (production).
    pub fn set_equilibrating(&mut self, equilibrating: bool) {
        for slot in self.moves.iter_mut() {
            slot.adapter.set_adjusting(equilibrating);
        }
    }

    pub fn move_diagnostics(&self) -> Vec<MoveDiagnostics> {
        self.moves
            .iter()
            .map(|slot| MoveDiagnostics {
                name: slot.trial_move.name().to_string(),
                step_size: slot.adapter.step_size(),
                acceptance: slot.adapter.acceptance_ratio(),
                attempted: slot.adapter.state().total_attempted,
                reversals: slot.adapter.state().reversals,
            })
            .collect()
    }

    fn pick_move(&self, rng: &mut RandomStream) -> usize {
        if self.moves.len() == 1 {
            return 0;
        }
        let mut target = rng.uniform() * self.total_frequency;
        for (i, slot) in self.moves.iter().enumerate() {
            if target < slot.frequency {
                return i;
            }
            target -= slot.frequency;
        }
        self.moves.len() - 1
    }

    /// Perform one Metropolis trial. Returns whether the proposal was kept.
    ///
    /// A chain sitting on a zero-weight configuration accepts any proposal;
    /// the ratio is undefined there and the chain must be allowed to leave.
    /// Without registered moves nothing happens and `false` is returned.
    pub fn trial(&mut self, rng: &mut RandomStream) -> bool {
        if self.moves.is_empty() {
            return false;
        }
        let index = self.pick_move(rng);
        let slot = &mut self.moves[index];
        let step_size = slot.adapter.step_size();

        let accepted = if slot.trial_move.propose(&mut self.config, step_size, rng) {
            let new_weight = self.weight_fn.weight(&self.config);
            let accept = if self.weight == 0.0 {
                true
            } else {
                let ratio = new_weight / self.weight * slot.trial_move.proposal_bias();
                // NaN ratios fall through both comparisons and are rejected
                ratio >= 1.0 || rng.uniform() < ratio
            };
            if accept {
                slot.trial_move.accept(&mut self.config);
                self.weight = new_weight;
            } else {
                slot.trial_move.reject(&mut self.config);
            }
            accept
        } else {
            false
        };
        slot.adapter.record_accept(accepted);

        self.trials += 1;
        if accepted {
            self.accepted += 1;
        }
        for observer in self.observers.iter_mut() {
            observer.trial_finished(&self.config, self.weight, accepted);
        }
        accepted
    }
}
