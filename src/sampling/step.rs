//! Step-size adaptation for a single trial-move kind.

use serde::{Deserialize, Serialize};

use crate::error::{OverlapError, Result};

/// Tuning parameters of a [`MoveStepAdapter`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveStepSettings {
    pub initial_step_size: f64,
    pub min_step_size: f64,
    pub max_step_size: f64,
    pub target_acceptance: f64,
    /// Half-width of the acceptance band inside which the step is left alone.
    pub tolerance: f64,
    /// Trials between adjustments.
    pub adjust_interval: u64,
    pub grow_factor: f64,
    pub shrink_factor: f64,
}

impl Default for MoveStepSettings {
    fn default() -> Self {
        Self {
            initial_step_size: 1.0,
            min_step_size: 1e-6,
            max_step_size: f64::INFINITY,
            target_acceptance: 0.5,
            tolerance: 0.05,
            adjust_interval: 100,
            grow_factor: 1.05,
            shrink_factor: 0.95,
        }
    }
}

impl MoveStepSettings {
    pub fn with_step_size(mut self, step: f64) -> Self {
        self.initial_step_size = step;
        self
    }

    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.min_step_size = min;
        self.max_step_size = max;
        self
    }

    pub fn with_target_acceptance(mut self, target: f64) -> Self {
        self.target_acceptance = target;
        self
    }

    /// Reject settings the adapter cannot work with, such as crossed or NaN
    /// step limits.
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: String| Err(OverlapError::InvalidParameter(what));
        if !(self.min_step_size > 0.0 && self.min_step_size.is_finite()) {
            return invalid(format!("minimum step size {} must be positive", self.min_step_size));
        }
        if self.max_step_size.is_nan() || self.max_step_size < self.min_step_size {
            return invalid(format!(
                "maximum step size {} must not be below the minimum {}",
                self.max_step_size, self.min_step_size
            ));
        }
        if !(self.initial_step_size > 0.0 && self.initial_step_size.is_finite()) {
            return invalid(format!("initial step size {} must be positive", self.initial_step_size));
        }
        if !(0.0..=1.0).contains(&self.target_acceptance) {
            return invalid(format!("target acceptance {} outside [0, 1]", self.target_acceptance));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return invalid(format!("acceptance tolerance {} must be non-negative", self.tolerance));
        }
        if self.adjust_interval == 0 {
            return invalid("step adjustment interval must be positive".into());
        }
        for (name, factor) in [("grow", self.grow_factor), ("shrink", self.shrink_factor)] {
            if !(factor > 0.0 && factor.is_finite()) {
                return invalid(format!("{} factor {} must be positive", name, factor));
            }
        }
        Ok(())
    }
}

/// Current step size plus acceptance bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveStepState {
    pub step_size: f64,
    /// Counts since the last adjustment.
    pub accepted: u64,
    pub attempted: u64,
    /// Counts over the adapter's lifetime.
    pub total_accepted: u64,
    pub total_attempted: u64,
    pub adjustments: u64,
    /// Number of times the adjustment direction flipped.
    pub reversals: u64,
    last_direction: i8,
}

/// Tracks acceptance of one move kind and nudges its step size toward the
/// target acceptance while equilibrating. Frozen otherwise.
#[derive(Clone, Debug)]
pub struct MoveStepAdapter {
    settings: MoveStepSettings,
    state: MoveStepState,
    adjusting: bool,
}

impl MoveStepAdapter {
    pub fn new(settings: MoveStepSettings) -> Result<Self> {
        settings.validate()?;
        let step_size = settings
            .initial_step_size
            .clamp(settings.min_step_size, settings.max_step_size);
        Ok(Self {
            settings,
            state: MoveStepState {
                step_size,
                ..MoveStepState::default()
            },
            adjusting: true,
        })
    }

    pub fn step_size(&self) -> f64 {
        self.state.step_size
    }

    pub fn set_step_size(&mut self, step: f64) {
        self.state.step_size = step.clamp(self.settings.min_step_size, self.settings.max_step_size);
    }

    pub fn settings(&self) -> &MoveStepSettings {
        &self.settings
    }

    pub fn state(&self) -> &MoveStepState {
        &self.state
    }

    pub fn is_adjusting(&self) -> bool {
        self.adjusting
    }

    /// Turn adaptation on or off. Toggling resets the interval counters.
    pub fn set_adjusting(&mut self, adjusting: bool) {
        if adjusting != self.adjusting {
            self.state.accepted = 0;
            self.state.attempted = 0;
            self.state.last_direction = 0;
        }
        self.adjusting = adjusting;
    }

    pub fn record_accept(&mut self, accepted: bool) {
        self.state.attempted += 1;
        self.state.total_attempted += 1;
        if accepted {
            self.state.accepted += 1;
            self.state.total_accepted += 1;
        }
        if self.adjusting && self.state.attempted >= self.settings.adjust_interval {
            self.adjust();
        }
    }

    /// Rescale the step if the interval's acceptance is outside the target band.
    pub fn adjust(&mut self) {
        if self.state.attempted == 0 {
            return;
        }
        let rate = self.state.accepted as f64 / self.state.attempted as f64;
        let direction: i8 = if rate > self.settings.target_acceptance + self.settings.tolerance {
            self.state.step_size *= self.settings.grow_factor;
            1
        } else if rate < self.settings.target_acceptance - self.settings.tolerance {
            self.state.step_size *= self.settings.shrink_factor;
            -1
        } else {
            0
        };
        self.state.step_size = self
            .state
            .step_size
            .clamp(self.settings.min_step_size, self.settings.max_step_size);

        if direction != 0 {
            self.state.adjustments += 1;
            if self.state.last_direction == -direction {
                self.state.reversals += 1;
            }
            self.state.last_direction = direction;
        }
        self.state.accepted = 0;
        self.state.attempted = 0;
    }

    /// Lifetime acceptance ratio; 0 before the first trial.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.state.total_attempted == 0 {
            0.0
        } else {
            self.state.total_accepted as f64 / self.state.total_attempted as f64
        }
    }

    /// Drop lifetime counters, keep the step size.
    pub fn reset_counters(&mut self) {
        let step_size = self.state.step_size;
        self.state = MoveStepState {
            step_size,
            ..MoveStepState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn feed(adapter: &mut MoveStepAdapter, accepted: u64, total: u64) {
        for i in 0..total {
            adapter.record_accept(i < accepted);
        }
    }

    #[test]
    fn test_grows_when_accepting_too_much() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 90, 100);
        assert_relative_eq!(adapter.step_size(), 1.05, epsilon = 1e-12);
        assert_eq!(adapter.state().attempted, 0);
    }

    #[test]
    fn test_shrinks_when_rejecting_too_much() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 10, 100);
        assert_relative_eq!(adapter.step_size(), 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_inside_band_is_left_alone() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 48, 100);
        assert_relative_eq!(adapter.step_size(), 1.0, epsilon = 1e-12);
        assert_eq!(adapter.state().adjustments, 0);
    }

    #[test]
    fn test_clamped_to_limits() {
        let settings = MoveStepSettings::default().with_limits(0.5, 1.02);
        let mut adapter = MoveStepAdapter::new(settings).unwrap();
        feed(&mut adapter, 100, 100);
        assert_relative_eq!(adapter.step_size(), 1.02, epsilon = 1e-12);
        for _ in 0..50 {
            feed(&mut adapter, 0, 100);
        }
        assert_relative_eq!(adapter.step_size(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_frozen_when_not_adjusting() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        adapter.set_adjusting(false);
        feed(&mut adapter, 100, 1000);
        assert_relative_eq!(adapter.step_size(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(adapter.acceptance_ratio(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_reversals_counted() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 90, 100);
        feed(&mut adapter, 10, 100);
        feed(&mut adapter, 90, 100);
        assert_eq!(adapter.state().adjustments, 3);
        assert_eq!(adapter.state().reversals, 2);
    }

    #[test]
    fn test_toggle_resets_interval() {
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 50, 50);
        adapter.set_adjusting(false);
        assert_eq!(adapter.state().attempted, 0);
        assert_eq!(adapter.state().total_attempted, 50);
    }

    #[test]
    fn test_target_acceptance_sets_direction() {
        // 80% acceptance is too high for the default target, too low for 0.9
        let mut adapter = MoveStepAdapter::new(MoveStepSettings::default()).unwrap();
        feed(&mut adapter, 80, 100);
        assert_relative_eq!(adapter.step_size(), 1.05, epsilon = 1e-12);

        let settings = MoveStepSettings::default().with_target_acceptance(0.9);
        let mut adapter = MoveStepAdapter::new(settings).unwrap();
        feed(&mut adapter, 80, 100);
        assert_relative_eq!(adapter.step_size(), 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_unusable_settings() {
        let base = MoveStepSettings::default();
        let bad = [
            base.with_limits(2.0, 1.0),
            base.with_limits(f64::NAN, 1.0),
            base.with_limits(1e-3, f64::NAN),
            base.with_limits(0.0, 1.0),
            base.with_step_size(f64::NAN),
            base.with_target_acceptance(1.5),
            MoveStepSettings { tolerance: -0.1, ..base },
            MoveStepSettings { adjust_interval: 0, ..base },
            MoveStepSettings { grow_factor: 0.0, ..base },
            MoveStepSettings { shrink_factor: f64::NAN, ..base },
        ];
        for settings in bad {
            assert!(matches!(
                MoveStepAdapter::new(settings),
                Err(OverlapError::InvalidParameter(_))
            ));
        }
        // an unbounded maximum is fine
        assert!(MoveStepAdapter::new(base.with_limits(1e-3, f64::INFINITY)).is_ok());
    }
}
