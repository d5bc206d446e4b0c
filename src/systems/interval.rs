//! A single coordinate on the periodic unit interval.

use serde::{Deserialize, Serialize};

use crate::error::{OverlapError, Result};
use crate::overlap::{OverlapSystem, SystemRole};
use crate::sampling::{MoveStepSettings, RandomStream, Sampler, TrialMove};

/// Uniform displacement of `step` half-width, wrapped back into `[0, 1)`.
#[derive(Clone, Debug, Default)]
pub struct IntervalHop {
    old: Option<f64>,
}

impl TrialMove<f64> for IntervalHop {
    fn name(&self) -> &str {
        "interval hop"
    }

    fn propose(&mut self, x: &mut f64, step_size: f64, rng: &mut RandomStream) -> bool {
        self.old = Some(*x);
        let y = (*x + step_size * rng.symmetric()).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1 for tiny negative inputs
        *x = if y < 1.0 { y } else { 0.0 };
        true
    }

    fn reject(&mut self, x: &mut f64) {
        if let Some(old) = self.old.take() {
            *x = old;
        }
    }
}

/// Reference weight 1 and target weight `scale` on the unit interval; the
/// integral ratio is exactly `scale`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledInterval {
    pub scale: f64,
}

impl ScaledInterval {
    pub fn new(scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(OverlapError::InvalidParameter(format!("scale {} must be positive", scale)));
        }
        Ok(Self { scale })
    }

    pub fn pair(&self, moves: MoveStepSettings) -> Result<(OverlapSystem<f64>, OverlapSystem<f64>)> {
        let scale = self.scale;
        let ref_weight = |_: &f64| 1.0;
        let target_weight = move |_: &f64| scale;

        let settings = moves.with_step_size(0.5).with_limits(1e-3, 0.5);
        let mut ref_sampler = Sampler::new(0.5, ref_weight);
        ref_sampler.add_move(IntervalHop::default(), 1.0, settings)?;
        let mut target_sampler = Sampler::new(0.5, target_weight);
        target_sampler.add_move(IntervalHop::default(), 1.0, settings)?;

        let reference = OverlapSystem::new(SystemRole::Reference, ref_sampler, ref_weight, target_weight)?;
        let target = OverlapSystem::new(SystemRole::Target, target_sampler, target_weight, ref_weight)?;
        Ok((reference, target))
    }
}
