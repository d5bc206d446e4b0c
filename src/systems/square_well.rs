//! Hard-sphere and square-well Mayer functions for the second virial coefficient.

use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{OverlapError, Result};
use crate::overlap::{OverlapSystem, SystemRole};
use crate::sampling::{MoveStepSettings, Sampler, UniformTranslate};

/// Pair of molecules, the first pinned at the origin. The hard-sphere Mayer
/// function is the reference, the square-well one the target.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SquareWellPair {
    /// Core diameter.
    pub sigma: f64,
    /// Well range in units of `sigma`.
    pub lambda: f64,
    /// Well depth over temperature, `βε`.
    pub beta_epsilon: f64,
}

impl SquareWellPair {
    pub fn new(sigma: f64, lambda: f64, beta_epsilon: f64) -> Result<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(OverlapError::InvalidParameter(format!("core diameter {} must be positive", sigma)));
        }
        if !(lambda.is_finite() && lambda >= 1.0) {
            return Err(OverlapError::InvalidParameter(format!("well range {} must be at least 1", lambda)));
        }
        if !beta_epsilon.is_finite() {
            return Err(OverlapError::InvalidParameter("well depth must be finite".into()));
        }
        Ok(Self { sigma, lambda, beta_epsilon })
    }

    fn separation(points: &[Vector3<f64>]) -> f64 {
        (points[1] - points[0]).norm()
    }

    pub fn hard_sphere_mayer(&self, r: f64) -> f64 {
        if r < self.sigma {
            -1.0
        } else {
            0.0
        }
    }

    pub fn square_well_mayer(&self, r: f64) -> f64 {
        if r < self.sigma {
            -1.0
        } else if r < self.lambda * self.sigma {
            self.beta_epsilon.exp_m1()
        } else {
            0.0
        }
    }

    /// `∫ f_HS d³r = −4πσ³/3`.
    pub fn reference_integral(&self) -> f64 {
        -4.0 * PI * self.sigma.powi(3) / 3.0
    }

    /// Hard-sphere `B2 = 2πσ³/3`; scaling the ratio by it gives the
    /// square-well `B2` directly.
    pub fn hard_sphere_b2(&self) -> f64 {
        2.0 * PI * self.sigma.powi(3) / 3.0
    }

    /// `B2 = (2πσ³/3)[1 − (λ³−1)(e^{βε}−1)]`.
    pub fn b2(&self) -> f64 {
        self.hard_sphere_b2() * (1.0 - (self.lambda.powi(3) - 1.0) * self.beta_epsilon.exp_m1())
    }

    pub fn initial_config(&self) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(), Vector3::new(0.5 * self.sigma, 0.0, 0.0)]
    }

    /// Reference samples `|f_HS|`, target samples `|f_SW|`; each measures its
    /// own Mayer function.
    pub fn pair(
        &self,
        moves: MoveStepSettings,
    ) -> Result<(OverlapSystem<Vec<Vector3<f64>>>, OverlapSystem<Vec<Vector3<f64>>>)> {
        let model = *self;
        let ref_value = move |c: &Vec<Vector3<f64>>| model.hard_sphere_mayer(Self::separation(c));
        let target_value = move |c: &Vec<Vector3<f64>>| model.square_well_mayer(Self::separation(c));
        let ref_weight = move |c: &Vec<Vector3<f64>>| ref_value(c).abs();
        let target_weight = move |c: &Vec<Vector3<f64>>| target_value(c).abs();

        let settings = moves.with_step_size(0.5 * self.sigma);
        let mut ref_sampler = Sampler::new(self.initial_config(), ref_weight);
        ref_sampler.add_move(UniformTranslate::new(1), 1.0, settings)?;
        let mut target_sampler = Sampler::new(self.initial_config(), target_weight);
        target_sampler.add_move(UniformTranslate::new(1), 1.0, settings)?;

        let reference = OverlapSystem::new(SystemRole::Reference, ref_sampler, ref_value, target_weight)?;
        let target = OverlapSystem::new(SystemRole::Target, target_sampler, target_value, ref_weight)?;
        Ok((reference, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mayer_functions() {
        let sw = SquareWellPair::new(1.0, 1.5, 0.5).unwrap();
        assert_eq!(sw.hard_sphere_mayer(0.99), -1.0);
        assert_eq!(sw.hard_sphere_mayer(1.01), 0.0);
        assert_eq!(sw.square_well_mayer(0.5), -1.0);
        assert_relative_eq!(sw.square_well_mayer(1.2), 0.5_f64.exp() - 1.0, epsilon = 1e-15);
        assert_eq!(sw.square_well_mayer(1.6), 0.0);
    }

    #[test]
    fn test_b2_limits() {
        // no well: hard spheres
        let hs = SquareWellPair::new(1.0, 1.0, 2.0).unwrap();
        assert_relative_eq!(hs.b2(), hs.hard_sphere_b2(), epsilon = 1e-15);
        let sw = SquareWellPair::new(2.0, 1.5, 0.3).unwrap();
        let expected = 2.0 * PI * 8.0 / 3.0 * (1.0 - (3.375 - 1.0) * (0.3_f64.exp() - 1.0));
        assert_relative_eq!(sw.b2(), expected, epsilon = 1e-12);
        assert_relative_eq!(sw.reference_integral(), -2.0 * sw.hard_sphere_b2(), epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(SquareWellPair::new(0.0, 1.5, 1.0).is_err());
        assert!(SquareWellPair::new(1.0, 0.9, 1.0).is_err());
        assert!(SquareWellPair::new(1.0, 1.5, f64::INFINITY).is_err());
    }
}
