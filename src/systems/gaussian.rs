//! Independent Gaussian displacements around a pinned point.

use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{OverlapError, Result};
use crate::overlap::{OverlapSystem, SystemRole};
use crate::sampling::{GaussianTranslate, MoveStepSettings, Sampler};

/// `num_points` points, point 0 pinned at the origin, each other point drawn
/// from an isotropic Gaussian of width `sigma`:
/// `w = Π_{i≥1} exp(−|r_i|²/2σ²)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianCluster {
    pub num_points: usize,
    pub sigma: f64,
}

impl GaussianCluster {
    pub fn new(num_points: usize, sigma: f64) -> Result<Self> {
        if num_points < 2 {
            return Err(OverlapError::InvalidParameter("a cluster needs at least two points".into()));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(OverlapError::InvalidParameter(format!("gaussian width {} must be positive", sigma)));
        }
        Ok(Self { num_points, sigma })
    }

    pub fn weight(&self, points: &[Vector3<f64>]) -> f64 {
        let two_var = 2.0 * self.sigma * self.sigma;
        let exponent: f64 = points.iter().skip(1).map(|r| -r.norm_squared() / two_var).sum();
        exponent.exp()
    }

    /// `∫ w = (2πσ²)^{3(n−1)/2}`.
    pub fn integral(&self) -> f64 {
        (2.0 * PI * self.sigma * self.sigma).powf(1.5 * (self.num_points - 1) as f64)
    }

    pub fn initial_config(&self) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(); self.num_points]
    }
}

/// Reference and target systems sampling two clusters of the same size.
/// Each system's value is its own weight, so the ratio estimates
/// `target.integral() / reference.integral()`.
pub fn gaussian_pair(
    reference: GaussianCluster,
    target: GaussianCluster,
    moves: MoveStepSettings,
) -> Result<(OverlapSystem<Vec<Vector3<f64>>>, OverlapSystem<Vec<Vector3<f64>>>)> {
    if reference.num_points != target.num_points {
        return Err(OverlapError::DimensionMismatch {
            expected: reference.num_points,
            found: target.num_points,
            context: "gaussian cluster size",
        });
    }
    let ref_weight = move |c: &Vec<Vector3<f64>>| reference.weight(c);
    let target_weight = move |c: &Vec<Vector3<f64>>| target.weight(c);

    let mut ref_sampler = Sampler::new(reference.initial_config(), ref_weight);
    ref_sampler.add_move(GaussianTranslate::new(1), 1.0, moves.with_step_size(reference.sigma))?;
    let mut target_sampler = Sampler::new(target.initial_config(), target_weight);
    target_sampler.add_move(GaussianTranslate::new(1), 1.0, moves.with_step_size(target.sigma))?;

    let ref_system = OverlapSystem::new(SystemRole::Reference, ref_sampler, ref_weight, target_weight)?;
    let target_system = OverlapSystem::new(SystemRole::Target, target_sampler, target_weight, ref_weight)?;
    Ok((ref_system, target_system))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weight_and_integral() {
        let cluster = GaussianCluster::new(3, 0.5).unwrap();
        let mut points = cluster.initial_config();
        assert_relative_eq!(cluster.weight(&points), 1.0);
        points[1] = Vector3::new(0.5, 0.0, 0.0);
        points[2] = Vector3::new(0.0, 0.0, -0.5);
        // each point contributes exp(-1/2)
        assert_relative_eq!(cluster.weight(&points), (-1.0_f64).exp(), epsilon = 1e-14);
        // pinned point is ignored
        points[0] = Vector3::new(9.0, 9.0, 9.0);
        assert_relative_eq!(cluster.weight(&points), (-1.0_f64).exp(), epsilon = 1e-14);
        assert_relative_eq!(cluster.integral(), (2.0 * PI * 0.25_f64).powi(3), epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(GaussianCluster::new(1, 1.0).is_err());
        assert!(GaussianCluster::new(2, 0.0).is_err());
        assert!(GaussianCluster::new(2, f64::NAN).is_err());
        let a = GaussianCluster::new(2, 1.0).unwrap();
        let b = GaussianCluster::new(3, 1.0).unwrap();
        assert!(gaussian_pair(a, b, MoveStepSettings::default()).is_err());
        let crossed = MoveStepSettings::default().with_limits(2.0, 1.0);
        assert!(matches!(
            gaussian_pair(a, a, crossed),
            Err(OverlapError::InvalidParameter(_))
        ));
    }
}
