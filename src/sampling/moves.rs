//! Coordinate displacement moves for point-particle configurations.
//!
//! A configuration is any `AsMut<[Vector3<f64>]>`; the first `fixed` points
//! are pinned (Mayer sampling keeps molecule 0 at the origin).

use nalgebra::Vector3;
use rand_distr::{Distribution, StandardNormal};

use super::random::RandomStream;
use super::traits::TrialMove;

fn pick_mobile(len: usize, fixed: usize, rng: &mut RandomStream) -> Option<usize> {
    if len <= fixed {
        None
    } else {
        Some(fixed + rng.index(len - fixed))
    }
}

/// Displace one mobile point uniformly inside a cube of half-width `step`.
#[derive(Clone, Debug)]
pub struct UniformTranslate {
    fixed: usize,
    moved: Option<(usize, Vector3<f64>)>,
}

impl UniformTranslate {
    pub fn new(fixed: usize) -> Self {
        Self { fixed, moved: None }
    }
}

impl<C: AsMut<[Vector3<f64>]>> TrialMove<C> for UniformTranslate {
    fn name(&self) -> &str {
        "uniform translate"
    }

    fn propose(&mut self, config: &mut C, step_size: f64, rng: &mut RandomStream) -> bool {
        let points = config.as_mut();
        let Some(i) = pick_mobile(points.len(), self.fixed, rng) else {
            return false;
        };
        self.moved = Some((i, points[i]));
        let delta = Vector3::new(rng.symmetric(), rng.symmetric(), rng.symmetric());
        points[i] += step_size * delta;
        true
    }

    fn reject(&mut self, config: &mut C) {
        if let Some((i, old)) = self.moved.take() {
            config.as_mut()[i] = old;
        }
    }
}

/// Displace one mobile point by an isotropic Gaussian of width `step`.
#[derive(Clone, Debug)]
pub struct GaussianTranslate {
    fixed: usize,
    moved: Option<(usize, Vector3<f64>)>,
}

impl GaussianTranslate {
    pub fn new(fixed: usize) -> Self {
        Self { fixed, moved: None }
    }
}

impl<C: AsMut<[Vector3<f64>]>> TrialMove<C> for GaussianTranslate {
    fn name(&self) -> &str {
        "gaussian translate"
    }

    fn propose(&mut self, config: &mut C, step_size: f64, rng: &mut RandomStream) -> bool {
        let points = config.as_mut();
        let Some(i) = pick_mobile(points.len(), self.fixed, rng) else {
            return false;
        };
        self.moved = Some((i, points[i]));
        let delta = Vector3::<f64>::from_fn(|_, _| StandardNormal.sample(&mut *rng));
        points[i] += step_size * delta;
        true
    }

    fn reject(&mut self, config: &mut C) {
        if let Some((i, old)) = self.moved.take() {
            config.as_mut()[i] = old;
        }
    }
}
