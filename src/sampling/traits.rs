//! Traits through which the sampling engine talks to the systems it samples.

use super::random::RandomStream;

/// Un-normalized invariant density of a Markov chain, `w(config) >= 0`.
pub trait SamplingWeight<C> {
    fn weight(&self, config: &C) -> f64;
}

impl<C, F> SamplingWeight<C> for F
where
    F: Fn(&C) -> f64,
{
    fn weight(&self, config: &C) -> f64 {
        self(config)
    }
}

/// Quantity whose weighted average is being estimated.
pub trait ValueFunction<C> {
    fn evaluate(&self, config: &C) -> f64;
}

impl<C, F> ValueFunction<C> for F
where
    F: Fn(&C) -> f64,
{
    fn evaluate(&self, config: &C) -> f64 {
        self(config)
    }
}

/// A kind of trial move.
///
/// The move perturbs the configuration in place during `propose` and must be
/// able to undo that perturbation in `reject`. The step size is owned by the
/// sampler's step adapter and handed in on every proposal.
pub trait TrialMove<C> {
    fn name(&self) -> &str;

    /// Perturb `config`. Returns `false` if no proposal could be made, in which
    /// case `config` must be left untouched.
    fn propose(&mut self, config: &mut C, step_size: f64, rng: &mut RandomStream) -> bool;

    /// Called after the sampler kept the proposed configuration.
    fn accept(&mut self, _config: &mut C) {}

    /// Restore `config` to its state before the last `propose`.
    fn reject(&mut self, config: &mut C);

    /// Ratio of reverse to forward proposal probability for the last proposal.
    fn proposal_bias(&self) -> f64 {
        1.0
    }
}

/// Callback invoked synchronously after every trial of a sampler.
pub trait TrialObserver<C> {
    fn trial_finished(&mut self, config: &C, weight: f64, accepted: bool);
}
