//! Sampling module - Metropolis samplers, trial moves and step adaptation.

mod traits;
mod random;
mod step;
mod sampler;
mod moves;

pub use traits::{SamplingWeight, ValueFunction, TrialMove, TrialObserver};
pub use random::RandomStream;
pub use step::{MoveStepAdapter, MoveStepSettings, MoveStepState};
pub use sampler::{Sampler, MoveDiagnostics};
pub use moves::{UniformTranslate, GaussianTranslate};
