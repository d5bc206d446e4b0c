//! Virial overlap - overlap-sampling Monte Carlo for ratios of integrals
//!
//! This crate runs two coupled Metropolis samplers, a reference system with a
//! known integral and a target system with an unknown one, and estimates the
//! ratio of their integrals with Bennett-weighted overlap sampling. It is the
//! engine behind Mayer-sampling calculations of virial coefficients.

pub mod error;
pub mod sampling;
pub mod overlap;
pub mod simulation;
pub mod io;
pub mod systems;

// Re-export commonly used types at crate root
pub use error::{OverlapError, Result};
pub use sampling::{GaussianTranslate, MoveStepSettings, RandomStream, Sampler, SamplingWeight, TrialMove, TrialObserver, UniformTranslate, ValueFunction};
pub use overlap::{OverlapAccumulator, OverlapCandidates, OverlapSystem, Phase, RatioEstimator, RefPrefState, StepAllocator, SystemRole};
pub use simulation::{CalibrationSettings, OverlapReport, OverlapSimulation, RefPrefSource};
pub use io::{read_config, read_ref_pref, write_ref_pref, SimulationConfig};
pub use systems::{gaussian_pair, GaussianCluster, ScaledInterval, SquareWellPair};
