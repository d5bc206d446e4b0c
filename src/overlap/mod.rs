//! Overlap module - candidate grids, block statistics, ratio estimate and step allocation.

mod candidates;
mod weighting;
mod block;
mod accumulator;
mod spline;
mod estimator;
mod system;
mod allocator;

pub use candidates::{check_ref_pref, OverlapCandidates, RefPrefState};
pub use weighting::{BennettWeighting, OverlapWeighting};
pub use block::BlockAccumulator;
pub(crate) use block::sanitize;
pub use accumulator::{OverlapAccumulator, SystemRole};
pub use spline::AkimaSpline;
pub use estimator::{FullResult, RatioEstimator};
pub use system::OverlapSystem;
pub use allocator::{Phase, StepAllocator};
