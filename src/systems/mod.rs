//! Systems module - synthetic reference/target pairs with known integrals.

mod gaussian;
mod interval;
mod square_well;

pub use gaussian::{gaussian_pair, GaussianCluster};
pub use interval::{IntervalHop, ScaledInterval};
pub use square_well::SquareWellPair;
