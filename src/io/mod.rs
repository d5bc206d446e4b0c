//! IO module - run configuration and the persisted reference preference.

mod config;
mod refpref;

pub use config::{read_config, SimulationConfig};
pub use refpref::{read_ref_pref, write_ref_pref};
