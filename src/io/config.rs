use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sampling::MoveStepSettings;
use crate::simulation::CalibrationSettings;

/// Run parameters, read from YAML. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: Option<u64>,
    /// Trials per macro-step, shared between the two systems.
    pub num_sub_steps: u64,
    pub block_size: u64,
    /// Pinned reference step fraction; disables adaptation when set.
    pub ref_step_fraction: Option<f64>,
    pub adjust_step_fraction: bool,
    pub aggressive_adjust_step_fraction: bool,
    pub ignore_reference_average: bool,
    pub calibration: CalibrationSettings,
    /// Macro-steps of production.
    pub production_steps: u64,
    pub ref_pref_file: Option<PathBuf>,
    pub moves: MoveStepSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            num_sub_steps: 1000,
            block_size: 1000,
            ref_step_fraction: None,
            adjust_step_fraction: true,
            aggressive_adjust_step_fraction: true,
            ignore_reference_average: false,
            calibration: CalibrationSettings::default(),
            production_steps: 1000,
            ref_pref_file: None,
            moves: MoveStepSettings::default(),
        }
    }
}

/// Read a [`SimulationConfig`] from a YAML file.
pub fn read_config(filename: &Path) -> Result<SimulationConfig> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    let config: SimulationConfig = serde_yaml::from_reader(reader)?;
    config.moves.validate()?;
    Ok(config)
}

// example of yaml file
// seed: 42
// num_sub_steps: 1000
// ref_pref_file: refpref.txt
// calibration:
//   steps: 200
//   equilibration_steps: 200
// production_steps: 5000
// moves:
//   initial_step_size: 0.5
