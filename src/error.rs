//! Error types for overlap-sampling runs.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlapError {
    /// α* came out NaN, infinite, zero or negative: the two systems never overlapped.
    #[error("invalid reference preference {0}: reference and target systems do not overlap")]
    InvalidRefPref(f64),

    #[error("reference preference still at the edge of the candidate range after {rounds} rounds")]
    RefPrefOutOfRange { rounds: usize },

    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        context: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("sampler has no trial moves")]
    NoTrialMoves,

    #[error("couldn't write reference preference to {path:?}: {source}")]
    RefPrefWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, OverlapError>;
