//! Persisted α*: a text file holding one number on its own line.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{OverlapError, Result};

/// Read a stored α*. Missing, unreadable or malformed files yield `None`.
pub fn read_ref_pref(path: &Path) -> Option<f64> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no stored reference preference");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "couldn't read reference preference");
            return None;
        }
    };
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Some(value),
        Ok(value) => {
            warn!(path = %path.display(), value, "ignoring stored reference preference");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed reference preference file");
            None
        }
    }
}

/// Store α* so a later run can skip the search.
pub fn write_ref_pref(path: &Path, value: f64) -> Result<()> {
    // `{}` prints the shortest string that parses back to the same f64
    fs::write(path, format!("{}\n", value)).map_err(|source| OverlapError::RefPrefWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refpref");
        for value in [0.1 + 0.2, 1.0 / 3.0, 7.25e-9, 123456.789] {
            write_ref_pref(&path, value).unwrap();
            let back = read_ref_pref(&path).unwrap();
            assert_eq!(back.to_bits(), value.to_bits());
        }
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_missing_or_bad_file_reads_as_none() {
        let dir = tempdir().unwrap();
        assert_eq!(read_ref_pref(&dir.path().join("absent")), None);

        let path = dir.path().join("garbage");
        fs::write(&path, "not a number\n").unwrap();
        assert_eq!(read_ref_pref(&path), None);

        for bad in ["NaN\n", "inf\n", "0\n", "-1.5\n", ""] {
            fs::write(&path, bad).unwrap();
            assert_eq!(read_ref_pref(&path), None, "{:?}", bad);
        }

        fs::write(&path, "  2.5  \n").unwrap();
        assert_eq!(read_ref_pref(&path), Some(2.5));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("refpref");
        assert!(matches!(
            write_ref_pref(&path, 1.0),
            Err(OverlapError::RefPrefWrite { .. })
        ));
    }
}
