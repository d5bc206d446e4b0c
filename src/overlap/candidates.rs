//! Overlap-parameter candidate grid and the best-parameter state.

use serde::{Deserialize, Serialize};

use crate::error::{OverlapError, Result};

/// Ordered, geometrically spaced overlap parameters `α_0 < … < α_{N-1}`
/// spanning `center·e^{±span}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlapCandidates {
    alphas: Vec<f64>,
    center: f64,
    span: f64,
}

impl OverlapCandidates {
    pub fn new(center: f64, span: f64, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(OverlapError::InvalidParameter("candidate grid needs at least one alpha".into()));
        }
        if !center.is_finite() || center <= 0.0 {
            return Err(OverlapError::InvalidRefPref(center));
        }
        if !span.is_finite() || span < 0.0 || (n > 1 && span == 0.0) {
            return Err(OverlapError::InvalidParameter(format!("alpha span {} must be positive", span)));
        }
        let alphas = if n == 1 {
            vec![center]
        } else {
            (0..n)
                .map(|i| center * (span * (2.0 * i as f64 / (n - 1) as f64 - 1.0)).exp())
                .collect()
        };
        Ok(Self { alphas, center, span })
    }

    pub fn single(alpha: f64) -> Result<Self> {
        Self::new(alpha, 0.0, 1)
    }

    pub fn len(&self) -> usize {
        self.alphas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }

    pub fn alpha(&self, i: usize) -> f64 {
        self.alphas[i]
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn middle(&self) -> usize {
        self.alphas.len() / 2
    }

    /// First or last index of a grid with more than one candidate.
    pub fn is_boundary(&self, i: usize) -> bool {
        self.alphas.len() > 1 && (i == 0 || i + 1 == self.alphas.len())
    }
}

impl Default for OverlapCandidates {
    /// Eleven candidates spanning `e^{±5}` around 1.
    fn default() -> Self {
        let span: f64 = 5.0;
        let alphas = (0..11).map(|i| (span * (i as f64 / 5.0 - 1.0)).exp()).collect();
        Self { alphas, center: 1.0, span }
    }
}

/// The best overlap parameter α*.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum RefPrefState {
    /// Nothing determined yet.
    #[default]
    Undetermined,
    /// Found by the bootstrap search; equilibration still has to refine it.
    Provisional(f64),
    /// Final value, either refined or read from storage.
    Confirmed(f64),
}

impl RefPrefState {
    pub fn value(&self) -> Option<f64> {
        match *self {
            RefPrefState::Undetermined => None,
            RefPrefState::Provisional(v) | RefPrefState::Confirmed(v) => Some(v),
        }
    }

    /// Fails if the held value is NaN, infinite, or not positive.
    pub fn validate(&self) -> Result<()> {
        match self.value() {
            Some(v) => check_ref_pref(v).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Accept only finite, strictly positive α*.
pub fn check_ref_pref(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OverlapError::InvalidRefPref(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_is_geometric_and_centered() {
        let c = OverlapCandidates::new(2.0, 3.0, 7).unwrap();
        assert_eq!(c.len(), 7);
        assert_relative_eq!(c.alpha(0), 2.0 * (-3.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(c.alpha(3), 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.alpha(6), 2.0 * 3.0f64.exp(), epsilon = 1e-9);
        let r = c.alpha(1) / c.alpha(0);
        for i in 1..7 {
            assert_relative_eq!(c.alpha(i) / c.alpha(i - 1), r, epsilon = 1e-12);
        }
        assert_eq!(c.middle(), 3);
        assert!(c.is_boundary(0) && c.is_boundary(6) && !c.is_boundary(3));
    }

    #[test]
    fn test_single_candidate() {
        let c = OverlapCandidates::single(0.25).unwrap();
        assert_eq!(c.alphas(), &[0.25]);
        assert!(!c.is_boundary(0));
    }

    #[test]
    fn test_rejects_bad_grids() {
        assert!(OverlapCandidates::new(1.0, 1.0, 0).is_err());
        assert!(OverlapCandidates::new(0.0, 1.0, 3).is_err());
        assert!(OverlapCandidates::new(f64::NAN, 1.0, 3).is_err());
        assert!(OverlapCandidates::new(1.0, 0.0, 3).is_err());
        assert!(OverlapCandidates::new(1.0, -1.0, 3).is_err());
    }

    #[test]
    fn test_default_matches_explicit() {
        let d = OverlapCandidates::default();
        let e = OverlapCandidates::new(1.0, 5.0, 11).unwrap();
        for (a, b) in d.alphas().iter().zip(e.alphas()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ref_pref_validation() {
        assert!(RefPrefState::Undetermined.validate().is_ok());
        assert!(RefPrefState::Confirmed(1.5).validate().is_ok());
        assert!(RefPrefState::Provisional(0.0).validate().is_err());
        assert!(RefPrefState::Confirmed(f64::INFINITY).validate().is_err());
        assert!(check_ref_pref(f64::NAN).is_err());
    }
}
